use anyhow::{Context, Result};

use super::super::plugin::{BootimgEfi, SourcePlugin, staging_dir};
use super::Layout;

pub fn configure(plugin: &BootimgEfi<'_>, layout: &Layout) -> Result<()> {
    plugin
        .configure_partition(
            layout.partition(),
            &layout.sourceparams,
            &layout.creator,
            &layout.workdir,
        )
        .with_context(|| format!("{} failed on {}", plugin.name(), layout.describe()))?;
    info!(
        "Loader configuration written to {}",
        staging_dir(&layout.workdir).display()
    );
    Ok(())
}
