use anyhow::{Context, Result};

use super::super::cli::PrepareArgs;
use super::super::plugin::{BootimgEfi, SourceDirs, SourcePlugin};
use super::Layout;

pub fn prepare(plugin: &BootimgEfi<'_>, layout: &Layout, args: &PrepareArgs) -> Result<()> {
    let dirs = SourceDirs {
        bootimg_dir: args.bootimg_dir.clone(),
        kernel_dir: args.kernel_dir.clone(),
        rootfs_dir: args.rootfs_dir.clone(),
    };
    let mut part = layout.partition().clone();
    let image = plugin
        .prepare_partition(
            &mut part,
            &layout.sourceparams,
            &layout.creator,
            &layout.workdir,
            &dirs,
        )
        .with_context(|| format!("{} failed on {}", plugin.name(), layout.describe()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&image)?);
        return Ok(());
    }
    println!("source_file: {}", image.source_file.display());
    println!("size: {} KiB", image.size_kb);
    Ok(())
}
