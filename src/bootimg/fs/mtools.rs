use anyhow::{Context, Result, bail};
use std::path::Path;

use super::super::exec::{CommandRunner, Invocation};
use super::super::utils::sorted_entries;

/// Creates a fresh FAT image of `blocks` KiB with `mkdosfs -C`.
pub fn mkdosfs(
    runner: &dyn CommandRunner,
    tool: &str,
    image: &Path,
    label: &str,
    blocks: u64,
) -> Result<()> {
    let cmd = Invocation::new(tool)
        .args(["-n", label, "-C"])
        .arg_path(image)
        .arg(blocks.to_string());
    runner.run(&cmd).with_context(|| format!("{tool} failed"))?;
    Ok(())
}

/// Copies every entry of `src_dir` into the image root with `mcopy -s`.
pub fn mcopy_tree(runner: &dyn CommandRunner, tool: &str, image: &Path, src_dir: &Path) -> Result<()> {
    let entries = sorted_entries(src_dir)
        .with_context(|| format!("failed to list {}", src_dir.display()))?;
    if entries.is_empty() {
        bail!("nothing to copy from {}", src_dir.display());
    }
    let cmd = Invocation::new(tool)
        .arg("-i")
        .arg_path(image)
        .arg("-s")
        .args(entries.iter().map(|name| src_dir.join(name).into_os_string()))
        .arg("::/");
    runner.run(&cmd).with_context(|| format!("{tool} failed"))?;
    Ok(())
}
