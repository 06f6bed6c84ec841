use anyhow::Result;
use std::path::Path;

mod fat;
mod mtools;

use super::config::{FatBackend, Settings};
use super::exec::CommandRunner;

pub use fat::{list_dir, read_file};

/// Creates `image` as a FAT filesystem of `blocks` KiB labelled
/// `settings.fat_label` and copies the contents of `src_dir` into its root.
pub fn build_fat_image(
    settings: &Settings,
    runner: &dyn CommandRunner,
    image: &Path,
    blocks: u64,
    src_dir: &Path,
) -> Result<()> {
    match settings.fat_backend {
        FatBackend::Mtools => {
            mtools::mkdosfs(runner, &settings.mkdosfs, image, &settings.fat_label, blocks)?;
            mtools::mcopy_tree(runner, &settings.mcopy, image, src_dir)
        }
        FatBackend::Native => {
            fat::mkfs_fat(image, &settings.fat_label, blocks)?;
            fat::copy_tree(image, src_dir)
        }
    }
}
