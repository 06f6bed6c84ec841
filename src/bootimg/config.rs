use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum number of 1 KiB blocks added on top of the boot content.
pub const BOOTDD_EXTRA_SPACE: u64 = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FatBackend {
    /// `mkdosfs` + `mcopy`
    #[default]
    Mtools,
    /// In-process through the `fatfs` crate
    Native,
}

/// Read-only plugin settings, fixed for the lifetime of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minimum extra blocks, in 1 KiB units
    pub extra_space: u64,
    /// FAT volume label of the boot image
    pub fat_label: String,
    /// File name of the boot image inside the work directory
    pub image_name: String,
    pub fat_backend: FatBackend,
    pub grub_mkimage: String,
    pub mkdosfs: String,
    pub mcopy: String,
    /// Directories searched for a custom loader configfile
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config_search_path: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extra_space: BOOTDD_EXTRA_SPACE,
            fat_label: "efi".to_string(),
            image_name: "boot.img".to_string(),
            fat_backend: FatBackend::Mtools,
            grub_mkimage: "grub-mkimage".to_string(),
            mkdosfs: "mkdosfs".to_string(),
            mcopy: "mcopy".to_string(),
            config_search_path: Vec::new(),
        }
    }
}
