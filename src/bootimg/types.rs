use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::PluginError;

/// Plugin options from the `--sourceparams` of a partition line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceParams(BTreeMap<String, String>);

impl SourceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Value of `key`, treating an empty value like an absent one.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

impl FromStr for SourceParams {
    type Err = std::convert::Infallible;

    /// Parses `key=value,key2=value2`; a bare `key` maps to an empty value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = SourceParams::new();
        for raw in s.split(',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            match raw.split_once('=') {
                Some((k, v)) => params.insert(k.trim(), v.trim()),
                None => params.insert(raw, ""),
            };
        }
        Ok(params)
    }
}

impl<'de> Deserialize<'de> for SourceParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.parse().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loader {
    GrubEfi,
    SystemdBoot,
}

impl Loader {
    pub fn as_str(&self) -> &'static str {
        match self {
            Loader::GrubEfi => "grub-efi",
            Loader::SystemdBoot => "systemd-boot",
        }
    }

    /// Resolves the `loader` source parameter. `err` builds the phase
    /// specific error so configure and prepare report their own kind.
    pub fn from_params(
        params: &SourceParams,
        err: fn(String) -> PluginError,
    ) -> Result<Self, PluginError> {
        match params.get("loader") {
            None => Err(err("bootimg-efi requires a loader, none specified".into())),
            Some("grub-efi") => Ok(Loader::GrubEfi),
            Some("systemd-boot") => Ok(Loader::SystemdBoot),
            Some(other) => Err(err(format!("unrecognized bootimg-efi loader: {other}"))),
        }
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One partition of the image as seen by the plugin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Partition {
    #[serde(default)]
    pub mountpoint: Option<String>,
    #[serde(default)]
    pub realnum: u32,
    /// Requested size in 1 KiB blocks before prepare (0 = none),
    /// size of the produced image afterwards.
    #[serde(default)]
    pub size: u64,
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
    #[serde(default)]
    pub sourceparams: SourceParams,
}

impl Partition {
    /// Blocks to add to `current_blocks` to reach the requested size,
    /// 0 when nothing was requested or the content is already larger.
    pub fn get_extra_block_count(&self, current_blocks: u64) -> u64 {
        debug!(
            "Requested partition size for {}: {}",
            self.mountpoint.as_deref().unwrap_or("-"),
            self.size
        );
        if self.size == 0 {
            return 0;
        }
        debug!(
            "Requested blocks {}, current_blocks {}",
            self.size, current_blocks
        );
        self.size.saturating_sub(current_blocks)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootloaderConfig {
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub append: Option<String>,
    #[serde(default)]
    pub configfile: Option<String>,
}

/// The image being assembled, as the host tool describes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Creator {
    #[serde(default, rename = "partition")]
    pub parts: Vec<Partition>,
    #[serde(default)]
    pub rootdev: String,
    #[serde(default)]
    pub bootloader: BootloaderConfig,
}

/// What `prepare` reports back about the produced image.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedImage {
    pub source_file: PathBuf,
    pub size_kb: u64,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}
