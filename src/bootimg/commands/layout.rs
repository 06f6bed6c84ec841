use anyhow::{Context, Result, anyhow, bail};
use std::path::{Path, PathBuf};

use super::super::cli::PartArgs;
use super::super::types::{Creator, Partition, SourceParams};

/// A layout file with the partition this run builds.
#[derive(Debug, Clone)]
pub struct Layout {
    pub creator: Creator,
    pub index: usize,
    pub sourceparams: SourceParams,
    pub workdir: PathBuf,
    /// Directory of the layout file, searched for custom configfiles
    pub base_dir: PathBuf,
}

impl Layout {
    pub fn load(args: &PartArgs) -> Result<Self> {
        let content = std::fs::read_to_string(&args.layout)
            .with_context(|| format!("failed to read layout {}", args.layout.display()))?;
        let creator: Creator = toml::from_str(&content)
            .with_context(|| format!("invalid layout {}", args.layout.display()))?;
        let base_dir = args
            .layout
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_creator(creator, args, base_dir)
    }

    pub fn from_creator(creator: Creator, args: &PartArgs, base_dir: PathBuf) -> Result<Self> {
        let index = select_partition(&creator, args.part.as_deref())?;
        let sourceparams = match &args.sourceparams {
            Some(raw) => raw.parse().unwrap_or_default(),
            None => creator.parts[index].sourceparams.clone(),
        };
        Ok(Self {
            creator,
            index,
            sourceparams,
            workdir: args.workdir.clone(),
            base_dir,
        })
    }

    pub fn partition(&self) -> &Partition {
        &self.creator.parts[self.index]
    }

    pub fn describe(&self) -> String {
        let part = self.partition();
        match part.mountpoint.as_deref() {
            Some(mnt) => format!("partition {} ({mnt})", part.realnum),
            None => format!("partition {}", part.realnum),
        }
    }
}

/// Finds a partition by GPT number or mount point. Without a selector
/// the first partition carrying a `loader` source parameter is used.
pub fn select_partition(creator: &Creator, selector: Option<&str>) -> Result<usize> {
    if creator.parts.is_empty() {
        bail!("layout has no partitions");
    }
    let Some(sel) = selector else {
        return creator
            .parts
            .iter()
            .position(|p| p.sourceparams.get("loader").is_some())
            .ok_or_else(|| anyhow!("no partition with a loader, use --part"));
    };
    if let Ok(num) = sel.parse::<u32>() {
        return creator
            .parts
            .iter()
            .position(|p| p.realnum == num)
            .ok_or_else(|| anyhow!("partition {num} not found"));
    }
    creator
        .parts
        .iter()
        .position(|p| p.mountpoint.as_deref() == Some(sel))
        .ok_or_else(|| anyhow!("partition mounted at {sel} not found"))
}
