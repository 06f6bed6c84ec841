use anyhow::{Result, anyhow, bail};
use fatfs::{FileSystem, FormatVolumeOptions, FsOptions};
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;
use walkdir::WalkDir;

use super::super::types::DirEntry;
use super::super::utils::{BLOCK_SIZE, format_fat_label};

/// Creates `image` with `blocks` KiB and formats it as FAT. The FAT
/// type is picked from the volume size like `mkdosfs` does.
pub fn mkfs_fat(image: &Path, label: &str, blocks: u64) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(image)
        .map_err(|e| anyhow!("failed to create image {}: {e}", image.display()))?;
    file.set_len(blocks * BLOCK_SIZE)
        .map_err(|e| anyhow!("failed to size image {}: {e}", image.display()))?;

    let label = format_fat_label(label).ok_or_else(|| anyhow!("FAT label too long: {label}"))?;
    let opts = FormatVolumeOptions::new().volume_label(label);
    fatfs::format_volume(&file, opts).map_err(|e| anyhow!("mkfs fat failed: {e}"))?;
    Ok(())
}

fn open_image(image: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(image)
        .map_err(|e| anyhow!("failed to open image {}: {e}", image.display()))
}

/// Copies the contents of `src_dir` into the image root.
pub fn copy_tree(image: &Path, src_dir: &Path) -> Result<()> {
    let file = open_image(image)?;
    let fs = FileSystem::new(&file, FsOptions::new()).map_err(|e| anyhow!("mount fat failed: {e}"))?;
    {
        let root = fs.root_dir();
        for entry in WalkDir::new(src_dir).min_depth(1).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| anyhow!("walk {} failed: {e}", src_dir.display()))?;
            let rel = entry
                .path()
                .strip_prefix(src_dir)
                .map_err(|e| anyhow!("invalid path {}: {e}", entry.path().display()))?;
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().is_dir() {
                root.create_dir(&name)
                    .map_err(|e| anyhow!("mkdir {name} failed: {e}"))?;
            } else {
                let mut dst = root
                    .create_file(&name)
                    .map_err(|e| anyhow!("create file {name} failed: {e}"))?;
                dst.truncate().map_err(|e| anyhow!("truncate {name} failed: {e}"))?;
                let mut src = File::open(entry.path())?;
                io::copy(&mut src, &mut dst).map_err(|e| anyhow!("write {name} failed: {e}"))?;
            }
        }
    }
    fs.unmount().map_err(|e| anyhow!("fat unmount failed: {e}"))?;
    Ok(())
}

pub fn list_dir(image: &Path, path: &str) -> Result<Vec<DirEntry>> {
    let file = open_image(image)?;
    let fs = FileSystem::new(&file, FsOptions::new()).map_err(|e| anyhow!("mount fat failed: {e}"))?;
    let root = fs.root_dir();
    let path = path.trim_matches('/');
    let dir = if path.is_empty() {
        root
    } else {
        root.open_dir(path).map_err(|e| anyhow!("open dir failed: {e}"))?
    };

    let mut out = Vec::new();
    for entry in dir.iter() {
        let entry = entry.map_err(|e| anyhow!("iter failed: {e:?}"))?;
        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        out.push(DirEntry {
            name,
            is_dir: entry.is_dir(),
            size: entry.len(),
        });
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

pub fn read_file(image: &Path, path: &str) -> Result<Vec<u8>> {
    let file = open_image(image)?;
    let fs = FileSystem::new(&file, FsOptions::new()).map_err(|e| anyhow!("mount fat failed: {e}"))?;
    let root = fs.root_dir();
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        bail!("not a file: /");
    }
    let mut f = root
        .open_file(path)
        .map_err(|e| anyhow!("open file failed: {e}"))?;
    let mut data = Vec::new();
    f.read_to_end(&mut data)
        .map_err(|e| anyhow!("read failed: {e}"))?;
    Ok(data)
}
