use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

pub const BLOCK_SIZE: u64 = 1024;

/// Apparent size of `path` in 1 KiB blocks, rounded up, summed over the
/// whole tree the way `du -bks` (or `du -Lbks` with `follow_links`) does.
pub fn disk_usage_kb(path: &Path, follow_links: bool) -> io::Result<u64> {
    let mut bytes = 0u64;
    for entry in WalkDir::new(path).follow_links(follow_links) {
        let entry = entry.map_err(io::Error::other)?;
        let meta = entry.metadata().map_err(io::Error::other)?;
        bytes = bytes.saturating_add(meta.len());
    }
    Ok(bytes.div_ceil(BLOCK_SIZE))
}

/// Copies a file, or a directory tree, from `src` to `dst`.
pub fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.is_dir() {
        fs::copy(src, dst)?;
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Names of the entries directly under `dir`, sorted.
pub fn sorted_entries(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = fs::read_dir(dir)?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

pub fn format_fat_label(label: &str) -> Option<[u8; 11]> {
    let mut out = [b' '; 11];
    let upper = label.trim().to_ascii_uppercase();
    if upper.len() > 11 {
        return None;
    }
    for (i, b) in upper.bytes().enumerate() {
        out[i] = b;
    }
    Some(out)
}
