use anyhow::Result;
use std::path::Path;

use super::super::fs::list_dir;

pub fn ls(image: &Path, path: &str) -> Result<()> {
    let entries = list_dir(image, path)?;

    for entry in entries {
        if entry.is_dir {
            println!("{}/", entry.name);
        } else {
            println!("{:<24} {:>10}", entry.name, entry.size);
        }
    }
    Ok(())
}
