use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Platform data directory for the vault (database, key, and salt files).
pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "keyrack")
        .context("cannot determine a home directory for this user")?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir).context("create data dir")?;
    Ok(dir)
}
