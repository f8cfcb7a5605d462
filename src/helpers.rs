use std::fs::{self, DirEntry, ReadDir};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use learnhub_course_sync::store::Snapshot;
use learnhub_course_sync::{MemoryStore, PendingChanges};

pub fn read_data_dir(data_path: PathBuf) -> Result<ReadDir> {
    let data_path = fs::canonicalize(&data_path)
        .with_context(|| format!("cannot open data directory {}", data_path.display()))?;
    let entries = fs::read_dir(data_path)?;

    Ok(entries)
}

pub fn read_dir_entry_data(dir_entry: &DirEntry) -> Result<Vec<u8>> {
    if dir_entry.file_type()?.is_dir() {
        bail!("{} is a directory", dir_entry.path().display());
    };

    Ok(fs::read(dir_entry.path())?)
}

pub fn write_data(path: &Path, data: String) -> Result<()> {
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("cannot write {}", path.display()))?;

    Ok(())
}

/// Opens the JSON snapshot at `path`. A missing file is an empty store.
pub fn load_store(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        return Ok(MemoryStore::new());
    }

    let raw_data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_slice(&raw_data)
        .with_context(|| format!("{} is not a store snapshot", path.display()))?;

    Ok(MemoryStore::from_snapshot(snapshot))
}

pub async fn save_store(path: &Path, store: &MemoryStore) -> Result<()> {
    let raw_data = serde_json::to_string_pretty(&store.snapshot().await)?;

    write_data(path, raw_data)
}

pub fn read_changes(path: &Path) -> Result<PendingChanges> {
    let raw_data = fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;

    serde_json::from_slice(&raw_data)
        .with_context(|| format!("{} does not hold pending changes", path.display()))
}
