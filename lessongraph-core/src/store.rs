use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Read a JSON store. A missing file is an empty store.
pub fn load_store<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        info!("📭 No store at {}, starting empty", path.display());
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read store {}", path.display()))?;
    let store = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse store {}", path.display()))?;
    debug!("Loaded store {}", path.display());
    Ok(store)
}

/// Replace the store file in one step: the JSON is written to a temp file in
/// the same directory and renamed over the target.
pub fn save_store_atomic<T: Serialize>(path: &Path, store: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create store directory {}", parent.display()))?;

    let temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, store)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    temp.persist(path)
        .with_context(|| format!("Failed to replace store {}", path.display()))?;
    info!("💾 Saved store {}", path.display());
    Ok(())
}
