use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// What a store call did to the asset at that name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetWrite {
    Created,
    Unchanged,
    /// Different bytes were already there, typically an earlier version of
    /// the same chapter.
    Replaced,
}

/// Storage abstraction for extracted image assets.
///
/// Assets are only written after a document converted successfully, so a
/// failed conversion never leaves orphan files behind. Names may contain
/// `/`-separated directories (`3/qa/question-1-1.png`).
pub trait AssetStorage {
    fn store_asset(&self, filename: &str, bytes: &[u8]) -> Result<AssetWrite>;
}

/// File-based asset storage rooted at an images directory
pub struct FileAssetStorage {
    root: PathBuf,
}

impl FileAssetStorage {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create asset directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

impl AssetStorage for FileAssetStorage {
    fn store_asset(&self, filename: &str, bytes: &[u8]) -> Result<AssetWrite> {
        let path = self.asset_path(filename);
        let outcome = match fs::read(&path) {
            Ok(existing) if calculate_content_hash(&existing) == calculate_content_hash(bytes) => {
                return Ok(AssetWrite::Unchanged);
            }
            Ok(_) => AssetWrite::Replaced,
            Err(_) => AssetWrite::Created,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create asset directory {}", parent.display()))?;
        }
        fs::write(&path, bytes)
            .with_context(|| format!("Failed to write asset {}", path.display()))?;
        Ok(outcome)
    }
}

/// No-op storage used for dry runs
pub struct NoOpAssetStorage;

impl Default for NoOpAssetStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpAssetStorage {
    pub fn new() -> Self {
        Self
    }
}

impl AssetStorage for NoOpAssetStorage {
    fn store_asset(&self, _filename: &str, _bytes: &[u8]) -> Result<AssetWrite> {
        Ok(AssetWrite::Unchanged) // No-op
    }
}

/// Full SHA-256 of the content, hex encoded
pub fn calculate_content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
