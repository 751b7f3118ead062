// All conversion functionality is in lessongraph-core.
// This CLI acts as a thin wrapper: input discovery and the on-disk layout.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

// Re-export core types for convenience
pub use lessongraph_core::*;

/// Where one subject's stores and images live under the database directory:
/// `<db>/<standard>-<subject>/{concept.json, qa.json, images/}` plus the
/// shared `<db>/subjects.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectPaths {
    pub slug: String,
    pub root: PathBuf,
    pub concept_store: PathBuf,
    pub qa_store: PathBuf,
    pub images: PathBuf,
    pub registry: PathBuf,
}

impl SubjectPaths {
    pub fn new(db_dir: &Path, standard: &str, subject: &str) -> Self {
        let slug = format!("{}-{}", standard.trim(), subject.trim().to_lowercase());
        let root = db_dir.join(&slug);
        Self {
            concept_store: root.join("concept.json"),
            qa_store: root.join("qa.json"),
            images: root.join("images"),
            registry: db_dir.join("subjects.json"),
            root,
            slug,
        }
    }

    /// URL prefix recorded in image items when no override is given.
    pub fn default_asset_base_url(&self) -> String {
        format!("/db/{}/images", self.slug)
    }
}

/// Every `.docx` in `input_dir`, sorted, skipping editor lock files (`~$…`).
pub fn discover_documents(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read input directory {}", input_dir.display()))?;

    let mut documents = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("~$") || !path.is_file() {
            continue;
        }
        let is_docx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
        if is_docx {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}
