use crate::config::ConversionConfig;
use crate::ids::sanitize_label;
use crate::report::{ConversionIssue, ConversionReport};
use crate::storage::calculate_content_hash;
use crate::types::*;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// An image that was assigned a file name and still has to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Assigns `<label>-<index>.<ext>` names to embedded images.
///
/// The index starts at 1 for each node. A byte-identical image seen earlier
/// in the same run reuses its first name and is not written again. With an
/// asset directory set, names (and URLs) are placed under it, so chapters
/// that share an images folder never overwrite each other's files.
pub struct ImageExtractor {
    base_url: String,
    asset_dir: String,
    node_label: String,
    next_index: usize,
    by_hash: HashMap<String, String>,
    assigned: HashSet<String>,
    pending: Vec<ExtractedImage>,
}

impl ImageExtractor {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            base_url: config.asset_base_url.clone(),
            asset_dir: String::new(),
            node_label: String::new(),
            next_index: 1,
            by_hash: HashMap::new(),
            assigned: HashSet::new(),
            pending: Vec::new(),
        }
    }

    /// Place every assigned name under `dir` (`3` → `3/Force-1.png`).
    pub fn set_asset_dir(&mut self, dir: &str) {
        self.asset_dir = dir.trim_matches('/').to_string();
    }

    /// Start attaching images to a new node; the index restarts at 1.
    pub fn enter_node(&mut self, label: &str) {
        self.node_label = label.to_string();
        self.next_index = 1;
    }

    pub fn extract(
        &mut self,
        rel_id: &str,
        document: &PreprocessorOutput,
        paragraph: usize,
        report: &mut ConversionReport,
    ) -> Option<ContentItem> {
        let part = match document.media.get(rel_id) {
            Some(part) => part,
            None => {
                let reason = document
                    .broken_media
                    .get(rel_id)
                    .cloned()
                    .unwrap_or_else(|| "not found in package".to_string());
                report.push(ConversionIssue::MediaUnavailable {
                    paragraph,
                    rel_id: rel_id.to_string(),
                    reason,
                });
                return None;
            }
        };

        let hash = calculate_content_hash(&part.bytes);
        let filename = match self.by_hash.get(&hash) {
            Some(existing) => {
                debug!("🖼️  Reusing {existing} for identical image {rel_id}");
                existing.clone()
            }
            None => {
                let filename = self.next_filename(image_extension(part));
                self.by_hash.insert(hash, filename.clone());
                self.pending.push(ExtractedImage {
                    filename: filename.clone(),
                    bytes: part.bytes.clone(),
                });
                filename
            }
        };

        Some(ContentItem::media(
            ContentType::Image,
            asset_url(&self.base_url, &filename),
        ))
    }

    fn next_filename(&mut self, ext: &str) -> String {
        let mut stem = sanitize_label(&self.node_label);
        if stem.is_empty() {
            stem = "image".to_string();
        }
        let prefix = if self.asset_dir.is_empty() {
            String::new()
        } else {
            format!("{}/", self.asset_dir)
        };
        loop {
            let filename = format!("{prefix}{stem}-{}.{ext}", self.next_index);
            self.next_index += 1;
            // Two nodes with the same label in one document would otherwise
            // hand out the same name for different images.
            if self.assigned.insert(filename.clone()) {
                return filename;
            }
        }
    }

    /// Images assigned since the last call, in assignment order.
    pub fn take_pending(&mut self) -> Vec<ExtractedImage> {
        std::mem::take(&mut self.pending)
    }
}

/// Join the asset base path and an assigned file name.
fn asset_url(base: &str, filename: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        filename.to_string()
    } else {
        format!("{base}/{filename}")
    }
}

/// Extension from the declared content type, else the part name, else magic
/// bytes, else `png`.
pub fn image_extension(part: &MediaPart) -> &'static str {
    if let Some(ext) = part.content_type.as_deref().and_then(content_type_extension) {
        return ext;
    }
    let from_name = part
        .part_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    if let Some(ext) = from_name.as_deref().and_then(known_extension) {
        return ext;
    }
    sniff_extension(&part.bytes).unwrap_or("png")
}

fn content_type_extension(content_type: &str) -> Option<&'static str> {
    let subtype = content_type
        .trim()
        .to_ascii_lowercase()
        .strip_prefix("image/")?
        .to_string();
    Some(match subtype.as_str() {
        "svg+xml" => "svg",
        "x-emf" => "emf",
        "x-wmf" => "wmf",
        "x-ms-bmp" => "bmp",
        other => return known_extension(other),
    })
}

fn known_extension(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "png" => "png",
        "jpg" | "jpeg" | "jpe" => "jpg",
        "gif" => "gif",
        "bmp" => "bmp",
        "tif" | "tiff" => "tiff",
        "webp" => "webp",
        "svg" => "svg",
        "emf" => "emf",
        "wmf" => "wmf",
        _ => return None,
    })
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.starts_with(b"BM") {
        Some("bmp")
    } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
        Some("tiff")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}
