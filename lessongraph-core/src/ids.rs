use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How record identifiers are produced.
///
/// `Deterministic` ids are derived from the record's position and label, so
/// converting an unchanged document twice yields byte-identical stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Deterministic,
    Random,
}

#[derive(Debug, Clone)]
pub struct IdGenerator {
    strategy: IdStrategy,
    namespace: String,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy, namespace: impl Into<String>) -> Self {
        Self {
            strategy,
            namespace: namespace.into(),
        }
    }

    /// `<hex8>-<sanitized label>`; `path` is the 1-based ordinal path of the
    /// node in its chapter tree.
    pub fn node_id(&self, path: &[usize], label: &str) -> String {
        let path_key = path
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        let prefix = self.short_id(&["node", &path_key, label]);
        let slug = sanitize_label(label);
        if slug.is_empty() {
            prefix
        } else {
            format!("{prefix}-{slug}")
        }
    }

    pub fn record_id(&self, kind: &str, ordinal: usize) -> String {
        self.short_id(&[kind, &ordinal.to_string()])
    }

    /// `<hex8>` keyed by arbitrary parts, for records without an ordinal.
    pub fn keyed_id(&self, parts: &[&str]) -> String {
        self.short_id(parts)
    }

    fn short_id(&self, parts: &[&str]) -> String {
        match self.strategy {
            IdStrategy::Deterministic => {
                let mut hasher = Sha256::new();
                hasher.update(self.namespace.as_bytes());
                for part in parts {
                    hasher.update([0u8]);
                    hasher.update(part.as_bytes());
                }
                format!("{:x}", hasher.finalize())[..8].to_string()
            }
            IdStrategy::Random => Uuid::new_v4().simple().to_string()[..8].to_string(),
        }
    }
}

/// Whitespace becomes `-`; anything other than ASCII letters, digits, `-`
/// and `_` is dropped.
pub fn sanitize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}
