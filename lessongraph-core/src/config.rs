use crate::ids::IdStrategy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_asset_base_url() -> String {
    "/db/images".to_string()
}

fn default_inline_math_delimiter() -> String {
    "$".to_string()
}

fn default_publisher() -> String {
    "TNSB".to_string()
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Paragraph style names for each semantic role
    #[serde(default)]
    pub styles: StyleTable,
    /// Base path or URL images are served from; the assigned file name is appended
    #[serde(default = "default_asset_base_url")]
    pub asset_base_url: String,
    #[serde(default)]
    pub id_strategy: IdStrategy,
    /// Restrict concept conversion to the `<teach>` … `<revision>` section when present
    #[serde(default = "default_true")]
    pub honor_section_markers: bool,
    /// Delimiter placed around equations that sit inside prose
    #[serde(default = "default_inline_math_delimiter")]
    pub inline_math_delimiter: String,
    /// Publisher entry in subjects.json that owns new standards/subjects
    #[serde(default = "default_publisher")]
    pub publisher: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleTable {
    pub title1: Vec<String>,
    pub title2: Vec<String>,
    pub title3: Vec<String>,
    pub bullet1: Vec<String>,
    pub bullet2: Vec<String>,
    pub number1: Vec<String>,
    pub number2: Vec<String>,
    pub meta_tag: Vec<String>,
    pub body: Vec<String>,
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            title1: names(&["# Sub Topic - 1"]),
            title2: names(&["# Sub Topic - 2"]),
            title3: names(&["# Sub Topic - 3"]),
            bullet1: names(&["# Bullet-1"]),
            bullet2: names(&["# Bullet-2"]),
            number1: names(&["# Number-1"]),
            number2: names(&["# Number-2"]),
            meta_tag: names(&["# Meta Data"]),
            body: names(&[
                "# Body",
                "# Body Equation",
                "# Highlight",
                "# Headline",
                "Normal",
            ]),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            styles: StyleTable::default(),
            asset_base_url: default_asset_base_url(),
            id_strategy: IdStrategy::default(),
            honor_section_markers: true,
            inline_math_delimiter: default_inline_math_delimiter(),
            publisher: default_publisher(),
        }
    }
}

impl ConversionConfig {
    /// Load config from file path (YAML)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ConversionConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!("⚠️  Failed to load config from {p} ({e}), using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}
