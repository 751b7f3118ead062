use crate::xml::XmlElement;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

// ===== CONCEPT STORE TYPES =====

/// Heading depth of a concept node. `title1` is depth 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Title1,
    Title2,
    Title3,
}

impl NodeType {
    pub const MAX_DEPTH: usize = 2;

    pub fn depth(self) -> usize {
        match self {
            NodeType::Title1 => 0,
            NodeType::Title2 => 1,
            NodeType::Title3 => 2,
        }
    }

    pub fn from_depth(depth: usize) -> Option<Self> {
        match depth {
            0 => Some(NodeType::Title1),
            1 => Some(NodeType::Title2),
            2 => Some(NodeType::Title3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentItem>,
}

impl Node {
    pub fn new(id: String, node_type: NodeType, label: String) -> Self {
        Self {
            id,
            node_type,
            label,
            children: Vec::new(),
            content: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Bullet1,
    Bullet2,
    Number1,
    Number2,
    Image,
    Video,
    Equation,
    Body,
}

/// One unit of leaf content. Text-bearing items carry `text` (with `**bold**`
/// and `$inline math$` markup); media items carry `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ContentItem {
    pub fn text(content_type: ContentType, text: impl Into<String>) -> Self {
        Self {
            content_type,
            text: Some(text.into()),
            url: None,
        }
    }

    pub fn equation(latex: impl Into<String>) -> Self {
        Self::text(ContentType::Equation, latex)
    }

    pub fn media(content_type: ContentType, url: impl Into<String>) -> Self {
        Self {
            content_type,
            text: None,
            url: Some(url.into()),
        }
    }
}

/// Chapter identity. Stores written by hand mix numbers and strings, so both
/// are accepted and the original representation is written back unchanged.
#[derive(Debug, Clone, Eq)]
pub enum ChapterNo {
    Number(u64),
    Text(String),
}

impl ChapterNo {
    pub fn numeric(&self) -> Option<u64> {
        match self {
            ChapterNo::Number(n) => Some(*n),
            ChapterNo::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Numeric ordering; non-numeric identities sort after numeric ones.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl PartialEq for ChapterNo {
    fn eq(&self, other: &Self) -> bool {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_string().trim() == other.to_string().trim(),
        }
    }
}

impl fmt::Display for ChapterNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterNo::Number(n) => write!(f, "{n}"),
            ChapterNo::Text(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for ChapterNo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChapterNo::Number(n) => serializer.serialize_u64(*n),
            ChapterNo::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for ChapterNo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => ChapterNo::Number(n),
            Raw::Text(s) => ChapterNo::Text(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub chapter_no: ChapterNo,
    #[serde(default)]
    pub chapter_title: String,
    /// Kept as raw JSON: chapters this run does not convert are written back
    /// exactly as loaded, whatever fields or content types they carry.
    #[serde(default)]
    pub nodes: Vec<Value>,
    /// Fields this tool does not own, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConceptStore {
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ===== QUESTION / ANSWER STORE TYPES =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseType {
    Book,
    Board,
    #[default]
    Extra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    VeryShort,
    #[default]
    Short,
    Long,
    VeryLong,
}

impl QuestionType {
    /// Accepts the numeric code used in `<type=N>` tags or the kebab-case name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "very-short" | "very_short" => Some(QuestionType::VeryShort),
            "2" | "short" => Some(QuestionType::Short),
            "3" | "long" => Some(QuestionType::Long),
            "4" | "very-long" | "very_long" => Some(QuestionType::VeryLong),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Qa {
    pub id: String,
    pub exercise_type: ExerciseType,
    pub question_type: QuestionType,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcq_answer: Option<i64>,
    pub question: Vec<ContentItem>,
    #[serde(default)]
    pub answer: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaChapter {
    pub id: String,
    #[serde(default)]
    pub subject_id: String,
    pub chapter_no: ChapterNo,
    #[serde(default)]
    pub chapter_name: String,
    /// Raw JSON, like [`Chapter::nodes`].
    #[serde(default)]
    pub questions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QaStore {
    #[serde(default)]
    pub chapters: Vec<QaChapter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ===== DOCUMENT (PREPROCESSOR) TYPES =====

/// One inline piece of a paragraph, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text { text: String, bold: bool },
    /// `display` is true for `m:oMathPara`, false for inline `m:oMath`.
    Math { element: XmlElement, display: bool },
    Image { rel_id: String },
    Link { url: String },
    /// Drawing content that has no store representation.
    Object(EmbeddedObject),
}

/// Drawings an editor has to redo by hand: the tool keeps what it can (a
/// cropped picture is kept uncropped) and flags the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedObject {
    SmartArt,
    DrawingCanvas,
    CroppedImage,
}

impl fmt::Display for EmbeddedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EmbeddedObject::SmartArt => "SmartArt diagram",
            EmbeddedObject::DrawingCanvas => "drawing canvas",
            EmbeddedObject::CroppedImage => "cropped image",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocParagraph {
    /// Position in the document body, counting every paragraph.
    pub index: usize,
    pub style_name: Option<String>,
    pub inlines: Vec<Inline>,
    /// True when the paragraph sits inside a table cell.
    pub in_table: bool,
}

impl DocParagraph {
    pub fn new(index: usize, style_name: Option<String>) -> Self {
        Self {
            index,
            style_name,
            inlines: Vec::new(),
            in_table: false,
        }
    }

    /// Concatenated run text without formatting.
    pub fn plain_text(&self) -> String {
        self.inlines
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the paragraph carries anything a reader would see.
    pub fn has_visible_content(&self) -> bool {
        self.inlines.iter().any(|inline| match inline {
            Inline::Text { text, .. } => !text.trim().is_empty(),
            Inline::Math { .. } | Inline::Image { .. } | Inline::Link { .. } => true,
            Inline::Object(_) => false,
        })
    }

    pub fn preview(&self) -> String {
        let text = self.plain_text();
        let text = text.trim();
        if text.chars().count() > 50 {
            format!("{}...", text.chars().take(47).collect::<String>())
        } else {
            text.to_string()
        }
    }
}

/// A binary part of the package referenced by a relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPart {
    pub part_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw parts of an unpacked word-processing package, before any XML parsing.
#[derive(Debug, Clone, Default)]
pub struct DocumentPackage {
    pub document_xml: String,
    pub styles_xml: Option<String>,
    pub relationships_xml: Option<String>,
    pub content_types_xml: Option<String>,
    /// Binary parts keyed by part name (`word/media/image1.png`).
    pub media_parts: HashMap<String, Vec<u8>>,
    /// Parts present in the container that could not be read, with the reason.
    pub unreadable_parts: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct PreprocessorOutput {
    pub paragraphs: Vec<DocParagraph>,
    /// Relationship id → embedded media.
    pub media: HashMap<String, MediaPart>,
    /// Relationship id → reason the media part could not be loaded.
    pub broken_media: HashMap<String, String>,
}

/// Semantic role assigned by the style classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParagraphRole {
    Heading(NodeType),
    Content(ContentType),
    MetaTag,
    Unrecognized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_no_accepts_numbers_and_strings() {
        let n: ChapterNo = serde_json::from_str("3").unwrap();
        let s: ChapterNo = serde_json::from_str("\"3\"").unwrap();
        assert_eq!(n, s);
        assert_eq!(serde_json::to_string(&n).unwrap(), "3");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"3\"");
    }

    #[test]
    fn chapter_no_sorts_numerically() {
        let mut chapters = vec![
            ChapterNo::Text("10".into()),
            ChapterNo::Number(2),
            ChapterNo::Text("appendix".into()),
            ChapterNo::Text("1".into()),
        ];
        chapters.sort_by(|a, b| a.sort_cmp(b));
        let rendered: Vec<String> = chapters.iter().map(|c| c.to_string()).collect();
        assert_eq!(rendered, vec!["1", "2", "10", "appendix"]);
    }

    #[test]
    fn content_item_serializes_type_field() {
        let item = ContentItem::text(ContentType::Bullet1, "**Mass** is a quantity");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "bullet1");
        assert_eq!(json["text"], "**Mass** is a quantity");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn qa_enums_use_store_spelling() {
        assert_eq!(
            serde_json::to_value(QuestionType::VeryShort).unwrap(),
            "very-short"
        );
        assert_eq!(serde_json::to_value(ExerciseType::Board).unwrap(), "board");
        assert_eq!(QuestionType::parse("4"), Some(QuestionType::VeryLong));
        assert_eq!(QuestionType::parse("9"), None);
    }

    #[test]
    fn unknown_store_fields_survive_round_trip() {
        let raw = r#"{"chapters":[{"chapterNo":1,"chapterTitle":"Matter","nodes":[],"published":true}],"version":2}"#;
        let store: ConceptStore = serde_json::from_str(raw).unwrap();
        assert_eq!(store.extra["version"], 2);
        let back = serde_json::to_value(&store).unwrap();
        assert_eq!(back["chapters"][0]["published"], true);
    }
}
