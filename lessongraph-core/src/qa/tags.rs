//! Metadata tag recognition.
//!
//! Tags are only read from paragraphs in the metadata-tag style. A paragraph
//! may carry several tags (`<book_exercise><type=1><question>`); they are
//! returned in order of appearance.

use crate::types::{Difficulty, QuestionType};
use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<([^<>]+)>").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum QaTag {
    Question,
    Answer,
    BookExercise,
    AdditionalExercise,
    Faq,
    QuestionType(QuestionType),
    Reference(String),
    McqAnswer(i64),
    Difficulty(Difficulty),
    /// Start of the teaching section in concept documents.
    Teach,
    /// End of the teaching section.
    Revision,
    /// Anything else, including recognized names with unusable values.
    Unknown(String),
}

pub fn parse_tags(text: &str) -> Vec<QaTag> {
    TAG_REGEX
        .captures_iter(text)
        .map(|cap| parse_tag(&cap[1]))
        .collect()
}

fn parse_tag(raw: &str) -> QaTag {
    let raw = raw.trim();
    let (name, value) = match raw.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim().trim_matches('"'))),
        None => (raw, None),
    };
    let name = name.to_ascii_lowercase().replace([' ', '-'], "_");

    match (name.as_str(), value) {
        ("question", None) => QaTag::Question,
        ("answer", None) => QaTag::Answer,
        ("book_exercise", None) => QaTag::BookExercise,
        ("additional_exercise", None) => QaTag::AdditionalExercise,
        ("faq", None) => QaTag::Faq,
        ("teach", None) => QaTag::Teach,
        ("revision", None) => QaTag::Revision,
        ("type" | "question_type", Some(v)) => match QuestionType::parse(v) {
            Some(t) => QaTag::QuestionType(t),
            None => QaTag::Unknown(raw.to_string()),
        },
        ("reference" | "ref", Some(v)) => QaTag::Reference(v.to_string()),
        ("mcq" | "mcq_answer", Some(v)) => match v.parse() {
            Ok(n) => QaTag::McqAnswer(n),
            Err(_) => QaTag::Unknown(raw.to_string()),
        },
        ("difficulty", Some(v)) => match Difficulty::parse(v) {
            Some(d) => QaTag::Difficulty(d),
            None => QaTag::Unknown(raw.to_string()),
        },
        _ => QaTag::Unknown(raw.to_string()),
    }
}
