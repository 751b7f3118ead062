//! Paragraph segmentation.
//!
//! A paragraph's inlines become a sequence of segments in source order. Prose
//! (text runs and inline math) stays together in one segment; display
//! equations, images and video links split it.

use super::equation::EquationConverter;
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;
use regex::Regex;
use std::sync::LazyLock;

static VIDEO_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(youtube\.com/|youtu\.be/|vimeo\.com/|\.mp4(\?|#|$)|\.webm(\?|#|$))").unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Marked-up prose: `**bold**` spans and delimited inline math.
    Prose(String),
    Equation(String),
    Image { rel_id: String },
    Video { url: String },
}

#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    Text { text: String, bold: bool },
    Math(String),
}

pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL_REGEX.is_match(url)
}

pub fn segment_paragraph(
    paragraph: &DocParagraph,
    equations: &EquationConverter,
    math_delimiter: &str,
    report: &mut ConversionReport,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut fragments: Vec<Fragment> = Vec::new();

    for inline in &paragraph.inlines {
        match inline {
            Inline::Text { text, bold } => push_text(&mut fragments, text, *bold),
            Inline::Math { element, display } => {
                let converted = equations.convert(element);
                for construct in converted.fallbacks {
                    report.push(ConversionIssue::EquationFallback {
                        paragraph: paragraph.index,
                        construct,
                    });
                }
                if converted.latex.is_empty() {
                    continue;
                }
                if *display {
                    flush(&mut fragments, &mut segments, math_delimiter);
                    segments.push(Segment::Equation(converted.latex));
                } else {
                    fragments.push(Fragment::Math(converted.latex));
                }
            }
            Inline::Image { rel_id } => {
                flush(&mut fragments, &mut segments, math_delimiter);
                segments.push(Segment::Image {
                    rel_id: rel_id.clone(),
                });
            }
            Inline::Link { url } => {
                if is_video_url(url) {
                    flush(&mut fragments, &mut segments, math_delimiter);
                    segments.push(Segment::Video { url: url.clone() });
                }
            }
            // Reported by the pipelines; nothing to emit.
            Inline::Object(_) => {}
        }
    }
    flush(&mut fragments, &mut segments, math_delimiter);
    segments
}

/// Coalesce with the previous fragment when the bold state matches.
fn push_text(fragments: &mut Vec<Fragment>, text: &str, bold: bool) {
    if let Some(Fragment::Text {
        text: previous,
        bold: previous_bold,
    }) = fragments.last_mut()
    {
        if *previous_bold == bold {
            previous.push_str(text);
            return;
        }
    }
    fragments.push(Fragment::Text {
        text: text.to_string(),
        bold,
    });
}

fn flush(fragments: &mut Vec<Fragment>, segments: &mut Vec<Segment>, delimiter: &str) {
    if fragments.is_empty() {
        return;
    }
    let taken = std::mem::take(fragments);

    // Math with no prose around it stands on its own as an equation.
    let has_prose = taken.iter().any(|f| match f {
        Fragment::Text { text, .. } => !text.trim().is_empty(),
        Fragment::Math(_) => false,
    });
    if !has_prose {
        for fragment in taken {
            if let Fragment::Math(latex) = fragment {
                segments.push(Segment::Equation(latex));
            }
        }
        return;
    }

    let mut out = String::new();
    for fragment in &taken {
        match fragment {
            Fragment::Text { text, bold: true } => out.push_str(&bold_markup(text)),
            Fragment::Text { text, bold: false } => out.push_str(text),
            Fragment::Math(latex) => {
                out.push_str(delimiter);
                out.push_str(latex);
                out.push_str(delimiter);
            }
        }
    }
    let out = out.trim();
    if !out.is_empty() {
        segments.push(Segment::Prose(out.to_string()));
    }
}

/// `**text**` with surrounding whitespace kept outside the markers.
fn bold_markup(text: &str) -> String {
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let lead = &text[..text.len() - text.trim_start().len()];
    let trail = &text[text.trim_end().len()..];
    format!("{lead}**{core}**{trail}")
}
