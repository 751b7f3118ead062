use crate::types::EmbeddedObject;
use std::fmt;
use tracing::warn;

/// Recoverable problems found while converting one document. Each one was
/// resolved with a stated default and the run continued; they are collected
/// so an editor can review the source document afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionIssue {
    UnrecognizedStyle {
        paragraph: usize,
        style: String,
    },
    SkippedHeadingLevel {
        paragraph: usize,
        label: String,
        missing_depth: usize,
    },
    EmptyHeading {
        paragraph: usize,
    },
    TableContent {
        paragraph: usize,
    },
    ManualReview {
        paragraph: usize,
        object: EmbeddedObject,
    },
    HeadingMedia {
        paragraph: usize,
        count: usize,
    },
    MediaUnavailable {
        paragraph: usize,
        rel_id: String,
        reason: String,
    },
    EquationFallback {
        paragraph: usize,
        construct: String,
    },
    UnknownTag {
        paragraph: usize,
        tag: String,
    },
    StrayAnswerTag {
        paragraph: usize,
    },
    DefaultedMetadata {
        question: usize,
        fields: Vec<&'static str>,
    },
    MissingAnswer {
        question: usize,
    },
    /// Every item of the question was lost to media errors; the record was
    /// left out.
    QuestionContentLost {
        question: usize,
    },
}

impl fmt::Display for ConversionIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionIssue::UnrecognizedStyle { paragraph, style } => write!(
                f,
                "paragraph {paragraph}: unrecognized style '{style}', kept as body text"
            ),
            ConversionIssue::SkippedHeadingLevel {
                paragraph,
                label,
                missing_depth,
            } => write!(
                f,
                "paragraph {paragraph}: heading '{label}' skips level {}, placeholder inserted",
                missing_depth + 1
            ),
            ConversionIssue::EmptyHeading { paragraph } => {
                write!(f, "paragraph {paragraph}: heading has no text")
            }
            ConversionIssue::TableContent { paragraph } => write!(
                f,
                "paragraph {paragraph}: table cell content flattened into the paragraph stream"
            ),
            ConversionIssue::ManualReview { paragraph, object } => write!(
                f,
                "paragraph {paragraph}: {object} cannot be converted, redo it by hand"
            ),
            ConversionIssue::HeadingMedia { paragraph, count } => write!(
                f,
                "paragraph {paragraph}: {count} image(s) or link(s) in a heading dropped"
            ),
            ConversionIssue::MediaUnavailable {
                paragraph,
                rel_id,
                reason,
            } => write!(
                f,
                "paragraph {paragraph}: image {rel_id} skipped ({reason})"
            ),
            ConversionIssue::EquationFallback {
                paragraph,
                construct,
            } => write!(
                f,
                "paragraph {paragraph}: math construct '{construct}' converted as plain text"
            ),
            ConversionIssue::UnknownTag { paragraph, tag } => {
                write!(f, "paragraph {paragraph}: unknown tag <{tag}> ignored")
            }
            ConversionIssue::StrayAnswerTag { paragraph } => write!(
                f,
                "paragraph {paragraph}: <answer> without an open question ignored"
            ),
            ConversionIssue::DefaultedMetadata { question, fields } => write!(
                f,
                "question {question}: no tag for {}, defaults applied",
                fields.join(", ")
            ),
            ConversionIssue::MissingAnswer { question } => {
                write!(f, "question {question}: no answer content")
            }
            ConversionIssue::QuestionContentLost { question } => write!(
                f,
                "question {question}: all question content was unreadable, record skipped"
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    pub issues: Vec<ConversionIssue>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ConversionIssue) {
        warn!("⚠️  {issue}");
        self.issues.push(issue);
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn count_where(&self, predicate: impl Fn(&ConversionIssue) -> bool) -> usize {
        self.issues.iter().filter(|issue| predicate(issue)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_render_for_review() {
        let issue = ConversionIssue::DefaultedMetadata {
            question: 4,
            fields: vec!["exerciseType", "questionType"],
        };
        assert_eq!(
            issue.to_string(),
            "question 4: no tag for exerciseType, questionType, defaults applied"
        );
    }

    #[test]
    fn report_counts_by_kind() {
        let mut report = ConversionReport::new();
        report.push(ConversionIssue::EmptyHeading { paragraph: 1 });
        report.push(ConversionIssue::MissingAnswer { question: 2 });
        report.push(ConversionIssue::EmptyHeading { paragraph: 7 });
        assert_eq!(
            report.count_where(|i| matches!(i, ConversionIssue::EmptyHeading { .. })),
            2
        );
        assert!(!report.is_clean());
    }
}
