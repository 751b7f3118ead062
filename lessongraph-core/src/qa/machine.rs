//! Question/answer state machine.
//!
//! ```text
//!            <question>              <answer>
//!   Idle ───────────────▶ InQuestion ────────▶ InAnswer
//!                            ▲                    │
//!                            └──── <question> ────┘
//! ```
//!
//! Metadata tags seen before a `<question>` (while idle, or after the previous
//! answer) are staged and belong to the next question. Tags seen inside a
//! question apply to it directly. Nothing carries over from one question to
//! the next.

use super::tags::QaTag;
use crate::error::ConversionError;
use crate::ids::IdGenerator;
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;
use tracing::debug;

/// Metadata tags collected for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaMetadata {
    pub book_exercise: bool,
    pub additional_exercise: bool,
    pub faq: bool,
    pub question_type: Option<QuestionType>,
    pub reference: Option<String>,
    pub mcq_answer: Option<i64>,
    pub difficulty: Option<Difficulty>,
}

impl QaMetadata {
    /// `<book_exercise>` wins; `<additional_exercise>` needs `<faq>` as well
    /// to make a board question; everything else is extra.
    pub fn exercise_type(&self) -> ExerciseType {
        if self.book_exercise {
            ExerciseType::Book
        } else if self.additional_exercise && self.faq {
            ExerciseType::Board
        } else {
            ExerciseType::Extra
        }
    }

    fn has_exercise_tag(&self) -> bool {
        self.book_exercise || self.additional_exercise || self.faq
    }

    fn apply(&mut self, tag: &QaTag) {
        match tag {
            QaTag::BookExercise => self.book_exercise = true,
            QaTag::AdditionalExercise => self.additional_exercise = true,
            QaTag::Faq => self.faq = true,
            QaTag::QuestionType(t) => self.question_type = Some(*t),
            QaTag::Reference(r) => self.reference = Some(r.clone()),
            QaTag::McqAnswer(n) => self.mcq_answer = Some(*n),
            QaTag::Difficulty(d) => self.difficulty = Some(*d),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingQa {
    /// 1-based position of the question in the document.
    pub ordinal: usize,
    pub metadata: QaMetadata,
    /// Content paragraphs seen inside the question, even those whose items
    /// were all dropped (an unreadable image).
    pub question_paragraphs: usize,
    pub question: Vec<ContentItem>,
    pub answer: Vec<ContentItem>,
}

impl PendingQa {
    fn new(ordinal: usize, metadata: QaMetadata) -> Self {
        Self {
            ordinal,
            metadata,
            question_paragraphs: 0,
            question: Vec::new(),
            answer: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QaState {
    Idle,
    InQuestion(PendingQa),
    InAnswer(PendingQa),
}

pub struct QaMachine {
    ids: IdGenerator,
    state: QaState,
    staged: QaMetadata,
    started: usize,
    finished: Vec<Qa>,
}

impl QaMachine {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            ids,
            state: QaState::Idle,
            staged: QaMetadata::default(),
            started: 0,
            finished: Vec::new(),
        }
    }

    pub fn state(&self) -> &QaState {
        &self.state
    }

    /// True while a question or answer is open and content is kept.
    pub fn is_collecting(&self) -> bool {
        !matches!(self.state, QaState::Idle)
    }

    /// Apply the tags of one metadata paragraph in order. Returns the ordinal
    /// of the question that was opened by a `<question>` tag, if any.
    pub fn tags(
        &mut self,
        tags: &[QaTag],
        paragraph: usize,
        report: &mut ConversionReport,
    ) -> Result<Option<usize>, ConversionError> {
        let mut opened = None;
        for tag in tags {
            match tag {
                QaTag::Question => {
                    self.finalize(report)?;
                    self.started += 1;
                    let metadata = std::mem::take(&mut self.staged);
                    self.state = QaState::InQuestion(PendingQa::new(self.started, metadata));
                    opened = Some(self.started);
                }
                QaTag::Answer => {
                    let state = std::mem::replace(&mut self.state, QaState::Idle);
                    self.state = match state {
                        QaState::InQuestion(pending) | QaState::InAnswer(pending) => {
                            QaState::InAnswer(pending)
                        }
                        QaState::Idle => {
                            report.push(ConversionIssue::StrayAnswerTag { paragraph });
                            QaState::Idle
                        }
                    };
                }
                QaTag::Unknown(name) => report.push(ConversionIssue::UnknownTag {
                    paragraph,
                    tag: name.clone(),
                }),
                QaTag::Teach | QaTag::Revision => {
                    debug!("Section marker in Q&A document at paragraph {paragraph} ignored");
                }
                metadata => {
                    let target = match &mut self.state {
                        QaState::InQuestion(pending) => &mut pending.metadata,
                        QaState::Idle | QaState::InAnswer(_) => &mut self.staged,
                    };
                    target.apply(metadata);
                }
            }
        }
        Ok(opened)
    }

    /// Append content to the open question or answer. Content while idle is
    /// not part of any question and is dropped.
    pub fn content(&mut self, items: Vec<ContentItem>, paragraph: usize) {
        match &mut self.state {
            QaState::InQuestion(pending) => {
                pending.question_paragraphs += 1;
                pending.question.extend(items);
            }
            QaState::InAnswer(pending) => pending.answer.extend(items),
            QaState::Idle => {
                debug!("Paragraph {paragraph} precedes the first question, skipped");
            }
        }
    }

    /// Close the last question and return all records in document order.
    pub fn finish(mut self, report: &mut ConversionReport) -> Result<Vec<Qa>, ConversionError> {
        self.finalize(report)?;
        Ok(self.finished)
    }

    fn finalize(&mut self, report: &mut ConversionReport) -> Result<(), ConversionError> {
        let pending = match std::mem::replace(&mut self.state, QaState::Idle) {
            QaState::Idle => return Ok(()),
            QaState::InQuestion(pending) | QaState::InAnswer(pending) => pending,
        };
        if pending.question.is_empty() {
            if pending.question_paragraphs == 0 {
                return Err(ConversionError::EmptyQuestion {
                    ordinal: pending.ordinal,
                });
            }
            report.push(ConversionIssue::QuestionContentLost {
                question: pending.ordinal,
            });
            return Ok(());
        }
        if pending.answer.is_empty() {
            report.push(ConversionIssue::MissingAnswer {
                question: pending.ordinal,
            });
        }

        let metadata = pending.metadata;
        let mut defaulted = Vec::new();
        if !metadata.has_exercise_tag() {
            defaulted.push("exerciseType");
        }
        if metadata.question_type.is_none() {
            defaulted.push("questionType");
        }
        if !defaulted.is_empty() {
            report.push(ConversionIssue::DefaultedMetadata {
                question: pending.ordinal,
                fields: defaulted,
            });
        }

        self.finished.push(Qa {
            id: self.ids.record_id("qa", pending.ordinal),
            exercise_type: metadata.exercise_type(),
            question_type: metadata.question_type.unwrap_or_default(),
            reference: metadata.reference.clone().unwrap_or_default(),
            difficulty: metadata.difficulty.unwrap_or_default(),
            mcq_answer: metadata.mcq_answer,
            question: pending.question,
            answer: pending.answer,
        });
        Ok(())
    }
}
