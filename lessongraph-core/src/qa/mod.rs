//! Question/answer ledger conversion.

pub mod machine;
pub mod tags;

use crate::classifier::StyleClassifier;
use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::extract::{flag_objects, ContentExtractor, Converted};
use crate::ids::IdGenerator;
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;
use machine::QaMachine;
use tags::parse_tags;
use tracing::{debug, info};

pub struct QaPipeline<'a> {
    config: &'a ConversionConfig,
    classifier: StyleClassifier,
    asset_dir: String,
}

impl<'a> QaPipeline<'a> {
    pub fn new(config: &'a ConversionConfig) -> Self {
        Self {
            config,
            classifier: StyleClassifier::new(&config.styles),
            asset_dir: String::new(),
        }
    }

    /// Directory under the images root that this document's images go to.
    pub fn with_asset_dir(mut self, dir: impl Into<String>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Collect the Q&A records of one chapter document in document order.
    pub fn convert(
        &self,
        document: &PreprocessorOutput,
        ids: IdGenerator,
    ) -> Result<Converted<Vec<Qa>>, ConversionError> {
        let mut report = ConversionReport::new();
        let mut extractor = ContentExtractor::new(self.config);
        extractor.set_asset_dir(&self.asset_dir);
        let mut machine = QaMachine::new(ids);

        for paragraph in &document.paragraphs {
            let content_type = match self.classifier.classify(paragraph.style_name.as_deref()) {
                ParagraphRole::MetaTag => {
                    let tags = parse_tags(&paragraph.plain_text());
                    if let Some(ordinal) = machine.tags(&tags, paragraph.index, &mut report)? {
                        extractor.enter_node(&format!("question-{ordinal}"));
                    }
                    continue;
                }
                ParagraphRole::Heading(_) => {
                    debug!("Heading paragraph {} skipped in Q&A mode", paragraph.index);
                    continue;
                }
                ParagraphRole::Content(content_type) => content_type,
                ParagraphRole::Unrecognized => {
                    if !paragraph.has_visible_content() {
                        continue;
                    }
                    report.push(ConversionIssue::UnrecognizedStyle {
                        paragraph: paragraph.index,
                        style: paragraph.style_name.clone().unwrap_or_default(),
                    });
                    ContentType::Body
                }
            };

            // Extracting while idle would assign image names nobody links to.
            if !machine.is_collecting() {
                debug!("Paragraph {} precedes the first question, skipped", paragraph.index);
                continue;
            }
            flag_objects(paragraph, &mut report);
            if !paragraph.has_visible_content() {
                continue;
            }
            if paragraph.in_table {
                report.push(ConversionIssue::TableContent {
                    paragraph: paragraph.index,
                });
            }
            let items = extractor.extract(paragraph, content_type, document, &mut report);
            machine.content(items, paragraph.index);
        }

        let questions = machine.finish(&mut report)?;
        info!(
            "✅ Collected {} questions ({} issues)",
            questions.len(),
            report.len()
        );
        Ok(Converted {
            records: questions,
            images: extractor.take_images(),
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdStrategy;

    fn paragraph(index: usize, style: &str, text: &str) -> DocParagraph {
        let mut p = DocParagraph::new(index, Some(style.to_string()));
        p.inlines.push(Inline::Text {
            text: text.to_string(),
            bold: false,
        });
        p
    }

    fn convert(paragraphs: Vec<DocParagraph>) -> Result<Converted<Vec<Qa>>, ConversionError> {
        let config = ConversionConfig::default();
        let document = PreprocessorOutput {
            paragraphs,
            ..Default::default()
        };
        QaPipeline::new(&config).convert(&document, IdGenerator::new(IdStrategy::Deterministic, "2"))
    }

    #[test]
    fn tag_sequence_yields_two_records_without_leaking_metadata() {
        let converted = convert(vec![
            paragraph(0, "# Sub Topic - 1", "Exercises"),
            paragraph(1, "# Body", "Answer the following."),
            paragraph(2, "# Meta Data", "<book_exercise><type=1><question>"),
            paragraph(3, "# Body", "Q1"),
            paragraph(4, "# Meta Data", "<answer>"),
            paragraph(5, "# Body", "A1"),
            paragraph(6, "# Meta Data", "<question>"),
            paragraph(7, "# Body", "Q2"),
            paragraph(8, "# Meta Data", "<answer>"),
            paragraph(9, "# Bullet-1", "A2"),
        ])
        .unwrap();

        let records = &converted.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].exercise_type, ExerciseType::Book);
        assert_eq!(records[0].question_type, QuestionType::VeryShort);
        assert_eq!(records[0].question, vec![ContentItem::text(ContentType::Body, "Q1")]);
        assert_eq!(records[0].answer, vec![ContentItem::text(ContentType::Body, "A1")]);
        assert_eq!(records[1].exercise_type, ExerciseType::Extra);
        assert_eq!(records[1].question_type, QuestionType::Short);
        assert_eq!(records[1].answer, vec![ContentItem::text(ContentType::Bullet1, "A2")]);
    }

    #[test]
    fn empty_question_aborts() {
        let err = convert(vec![
            paragraph(0, "# Meta Data", "<question>"),
            paragraph(1, "# Meta Data", "<answer>"),
            paragraph(2, "# Body", "An answer to nothing"),
        ])
        .unwrap_err();
        assert!(matches!(err, ConversionError::EmptyQuestion { ordinal: 1 }));
    }

    #[test]
    fn unreadable_image_drops_only_its_question() {
        let mut picture = DocParagraph::new(1, Some("# Body".to_string()));
        picture.inlines.push(Inline::Image {
            rel_id: "rId404".to_string(),
        });
        let converted = convert(vec![
            paragraph(0, "# Meta Data", "<question>"),
            picture,
            paragraph(2, "# Meta Data", "<answer>"),
            paragraph(3, "# Body", "A1"),
            paragraph(4, "# Meta Data", "<question>"),
            paragraph(5, "# Body", "Q2"),
            paragraph(6, "# Meta Data", "<answer>"),
            paragraph(7, "# Body", "A2"),
        ])
        .unwrap();

        assert_eq!(converted.records.len(), 1);
        assert_eq!(
            converted.records[0].question,
            vec![ContentItem::text(ContentType::Body, "Q2")]
        );
        assert!(converted.report.issues.iter().any(|issue| matches!(
            issue,
            ConversionIssue::MediaUnavailable { paragraph: 1, .. }
        )));
        assert!(converted
            .report
            .issues
            .contains(&ConversionIssue::QuestionContentLost { question: 1 }));
    }

    #[test]
    fn unknown_tags_and_unrecognized_styles_are_reported() {
        let converted = convert(vec![
            paragraph(0, "# Meta Data", "<question><hint>"),
            paragraph(1, "Quote", "Define work."),
            paragraph(2, "# Meta Data", "<answer>"),
            paragraph(3, "# Body", "Force times displacement."),
        ])
        .unwrap();
        assert_eq!(converted.records.len(), 1);
        assert!(converted.report.issues.contains(&ConversionIssue::UnknownTag {
            paragraph: 0,
            tag: "hint".to_string()
        }));
        assert!(converted.report.issues.contains(&ConversionIssue::UnrecognizedStyle {
            paragraph: 1,
            style: "Quote".to_string()
        }));
    }
}
