//! Concept-tree conversion.
//!
//! Classified paragraphs drive a [`NodeBuilder`]; content paragraphs go through
//! the shared [`ContentExtractor`] so items look the same as in Q&A records.

pub mod builder;

use crate::classifier::StyleClassifier;
use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::extract::{flag_objects, ContentExtractor, Converted};
use crate::ids::IdGenerator;
use crate::qa::tags::{parse_tags, QaTag};
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;
use builder::NodeBuilder;
use std::ops::Range;
use tracing::{debug, info};

pub struct ConceptPipeline<'a> {
    config: &'a ConversionConfig,
    classifier: StyleClassifier,
    asset_dir: String,
}

impl<'a> ConceptPipeline<'a> {
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

    /// Build the node tree of one chapter document.
    pub fn convert(
        &self,
        document: &PreprocessorOutput,
        ids: IdGenerator,
    ) -> Result<Converted<Vec<Node>>, ConversionError> {
        let mut report = ConversionReport::new();
        let mut extractor = ContentExtractor::new(self.config);
        extractor.set_asset_dir(&self.asset_dir);
        let mut builder = NodeBuilder::new(ids);

        let window = self.section_window(&document.paragraphs);
        if window.start > 0 || window.end < document.paragraphs.len() {
            info!(
                "📑 Converting teaching section: paragraphs {}..{}",
                window.start, window.end
            );
        }

        for paragraph in &document.paragraphs[window] {
            flag_objects(paragraph, &mut report);
            let content_type = match self.classifier.classify(paragraph.style_name.as_deref()) {
                ParagraphRole::Heading(node_type) => {
                    let media = extractor.heading_media(paragraph);
                    if media > 0 {
                        report.push(ConversionIssue::HeadingMedia {
                            paragraph: paragraph.index,
                            count: media,
                        });
                    }
                    let label = extractor.label(paragraph);
                    if label.is_empty() {
                        report.push(ConversionIssue::EmptyHeading {
                            paragraph: paragraph.index,
                        });
                        continue;
                    }
                    extractor.enter_node(&label);
                    builder.open_heading(node_type, label, paragraph.index, &mut report);
                    continue;
                }
                ParagraphRole::MetaTag => {
                    debug!("Metadata paragraph {} skipped", paragraph.index);
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

            if !paragraph.has_visible_content() {
                debug!("Empty paragraph {} skipped", paragraph.index);
                continue;
            }
            if builder.current_depth().is_none() {
                return Err(ConversionError::ContentBeforeHeading {
                    paragraph: paragraph.index,
                    preview: paragraph.preview(),
                });
            }
            if paragraph.in_table {
                report.push(ConversionIssue::TableContent {
                    paragraph: paragraph.index,
                });
            }

            let items = extractor.extract(paragraph, content_type, document, &mut report);
            builder.add_content(items, paragraph.index, &paragraph.preview())?;
        }

        let nodes = builder.finish();
        info!(
            "✅ Built {} top-level nodes ({} issues)",
            nodes.len(),
            report.len()
        );
        Ok(Converted {
            records: nodes,
            images: extractor.take_images(),
            report,
        })
    }

    /// Paragraph range to convert. With section markers on, a `<teach>` tag
    /// paragraph opens the range and the next `<revision>` or `<question>`
    /// closes it.
    fn section_window(&self, paragraphs: &[DocParagraph]) -> Range<usize> {
        if !self.config.honor_section_markers {
            return 0..paragraphs.len();
        }
        let tags_at = |index: usize| -> Vec<QaTag> {
            let paragraph = &paragraphs[index];
            match self.classifier.classify(paragraph.style_name.as_deref()) {
                ParagraphRole::MetaTag => parse_tags(&paragraph.plain_text()),
                _ => Vec::new(),
            }
        };

        let Some(teach) = (0..paragraphs.len()).find(|&i| tags_at(i).contains(&QaTag::Teach))
        else {
            return 0..paragraphs.len();
        };
        let end = (teach + 1..paragraphs.len())
            .find(|&i| {
                tags_at(i)
                    .iter()
                    .any(|tag| matches!(tag, QaTag::Revision | QaTag::Question))
            })
            .unwrap_or(paragraphs.len());
        teach + 1..end
    }
}
