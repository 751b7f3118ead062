//! Content extraction shared by the concept and Q&A pipelines.
//!
//! Both pipelines turn a content paragraph into ContentItems through the same
//! `ContentExtractor`, so a bullet or an image looks identical whether it ends
//! up under a concept node or inside a question.

pub mod equation;
pub mod images;
pub mod inline;

use crate::config::ConversionConfig;
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;
use equation::EquationConverter;
use images::{ExtractedImage, ImageExtractor};
use inline::Segment;

/// Output of one pipeline run over a document: the records, the images they
/// reference (not yet written), and the issues found on the way.
#[derive(Debug)]
pub struct Converted<T> {
    pub records: T,
    pub images: Vec<ExtractedImage>,
    pub report: ConversionReport,
}

/// Report drawings in the paragraph that need manual review.
pub fn flag_objects(paragraph: &DocParagraph, report: &mut ConversionReport) {
    for inline in &paragraph.inlines {
        if let Inline::Object(object) = inline {
            report.push(ConversionIssue::ManualReview {
                paragraph: paragraph.index,
                object: *object,
            });
        }
    }
}

pub struct ContentExtractor {
    equations: EquationConverter,
    images: ImageExtractor,
    math_delimiter: String,
}

impl ContentExtractor {
    pub fn new(config: &ConversionConfig) -> Self {
        Self {
            equations: EquationConverter::new(),
            images: ImageExtractor::new(config),
            math_delimiter: config.inline_math_delimiter.clone(),
        }
    }

    pub fn set_asset_dir(&mut self, dir: &str) {
        self.images.set_asset_dir(dir);
    }

    /// Images attached from here on belong to the node with this label.
    pub fn enter_node(&mut self, label: &str) {
        self.images.enter_node(label);
    }

    /// ContentItems for one paragraph, in document order. Prose takes the
    /// paragraph's content type; equations, images and videos get their own.
    pub fn extract(
        &mut self,
        paragraph: &DocParagraph,
        content_type: ContentType,
        document: &PreprocessorOutput,
        report: &mut ConversionReport,
    ) -> Vec<ContentItem> {
        let segments = inline::segment_paragraph(
            paragraph,
            &self.equations,
            &self.math_delimiter,
            report,
        );
        let mut items = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Prose(text) => items.push(ContentItem::text(content_type, text)),
                Segment::Equation(latex) => items.push(ContentItem::equation(latex)),
                Segment::Image { rel_id } => {
                    if let Some(item) =
                        self.images
                            .extract(&rel_id, document, paragraph.index, report)
                    {
                        items.push(item);
                    }
                }
                Segment::Video { url } => {
                    items.push(ContentItem::media(ContentType::Video, url))
                }
            }
        }
        items
    }

    /// Images and video links a heading paragraph carries; labels keep only
    /// text, so these would otherwise vanish.
    pub fn heading_media(&self, paragraph: &DocParagraph) -> usize {
        paragraph
            .inlines
            .iter()
            .filter(|inline| matches!(inline, Inline::Image { .. } | Inline::Link { .. }))
            .count()
    }

    /// Plain label text for headings: visible run text plus inline math.
    pub fn label(&self, paragraph: &DocParagraph) -> String {
        let mut label = String::new();
        for inline in &paragraph.inlines {
            match inline {
                Inline::Text { text, .. } => label.push_str(text),
                Inline::Math { element, .. } => {
                    label.push_str(&self.equations.convert(element).latex)
                }
                Inline::Image { .. } | Inline::Link { .. } | Inline::Object(_) => {}
            }
        }
        label.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn take_images(&mut self) -> Vec<ExtractedImage> {
        self.images.take_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_takes_paragraph_type_and_images_follow_in_order() {
        let mut document = PreprocessorOutput::default();
        document.media.insert(
            "rId1".to_string(),
            MediaPart {
                part_name: "word/media/image1.png".to_string(),
                content_type: Some("image/png".to_string()),
                bytes: vec![1, 2, 3],
            },
        );
        let mut paragraph = DocParagraph::new(2, Some("# Bullet-1".to_string()));
        paragraph.inlines = vec![
            Inline::Text {
                text: "A lever".to_string(),
                bold: false,
            },
            Inline::Image {
                rel_id: "rId1".to_string(),
            },
        ];

        let config = ConversionConfig::default();
        let mut extractor = ContentExtractor::new(&config);
        extractor.enter_node("Simple Machines");
        let mut report = ConversionReport::new();
        let items = extractor.extract(&paragraph, ContentType::Bullet1, &document, &mut report);

        assert_eq!(
            items,
            vec![
                ContentItem::text(ContentType::Bullet1, "A lever"),
                ContentItem::media(ContentType::Image, "/db/images/Simple-Machines-1.png"),
            ]
        );
        assert_eq!(extractor.take_images().len(), 1);
    }

    #[test]
    fn label_collapses_whitespace() {
        let mut paragraph = DocParagraph::new(0, None);
        paragraph.inlines = vec![
            Inline::Text {
                text: "  Laws of ".to_string(),
                bold: true,
            },
            Inline::Text {
                text: "\tMotion ".to_string(),
                bold: false,
            },
        ];
        let extractor = ContentExtractor::new(&ConversionConfig::default());
        assert_eq!(extractor.label(&paragraph), "Laws of Motion");
    }
}
