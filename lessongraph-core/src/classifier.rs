use crate::config::StyleTable;
use crate::types::*;
use std::collections::HashMap;

/// Maps paragraph style names to semantic roles through a fixed table.
/// Formatting is never inspected; only the style name counts.
pub struct StyleClassifier {
    table: HashMap<String, ParagraphRole>,
}

impl Default for StyleClassifier {
    fn default() -> Self {
        Self::new(&StyleTable::default())
    }
}

impl StyleClassifier {
    pub fn new(styles: &StyleTable) -> Self {
        let mut table = HashMap::new();
        let groups: [(&Vec<String>, ParagraphRole); 9] = [
            (&styles.title1, ParagraphRole::Heading(NodeType::Title1)),
            (&styles.title2, ParagraphRole::Heading(NodeType::Title2)),
            (&styles.title3, ParagraphRole::Heading(NodeType::Title3)),
            (&styles.bullet1, ParagraphRole::Content(ContentType::Bullet1)),
            (&styles.bullet2, ParagraphRole::Content(ContentType::Bullet2)),
            (&styles.number1, ParagraphRole::Content(ContentType::Number1)),
            (&styles.number2, ParagraphRole::Content(ContentType::Number2)),
            (&styles.meta_tag, ParagraphRole::MetaTag),
            (&styles.body, ParagraphRole::Content(ContentType::Body)),
        ];
        for (names, role) in groups {
            for name in names {
                table.insert(normalize(name), role);
            }
        }
        Self { table }
    }

    pub fn classify(&self, style_name: Option<&str>) -> ParagraphRole {
        style_name
            .and_then(|name| self.table.get(&normalize(name)).copied())
            .unwrap_or(ParagraphRole::Unrecognized)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_default_vocabulary() {
        let classifier = StyleClassifier::default();
        assert_eq!(
            classifier.classify(Some("# Sub Topic - 2")),
            ParagraphRole::Heading(NodeType::Title2)
        );
        assert_eq!(
            classifier.classify(Some("# Bullet-2")),
            ParagraphRole::Content(ContentType::Bullet2)
        );
        assert_eq!(
            classifier.classify(Some("# Number-1")),
            ParagraphRole::Content(ContentType::Number1)
        );
        assert_eq!(classifier.classify(Some("# Meta Data")), ParagraphRole::MetaTag);
        assert_eq!(
            classifier.classify(Some("Normal")),
            ParagraphRole::Content(ContentType::Body)
        );
    }

    #[test]
    fn unknown_and_missing_styles_are_unrecognized() {
        let classifier = StyleClassifier::default();
        assert_eq!(classifier.classify(Some("Title")), ParagraphRole::Unrecognized);
        assert_eq!(classifier.classify(None), ParagraphRole::Unrecognized);
    }

    #[test]
    fn custom_table_replaces_defaults() {
        let mut styles = StyleTable::default();
        styles.title1 = vec!["Heading 1".to_string()];
        let classifier = StyleClassifier::new(&styles);
        assert_eq!(
            classifier.classify(Some("Heading 1")),
            ParagraphRole::Heading(NodeType::Title1)
        );
        assert_eq!(
            classifier.classify(Some("# Sub Topic - 1")),
            ParagraphRole::Unrecognized
        );
    }
}
