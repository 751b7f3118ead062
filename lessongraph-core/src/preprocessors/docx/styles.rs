use crate::xml::XmlElement;
use std::collections::HashMap;

/// Style id → display name lookup built from `word/styles.xml`.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    names: HashMap<String, String>,
    default_paragraph: Option<String>,
}

impl StyleSheet {
    pub fn parse(styles: &XmlElement) -> Self {
        let mut sheet = StyleSheet::default();
        for style in styles.children_named("style") {
            let Some(id) = style.attr("styleId") else {
                continue;
            };
            let name = style
                .child("name")
                .and_then(|n| n.attr("val"))
                .unwrap_or(id)
                .to_string();
            let is_default = matches!(style.attr("default"), Some("1") | Some("true"));
            if is_default && style.attr("type") == Some("paragraph") {
                sheet.default_paragraph = Some(name.clone());
            }
            sheet.names.insert(id.to_string(), name);
        }
        sheet
    }

    /// Display name for a paragraph's `w:pStyle` value. Unknown ids resolve to
    /// themselves; paragraphs without a style get the default paragraph style.
    pub fn resolve(&self, style_id: Option<&str>) -> Option<String> {
        match style_id {
            Some(id) => Some(self.names.get(id).cloned().unwrap_or_else(|| id.to_string())),
            None => self.default_paragraph.clone(),
        }
    }
}
