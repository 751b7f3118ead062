use crate::xml::XmlElement;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub target: String,
    pub external: bool,
}

/// Relationships of the main document part (`word/_rels/document.xml.rels`).
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    pub fn parse(rels: &XmlElement) -> Self {
        let by_id = rels
            .children_named("Relationship")
            .filter_map(|rel| {
                let id = rel.attr("Id")?;
                let target = rel.attr("Target")?;
                let external = rel.attr("TargetMode") == Some("External");
                Some((
                    id.to_string(),
                    Relationship {
                        target: target.to_string(),
                        external,
                    },
                ))
            })
            .collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    /// External URL of a hyperlink relationship.
    pub fn external_url(&self, id: &str) -> Option<&str> {
        self.get(id)
            .filter(|rel| rel.external)
            .map(|rel| rel.target.as_str())
    }

    /// Package part name an internal relationship points at.
    pub fn part_name(&self, id: &str) -> Option<String> {
        self.get(id)
            .filter(|rel| !rel.external)
            .map(|rel| resolve_part_name("word", &rel.target))
    }
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_part_name(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// `[Content_Types].xml`: extension defaults plus per-part overrides.
#[derive(Debug, Clone, Default)]
pub struct ContentTypes {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, String>,
}

impl ContentTypes {
    pub fn parse(types: &XmlElement) -> Self {
        let mut content_types = ContentTypes::default();
        for element in types.elements() {
            let Some(content_type) = element.attr("ContentType") else {
                continue;
            };
            if element.is("Default") {
                if let Some(ext) = element.attr("Extension") {
                    content_types
                        .defaults
                        .insert(ext.to_ascii_lowercase(), content_type.to_string());
                }
            } else if element.is("Override") {
                if let Some(part) = element.attr("PartName") {
                    content_types.overrides.insert(
                        part.trim_start_matches('/').to_string(),
                        content_type.to_string(),
                    );
                }
            }
        }
        content_types
    }

    pub fn lookup(&self, part_name: &str) -> Option<String> {
        if let Some(found) = self.overrides.get(part_name) {
            return Some(found.clone());
        }
        let ext = part_name.rsplit_once('.')?.1.to_ascii_lowercase();
        self.defaults.get(&ext).cloned()
    }
}
