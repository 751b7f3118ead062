//! DOCX Preprocessor
//!
//! Reads an Office Open XML word-processing package and produces the ordered
//! paragraph stream both conversion pipelines consume.

pub mod body_parser;
pub mod relationships;
pub mod styles;

use crate::error::ConversionError;
use crate::preprocessors::traits::Preprocessor;
use crate::types::*;
use crate::xml::XmlElement;
use anyhow::{Context, Result};
use relationships::{ContentTypes, Relationships};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;
use styles::StyleSheet;
use tracing::{debug, info};

const DOCUMENT_PART: &str = "word/document.xml";
const STYLES_PART: &str = "word/styles.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

#[derive(Debug, Default)]
pub struct DocxPreprocessor;

impl DocxPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for DocxPreprocessor {
    /// Step 1: Read the zip container into raw parts
    fn unpack(&self, document_bytes: &[u8]) -> Result<DocumentPackage> {
        let mut archive = zip::ZipArchive::new(Cursor::new(document_bytes))
            .context("Document is not a readable zip package")?;

        let mut package = DocumentPackage {
            document_xml: read_text_part(&mut archive, DOCUMENT_PART)?
                .ok_or_else(|| ConversionError::MissingPart(DOCUMENT_PART.to_string()))?,
            styles_xml: read_text_part(&mut archive, STYLES_PART)?,
            relationships_xml: read_text_part(&mut archive, RELATIONSHIPS_PART)?,
            content_types_xml: read_text_part(&mut archive, CONTENT_TYPES_PART)?,
            ..DocumentPackage::default()
        };

        let binary_names: Vec<String> = archive
            .file_names()
            .filter(|name| is_binary_part(name))
            .map(str::to_string)
            .collect();
        for name in binary_names {
            match read_binary_part(&mut archive, &name) {
                Ok(bytes) => {
                    package.media_parts.insert(name, bytes);
                }
                Err(e) => {
                    package.unreadable_parts.insert(name, e.to_string());
                }
            }
        }

        debug!(
            "📦 Unpacked package: {} media parts, {} unreadable",
            package.media_parts.len(),
            package.unreadable_parts.len()
        );
        Ok(package)
    }

    /// Step 2: Parse XML parts and resolve media references
    fn parse_package(&self, package: &DocumentPackage) -> Result<PreprocessorOutput> {
        let document =
            XmlElement::parse(&package.document_xml).context("Malformed word/document.xml")?;
        let styles = match &package.styles_xml {
            Some(xml) => StyleSheet::parse(&XmlElement::parse(xml).context("Malformed styles part")?),
            None => StyleSheet::default(),
        };
        let rels = match &package.relationships_xml {
            Some(xml) => Relationships::parse(
                &XmlElement::parse(xml).context("Malformed document relationships")?,
            ),
            None => Relationships::default(),
        };
        let content_types = match &package.content_types_xml {
            Some(xml) => ContentTypes::parse(
                &XmlElement::parse(xml).context("Malformed [Content_Types].xml")?,
            ),
            None => ContentTypes::default(),
        };

        let paragraphs = body_parser::parse_body(&document, &styles, &rels);

        let mut media = HashMap::new();
        let mut broken_media = HashMap::new();
        for paragraph in &paragraphs {
            for inline in &paragraph.inlines {
                let Inline::Image { rel_id } = inline else {
                    continue;
                };
                if media.contains_key(rel_id) || broken_media.contains_key(rel_id) {
                    continue;
                }
                match resolve_media(rel_id, &rels, &content_types, package) {
                    Ok(part) => {
                        media.insert(rel_id.clone(), part);
                    }
                    Err(reason) => {
                        broken_media.insert(rel_id.clone(), reason);
                    }
                }
            }
        }

        info!(
            "✅ Document parsing complete: {} paragraphs, {} images",
            paragraphs.len(),
            media.len()
        );

        Ok(PreprocessorOutput {
            paragraphs,
            media,
            broken_media,
        })
    }

    fn name(&self) -> &str {
        "DocxPreprocessor"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("docx"))
            .unwrap_or(false)
    }
}

fn is_binary_part(name: &str) -> bool {
    name.starts_with("word/")
        && !name.ends_with('/')
        && !name.ends_with(".xml")
        && !name.ends_with(".rels")
}

fn read_text_part<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to open {name}")),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .with_context(|| format!("Failed to read {name}"))?;
    Ok(Some(content))
}

fn read_binary_part<R: Read + std::io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut file = archive.by_name(name)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn resolve_media(
    rel_id: &str,
    rels: &Relationships,
    content_types: &ContentTypes,
    package: &DocumentPackage,
) -> std::result::Result<MediaPart, String> {
    let rel = rels
        .get(rel_id)
        .ok_or_else(|| "relationship not found".to_string())?;
    if rel.external {
        return Err(format!("linked image {} is not embedded", rel.target));
    }
    let part_name = rels
        .part_name(rel_id)
        .ok_or_else(|| "relationship has no target".to_string())?;
    if let Some(reason) = package.unreadable_parts.get(&part_name) {
        return Err(format!("{part_name} unreadable: {reason}"));
    }
    let bytes = package
        .media_parts
        .get(&part_name)
        .ok_or_else(|| format!("{part_name} missing from package"))?;
    if bytes.is_empty() {
        return Err(format!("{part_name} is empty"));
    }
    Ok(MediaPart {
        content_type: content_types.lookup(&part_name),
        part_name,
        bytes: bytes.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const DOCUMENT: &str = r#"<w:document xmlns:w="w" xmlns:r="r" xmlns:a="a"><w:body>
<w:p><w:pPr><w:pStyle w:val="SubTopic1"/></w:pPr><w:r><w:t>Motion</w:t></w:r></w:p>
<w:p><w:r><w:drawing><a:blip r:embed="rId1"/></w:drawing></w:r><w:r><w:drawing><a:blip r:embed="rId2"/></w:drawing></w:r></w:p>
</w:body></w:document>"#;

    const STYLES: &str = r##"<w:styles xmlns:w="w">
<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
<w:style w:type="paragraph" w:styleId="SubTopic1"><w:name w:val="# Sub Topic - 1"/></w:style>
</w:styles>"##;

    const RELS: &str = r#"<Relationships xmlns="r">
<Relationship Id="rId1" Target="media/image1.png"/>
<Relationship Id="rId2" Target="media/image2.png"/>
</Relationships>"#;

    #[test]
    fn reads_styles_and_media() {
        let bytes = build_package(&[
            (DOCUMENT_PART, DOCUMENT.as_bytes()),
            (STYLES_PART, STYLES.as_bytes()),
            (RELATIONSHIPS_PART, RELS.as_bytes()),
            ("word/media/image1.png", b"\x89PNG\r\n\x1a\nbody".as_slice()),
            ("word/media/image2.png", b"".as_slice()),
        ]);
        let output = DocxPreprocessor::new().process(&bytes).unwrap();

        assert_eq!(output.paragraphs.len(), 2);
        assert_eq!(
            output.paragraphs[0].style_name.as_deref(),
            Some("# Sub Topic - 1")
        );
        assert_eq!(output.paragraphs[1].style_name.as_deref(), Some("Normal"));
        assert_eq!(output.media["rId1"].part_name, "word/media/image1.png");
        assert!(output.broken_media["rId2"].contains("empty"));
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let bytes = build_package(&[(STYLES_PART, STYLES.as_bytes())]);
        let err = DocxPreprocessor::new().unpack(&bytes).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn rejects_non_zip_input() {
        assert!(DocxPreprocessor::new().process(b"plain text").is_err());
    }

    #[test]
    fn supports_docx_extension_only() {
        let preprocessor = DocxPreprocessor::new();
        assert!(preprocessor.supports_file_type(Path::new("input/3.docx")));
        assert!(preprocessor.supports_file_type(Path::new("input/3.DOCX")));
        assert!(!preprocessor.supports_file_type(Path::new("input/3.pdf")));
    }
}
