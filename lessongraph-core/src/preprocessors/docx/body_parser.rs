//! WordprocessingML body walker
//!
//! Flattens `w:body` into an ordered paragraph stream. Within a paragraph the
//! walk keeps the source order of:
//! - text runs (with bold state)
//! - hyperlinks, tracked insertions, smart tags and other run containers
//! - inline (`m:oMath`) and display (`m:oMathPara`) equations
//! - image references from DrawingML and VML
//!
//! Tables and content controls are descended into in reading order.

use super::relationships::Relationships;
use super::styles::StyleSheet;
use crate::types::*;
use crate::xml::XmlElement;

/// Walk the `w:document` root and return every paragraph in reading order.
pub fn parse_body(
    document: &XmlElement,
    styles: &StyleSheet,
    rels: &Relationships,
) -> Vec<DocParagraph> {
    let mut walker = BodyWalker {
        styles,
        rels,
        paragraphs: Vec::new(),
    };
    let body = document.child("body").unwrap_or(document);
    walker.walk_blocks(body, false);
    walker.paragraphs
}

struct BodyWalker<'a> {
    styles: &'a StyleSheet,
    rels: &'a Relationships,
    paragraphs: Vec<DocParagraph>,
}

impl BodyWalker<'_> {
    fn walk_blocks(&mut self, container: &XmlElement, in_table: bool) {
        for block in container.elements() {
            match block.local_name() {
                "p" => self.paragraph(block, in_table),
                "tbl" => {
                    for row in block.children_named("tr") {
                        for cell in row.children_named("tc") {
                            self.walk_blocks(cell, true);
                        }
                    }
                }
                "sdt" => {
                    if let Some(content) = block.child("sdtContent") {
                        self.walk_blocks(content, in_table);
                    }
                }
                "customXml" | "ins" => self.walk_blocks(block, in_table),
                "AlternateContent" => {
                    if let Some(branch) = preferred_branch(block) {
                        self.walk_blocks(branch, in_table);
                    }
                }
                _ => {}
            }
        }
    }

    fn paragraph(&mut self, p: &XmlElement, in_table: bool) {
        let style_id = p
            .child("pPr")
            .and_then(|ppr| ppr.child("pStyle"))
            .and_then(|style| style.attr("val"));
        let mut paragraph =
            DocParagraph::new(self.paragraphs.len(), self.styles.resolve(style_id));
        paragraph.in_table = in_table;
        self.inline_children(p, &mut paragraph.inlines);
        self.paragraphs.push(paragraph);
    }

    fn inline_children(&self, parent: &XmlElement, out: &mut Vec<Inline>) {
        for child in parent.elements() {
            match child.local_name() {
                "r" => self.run(child, out),
                "hyperlink" => {
                    if let Some(url) = child.attr("id").and_then(|id| self.rels.external_url(id)) {
                        out.push(Inline::Link {
                            url: url.to_string(),
                        });
                    }
                    self.inline_children(child, out);
                }
                "ins" | "smartTag" | "fldSimple" | "customXml" | "sdtContent" => {
                    self.inline_children(child, out)
                }
                "sdt" => {
                    if let Some(content) = child.child("sdtContent") {
                        self.inline_children(content, out);
                    }
                }
                "AlternateContent" => {
                    if let Some(branch) = preferred_branch(child) {
                        self.inline_children(branch, out);
                    }
                }
                "oMath" => out.push(Inline::Math {
                    element: child.clone(),
                    display: false,
                }),
                "oMathPara" => out.push(Inline::Math {
                    element: child.clone(),
                    display: true,
                }),
                // del, pPr, bookmarks, proofing marks
                _ => {}
            }
        }
    }

    fn run(&self, run: &XmlElement, out: &mut Vec<Inline>) {
        let bold = run.child("rPr").map(is_bold).unwrap_or(false);
        for piece in run.elements() {
            match piece.local_name() {
                "t" => push_text(out, piece.own_text(), bold),
                "tab" => push_text(out, "\t".to_string(), bold),
                "br" | "cr" => push_text(out, "\n".to_string(), bold),
                "noBreakHyphen" => push_text(out, "-".to_string(), bold),
                "drawing" | "pict" | "object" => image_refs(piece, out),
                "AlternateContent" => {
                    if let Some(branch) = preferred_branch(piece) {
                        image_refs(branch, out);
                    }
                }
                _ => {}
            }
        }
    }
}

fn push_text(out: &mut Vec<Inline>, text: String, bold: bool) {
    if !text.is_empty() {
        out.push(Inline::Text { text, bold });
    }
}

/// `w:b` present and not switched off.
fn is_bold(rpr: &XmlElement) -> bool {
    match rpr.child("b") {
        Some(b) => !matches!(b.attr("val"), Some("false") | Some("0") | Some("off")),
        None => false,
    }
}

/// Image relationship ids below a drawing: `a:blip/@r:embed` for DrawingML,
/// `v:imagedata/@r:id` for legacy VML. SmartArt, drawing canvases and
/// cropped pictures are flagged ahead of the images they contain.
fn image_refs(container: &XmlElement, out: &mut Vec<Inline>) {
    if !container.descendants("relIds").is_empty() {
        out.push(Inline::Object(EmbeddedObject::SmartArt));
    }
    if !container.descendants("wpc").is_empty() {
        out.push(Inline::Object(EmbeddedObject::DrawingCanvas));
    }
    if is_cropped(container) {
        out.push(Inline::Object(EmbeddedObject::CroppedImage));
    }
    for blip in container.descendants("blip") {
        if let Some(id) = blip.attr("embed") {
            out.push(Inline::Image {
                rel_id: id.to_string(),
            });
        }
    }
    for data in container.descendants("imagedata") {
        if let Some(id) = data.attr("id") {
            out.push(Inline::Image {
                rel_id: id.to_string(),
            });
        }
    }
}

/// A non-zero crop edge on `a:srcRect` (DrawingML) or `v:imagedata` (VML).
fn is_cropped(container: &XmlElement) -> bool {
    let non_zero = |value: Option<&str>| {
        value.is_some_and(|v| {
            let v = v.trim().trim_end_matches('f');
            !v.is_empty() && v.parse::<f64>().map_or(true, |n| n != 0.0)
        })
    };
    let drawingml = container
        .descendants("srcRect")
        .into_iter()
        .any(|rect| ["l", "t", "r", "b"].iter().any(|edge| non_zero(rect.attr(edge))));
    let vml = container.descendants("imagedata").into_iter().any(|data| {
        ["cropleft", "croptop", "cropright", "cropbottom"]
            .iter()
            .any(|edge| non_zero(data.attr(edge)))
    });
    drawingml || vml
}

/// Markup-compatibility block: take `mc:Choice`, else `mc:Fallback`.
fn preferred_branch(alternate: &XmlElement) -> Option<&XmlElement> {
    alternate
        .child("Choice")
        .or_else(|| alternate.child("Fallback"))
}
