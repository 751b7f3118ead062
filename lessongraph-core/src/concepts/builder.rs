use crate::error::ConversionError;
use crate::ids::IdGenerator;
use crate::report::{ConversionIssue, ConversionReport};
use crate::types::*;

pub const PLACEHOLDER_LABEL: &str = "Untitled Topic";

/// One classified paragraph as seen by the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ConceptEvent {
    Heading { node_type: NodeType, label: String },
    Content(Vec<ContentItem>),
}

struct OpenNode {
    node: Node,
    /// 1-based ordinal path from the chapter root, used for ids.
    path: Vec<usize>,
}

/// Depth-stack tree builder.
///
/// `stack[d]` is the open node at depth `d`. A heading at depth `d` closes
/// every open node at depth `>= d` before it is pushed; content always goes
/// to the deepest open node.
pub struct NodeBuilder {
    ids: IdGenerator,
    stack: Vec<OpenNode>,
    roots: Vec<Node>,
}

impl NodeBuilder {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            ids,
            stack: Vec::with_capacity(NodeType::MAX_DEPTH + 1),
            roots: Vec::new(),
        }
    }

    /// Feed a flat list of events and return the finished tree.
    pub fn build(
        ids: IdGenerator,
        events: impl IntoIterator<Item = ConceptEvent>,
        report: &mut ConversionReport,
    ) -> Result<Vec<Node>, ConversionError> {
        let mut builder = Self::new(ids);
        for (index, event) in events.into_iter().enumerate() {
            match event {
                ConceptEvent::Heading { node_type, label } => {
                    builder.open_heading(node_type, label, index, report);
                }
                ConceptEvent::Content(items) => {
                    let preview = items
                        .first()
                        .and_then(|item| item.text.clone().or_else(|| item.url.clone()))
                        .unwrap_or_default();
                    builder.add_content(items, index, &preview)?;
                }
            }
        }
        Ok(builder.finish())
    }

    /// Open a node for a heading. Missing intermediate levels are filled with
    /// placeholder nodes so the new node always has a parent one level up.
    pub fn open_heading(
        &mut self,
        node_type: NodeType,
        label: String,
        paragraph: usize,
        report: &mut ConversionReport,
    ) {
        let depth = node_type.depth();
        self.close_to(depth);

        while self.stack.len() < depth {
            let missing_depth = self.stack.len();
            report.push(ConversionIssue::SkippedHeadingLevel {
                paragraph,
                label: label.clone(),
                missing_depth,
            });
            if let Some(placeholder_type) = NodeType::from_depth(missing_depth) {
                self.push(placeholder_type, PLACEHOLDER_LABEL.to_string());
            }
        }

        self.push(node_type, label);
    }

    /// Append content to the deepest open node.
    pub fn add_content(
        &mut self,
        items: Vec<ContentItem>,
        paragraph: usize,
        preview: &str,
    ) -> Result<(), ConversionError> {
        match self.stack.last_mut() {
            Some(open) => {
                open.node.content.extend(items);
                Ok(())
            }
            None => Err(ConversionError::ContentBeforeHeading {
                paragraph,
                preview: preview.to_string(),
            }),
        }
    }

    pub fn current_depth(&self) -> Option<usize> {
        self.stack.len().checked_sub(1)
    }

    /// Close every open node and return the depth-0 nodes in order.
    pub fn finish(mut self) -> Vec<Node> {
        self.close_to(0);
        self.roots
    }

    fn push(&mut self, node_type: NodeType, label: String) {
        let ordinal = match self.stack.last() {
            Some(parent) => parent.node.children.len() + 1,
            None => self.roots.len() + 1,
        };
        let mut path = self
            .stack
            .last()
            .map(|parent| parent.path.clone())
            .unwrap_or_default();
        path.push(ordinal);

        let id = self.ids.node_id(&path, &label);
        self.stack.push(OpenNode {
            node: Node::new(id, node_type, label),
            path,
        });
    }

    /// Pop open nodes until `depth` remain, attaching each to its parent.
    fn close_to(&mut self, depth: usize) {
        while self.stack.len() > depth {
            let Some(closed) = self.stack.pop() else {
                break;
            };
            match self.stack.last_mut() {
                Some(parent) => parent.node.children.push(closed.node),
                None => self.roots.push(closed.node),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdStrategy;

    fn ids() -> IdGenerator {
        IdGenerator::new(IdStrategy::Deterministic, "1")
    }

    fn heading(node_type: NodeType, label: &str) -> ConceptEvent {
        ConceptEvent::Heading {
            node_type,
            label: label.to_string(),
        }
    }

    fn body(text: &str) -> ConceptEvent {
        ConceptEvent::Content(vec![ContentItem::text(ContentType::Body, text)])
    }

    #[test]
    fn content_goes_to_deepest_open_node() {
        let mut report = ConversionReport::new();
        let roots = NodeBuilder::build(
            ids(),
            vec![
                heading(NodeType::Title1, "Matter"),
                body("intro"),
                heading(NodeType::Title2, "States"),
                heading(NodeType::Title3, "Solids"),
                body("fixed shape"),
                heading(NodeType::Title2, "Changes"),
                body("melting"),
                heading(NodeType::Title1, "Energy"),
            ],
            &mut report,
        )
        .unwrap();

        assert_eq!(roots.len(), 2);
        let matter = &roots[0];
        assert_eq!(matter.content.len(), 1);
        assert_eq!(matter.children.len(), 2);
        assert_eq!(matter.children[0].label, "States");
        assert_eq!(matter.children[0].children[0].label, "Solids");
        assert_eq!(
            matter.children[0].children[0].content[0].text.as_deref(),
            Some("fixed shape")
        );
        assert_eq!(matter.children[1].content[0].text.as_deref(), Some("melting"));
        assert_eq!(roots[1].label, "Energy");
        assert!(roots[1].children.is_empty() && roots[1].content.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn content_before_any_heading_is_an_error() {
        let mut report = ConversionReport::new();
        let err = NodeBuilder::build(ids(), vec![body("orphan")], &mut report).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ContentBeforeHeading { paragraph: 0, .. }
        ));
    }

    #[test]
    fn skipped_levels_get_placeholders() {
        let mut report = ConversionReport::new();
        let roots = NodeBuilder::build(
            ids(),
            vec![heading(NodeType::Title3, "Deep"), body("x")],
            &mut report,
        )
        .unwrap();
        assert_eq!(roots[0].label, PLACEHOLDER_LABEL);
        assert_eq!(roots[0].node_type, NodeType::Title1);
        assert_eq!(roots[0].children[0].node_type, NodeType::Title2);
        assert_eq!(roots[0].children[0].children[0].label, "Deep");
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn siblings_get_distinct_ids() {
        let mut report = ConversionReport::new();
        let roots = NodeBuilder::build(
            ids(),
            vec![
                heading(NodeType::Title1, "Summary"),
                heading(NodeType::Title1, "Summary"),
            ],
            &mut report,
        )
        .unwrap();
        assert_ne!(roots[0].id, roots[1].id);
        assert!(roots[0].id.ends_with("-Summary"));
    }

    #[test]
    fn current_depth_tracks_the_stack() {
        let mut report = ConversionReport::new();
        let mut builder = NodeBuilder::new(ids());
        assert_eq!(builder.current_depth(), None);
        builder.open_heading(NodeType::Title1, "A".into(), 0, &mut report);
        builder.open_heading(NodeType::Title2, "B".into(), 1, &mut report);
        assert_eq!(builder.current_depth(), Some(1));
        builder.open_heading(NodeType::Title1, "C".into(), 2, &mut report);
        assert_eq!(builder.current_depth(), Some(0));
        assert_eq!(builder.finish().len(), 2);
    }
}
