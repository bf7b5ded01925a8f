//! Intermediate Document Format (IDF)
//! The typed content tree the pagination host hands to the figure layout
//! hooks. Built once from the article markup and traversed by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A string type for the document.
pub type TextStr = String;

/// Host-visible `data-*` attributes written onto nodes.
pub type Attributes = BTreeMap<TextStr, TextStr>;

/// Metadata shared by every block-level `IRNode`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TextStr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<TextStr>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    /// Figure ids attributed to this block without an explicit link.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implicit_refs: Vec<TextStr>,
}

impl NodeMetadata {
    pub fn with_id(id: impl Into<TextStr>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// The image of a figure, with its natural (intrinsic) pixel size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureImage {
    pub src: TextStr,
    pub natural_width: f32,
    pub natural_height: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<Vec<InlineNode>>,
}

/// A block-level element in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IRNode {
    /// A generic block container with no sectioning semantics.
    Block {
        #[serde(default)]
        meta: NodeMetadata,
        children: Vec<IRNode>,
    },
    /// A sectioning container; figures do not wander across these by default.
    Section {
        #[serde(default)]
        meta: NodeMetadata,
        children: Vec<IRNode>,
    },
    Heading {
        #[serde(default)]
        meta: NodeMetadata,
        level: u8,
        children: Vec<InlineNode>,
    },
    Paragraph {
        #[serde(default)]
        meta: NodeMetadata,
        children: Vec<InlineNode>,
    },
    Figure {
        #[serde(default)]
        meta: NodeMetadata,
        image: FigureImage,
        #[serde(default)]
        caption: Vec<InlineNode>,
        /// Placement variant requested by the markup, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        class: Option<TextStr>,
    },
    Table {
        #[serde(default)]
        meta: NodeMetadata,
        #[serde(default)]
        caption: Vec<InlineNode>,
        rows: Vec<TableRow>,
    },
    /// Figures lifted out of the text flow, waiting to be placed.
    FigurePool { figures: Vec<IRNode> },
}

impl IRNode {
    pub fn meta(&self) -> Option<&NodeMetadata> {
        match self {
            IRNode::Block { meta, .. }
            | IRNode::Section { meta, .. }
            | IRNode::Heading { meta, .. }
            | IRNode::Paragraph { meta, .. }
            | IRNode::Figure { meta, .. }
            | IRNode::Table { meta, .. } => Some(meta),
            IRNode::FigurePool { .. } => None,
        }
    }

    pub fn meta_mut(&mut self) -> Option<&mut NodeMetadata> {
        match self {
            IRNode::Block { meta, .. }
            | IRNode::Section { meta, .. }
            | IRNode::Heading { meta, .. }
            | IRNode::Paragraph { meta, .. }
            | IRNode::Figure { meta, .. }
            | IRNode::Table { meta, .. } => Some(meta),
            IRNode::FigurePool { .. } => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.meta().and_then(|m| m.id.as_deref())
    }

    /// Returns a string identifier for the node type.
    pub fn kind(&self) -> &'static str {
        match self {
            IRNode::Block { .. } => "block",
            IRNode::Section { .. } => "section",
            IRNode::Heading { .. } => "heading",
            IRNode::Paragraph { .. } => "paragraph",
            IRNode::Figure { .. } => "figure",
            IRNode::Table { .. } => "table",
            IRNode::FigurePool { .. } => "figure-pool",
        }
    }

    /// Block-level children, for container nodes.
    pub fn children(&self) -> &[IRNode] {
        match self {
            IRNode::Block { children, .. } | IRNode::Section { children, .. } => children,
            IRNode::FigurePool { figures } => figures,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<IRNode>> {
        match self {
            IRNode::Block { children, .. } | IRNode::Section { children, .. } => Some(children),
            IRNode::FigurePool { figures } => Some(figures),
            _ => None,
        }
    }

    /// Whether the node carries running text that may reference figures.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            IRNode::Paragraph { .. } | IRNode::Heading { .. } | IRNode::Table { .. }
        )
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, IRNode::Heading { .. })
    }

    /// Number of characters of visible text in the node.
    pub fn text_len(&self) -> usize {
        match self {
            IRNode::Heading { children, .. } | IRNode::Paragraph { children, .. } => {
                inline_text_len(children)
            }
            IRNode::Figure { caption, .. } => inline_text_len(caption),
            IRNode::Table { caption, rows, .. } => {
                inline_text_len(caption)
                    + rows
                        .iter()
                        .flat_map(|r| r.cells.iter())
                        .map(|c| inline_text_len(c))
                        .sum::<usize>()
            }
            IRNode::Block { children, .. } | IRNode::Section { children, .. } => {
                children.iter().map(IRNode::text_len).sum()
            }
            IRNode::FigurePool { .. } => 0,
        }
    }

    /// Link targets of all hyperlinks in the node's inline content, in order.
    pub fn link_targets(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            IRNode::Heading { children, .. } | IRNode::Paragraph { children, .. } => {
                collect_links(children, &mut out)
            }
            IRNode::Table { caption, rows, .. } => {
                collect_links(caption, &mut out);
                for cell in rows.iter().flat_map(|r| r.cells.iter()) {
                    collect_links(cell, &mut out);
                }
            }
            _ => {}
        }
        out
    }
}

/// Represents an inline-level element within a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InlineNode {
    Text { text: TextStr },
    Emphasis { children: Vec<InlineNode> },
    /// A hyperlink. `#fig-1` style targets may resolve to a figure.
    Hyperlink {
        href: TextStr,
        children: Vec<InlineNode>,
    },
    LineBreak,
}

impl InlineNode {
    pub fn text(s: impl Into<TextStr>) -> Self {
        InlineNode::Text { text: s.into() }
    }

    pub fn link(href: impl Into<TextStr>, label: impl Into<TextStr>) -> Self {
        InlineNode::Hyperlink {
            href: href.into(),
            children: vec![InlineNode::text(label)],
        }
    }
}

fn inline_text_len(nodes: &[InlineNode]) -> usize {
    nodes
        .iter()
        .map(|n| match n {
            InlineNode::Text { text } => text.chars().count(),
            InlineNode::Emphasis { children } | InlineNode::Hyperlink { children, .. } => {
                inline_text_len(children)
            }
            InlineNode::LineBreak => 0,
        })
        .sum()
}

fn collect_links<'a>(nodes: &'a [InlineNode], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            InlineNode::Hyperlink { href, children } => {
                out.push(href.as_str());
                collect_links(children, out);
            }
            InlineNode::Emphasis { children } => collect_links(children, out),
            InlineNode::Text { .. } | InlineNode::LineBreak => {}
        }
    }
}

/// A complete article, as handed to the layout hooks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentTree {
    pub document_id: TextStr,
    pub children: Vec<IRNode>,
}

impl ContentTree {
    pub fn new(document_id: impl Into<TextStr>, children: Vec<IRNode>) -> Self {
        Self {
            document_id: document_id.into(),
            children,
        }
    }

    /// Finds a node by id anywhere in the tree.
    pub fn find(&self, id: &str) -> Option<&IRNode> {
        fn search<'a>(nodes: &'a [IRNode], id: &str) -> Option<&'a IRNode> {
            for node in nodes {
                if node.id() == Some(id) {
                    return Some(node);
                }
                if let Some(found) = search(node.children(), id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.children, id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut IRNode> {
        fn search<'a>(nodes: &'a mut [IRNode], id: &str) -> Option<&'a mut IRNode> {
            for node in nodes {
                if node.id() == Some(id) {
                    return Some(node);
                }
                if let Some(children) = node.children_mut() {
                    if let Some(found) = search(children, id) {
                        return Some(found);
                    }
                }
            }
            None
        }
        search(&mut self.children, id)
    }

    /// The figure pool produced by the layout hooks' restructuring pass.
    pub fn figure_pool(&self) -> &[IRNode] {
        self.children
            .iter()
            .find_map(|n| match n {
                IRNode::FigurePool { figures } => Some(figures.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para(id: &str, children: Vec<InlineNode>) -> IRNode {
        IRNode::Paragraph {
            meta: NodeMetadata::with_id(id),
            children,
        }
    }

    #[test]
    fn test_text_len_counts_nested_inline() {
        let p = para(
            "p1",
            vec![
                InlineNode::text("See "),
                InlineNode::link("#fig1", "Figure 1"),
                InlineNode::LineBreak,
                InlineNode::Emphasis {
                    children: vec![InlineNode::text("!")],
                },
            ],
        );
        assert_eq!(p.text_len(), 4 + 8 + 1);
    }

    #[test]
    fn test_link_targets_in_order() {
        let p = para(
            "p1",
            vec![
                InlineNode::link("#fig2", "Figure 2"),
                InlineNode::Emphasis {
                    children: vec![InlineNode::link("#fig1", "Figure 1")],
                },
            ],
        );
        assert_eq!(p.link_targets(), vec!["#fig2", "#fig1"]);
    }

    #[test]
    fn test_find_nested() {
        let tree = ContentTree::new(
            "doc",
            vec![IRNode::Section {
                meta: NodeMetadata::with_id("s1"),
                children: vec![para("p1", vec![])],
            }],
        );
        assert_eq!(tree.find("p1").map(IRNode::kind), Some("paragraph"));
        assert!(tree.find("missing").is_none());
    }

    #[test]
    fn test_deserialize_tagged_tree() {
        let json = r##"{
            "documentId": "article-1",
            "children": [
                {"type": "paragraph", "meta": {"id": "p1"},
                 "children": [{"type": "hyperlink", "href": "#f1",
                               "children": [{"type": "text", "text": "Fig. 1"}]}]},
                {"type": "figure", "meta": {"id": "f1"},
                 "image": {"src": "f1.png", "naturalWidth": 800, "naturalHeight": 600}}
            ]
        }"##;
        let tree: ContentTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.document_id, "article-1");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].link_targets(), vec!["#f1"]);
    }
}
