//! The surface of the pagination host, as seen by the hooks.
//!
//! The host owns pages and rendered fragments; the engine only observes them
//! through `RenderedNode` values and asks for changes through `HostLayout`.

use crate::index::PositionClass;
use pagefig_idf::{Attributes, TextStr};
use pagefig_types::{FigureId, TypesettingClass};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Host has no figure '{0}' to insert")]
    UnknownFigure(String),
    #[error("Host has no rendered node '{0}'")]
    UnknownNode(String),
    #[error("Host rejected the insertion: {0}")]
    Rejected(String),
}

/// What kind of content a rendered fragment shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderedKind {
    Text,
    Heading,
    Table,
    Figure,
    Other,
}

impl RenderedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderedKind::Text => "text",
            RenderedKind::Heading => "heading",
            RenderedKind::Table => "table",
            RenderedKind::Figure => "figure",
            RenderedKind::Other => "other",
        }
    }
}

/// One fragment of a node, as committed to a page.
///
/// Coordinates are in px from the top edge of the page. A node split across
/// pages produces one fragment per page, all sharing `node_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNode {
    pub node_id: TextStr,
    pub kind: RenderedKind,
    pub page: usize,
    pub top: f32,
    /// Observed bottom edge. Hosts cannot always report it for split
    /// fragments.
    pub bottom: Option<f32>,
    /// This fragment continues a node begun on an earlier page.
    pub is_continuation: bool,
    /// Characters of text in this fragment.
    pub text_chars: usize,
    pub attributes: Attributes,
}

impl RenderedNode {
    pub fn new(node_id: impl Into<TextStr>, kind: RenderedKind, page: usize, top: f32) -> Self {
        Self {
            node_id: node_id.into(),
            kind,
            page,
            top,
            bottom: None,
            is_continuation: false,
            text_chars: 0,
            attributes: Attributes::new(),
        }
    }
}

/// The content area of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub content_top: f32,
    pub content_height: f32,
    pub content_width: f32,
}

/// Role of the element rendered just before the current node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementRole {
    Figure(FigureId),
    Heading,
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedingElement {
    pub node_id: TextStr,
    pub role: ElementRole,
}

/// Everything the host needs to insert a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct FigurePlacement {
    pub figure_id: FigureId,
    pub class: TypesettingClass,
    pub position_class: Option<PositionClass>,
    pub style: Option<String>,
    /// Negative for floated figures; see `geometry::float_compensation`.
    pub margin_bottom: f32,
    pub predicted_height: f32,
}

/// Layout services the host exposes to the node-commit hook.
pub trait HostLayout {
    fn page_metrics(&self, page: usize) -> PageMetrics;

    /// Figures already on `page`, including ones inserted this turn.
    fn figures_on_page(&self, page: usize) -> usize;

    /// The element rendered immediately before `node` on its page.
    fn preceding_element(&self, node: &RenderedNode) -> Option<PrecedingElement>;

    /// Attributes of the latest fragment of `node_id` on a page before `page`.
    fn predecessor_attributes(&self, node_id: &str, page: usize) -> Option<Attributes>;

    /// Inserts a figure directly after `anchor`. The engine only records the
    /// figure as inserted once this returns `Ok`.
    fn insert_figure_after(
        &mut self,
        anchor: &RenderedNode,
        placement: &FigurePlacement,
    ) -> Result<(), HostError>;
}

/// An entry of a finished page, in render order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageEntry {
    pub node_id: TextStr,
    pub kind: RenderedKind,
}

impl PageEntry {
    pub fn figure_id(&self) -> Option<&str> {
        (self.kind == RenderedKind::Figure).then_some(self.node_id.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletedPage {
    pub index: usize,
    pub entries: Vec<PageEntry>,
}

impl CompletedPage {
    pub fn figure_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(PageEntry::figure_id)
    }
}
