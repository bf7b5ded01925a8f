//! The five callbacks a pagination host drives, in this order:
//! `before_parse`, `after_parse`, then `node_commit` for every committed
//! fragment interleaved with `page_complete` for every finished page, and
//! finally `all_rendered`.

use crate::LayoutError;
use crate::host::{CompletedPage, HostLayout, RenderedNode};
use pagefig_idf::{ContentTree, NodeMetadata};
use pagefig_types::{FigureId, TypesettingClass};
use serde::Serialize;

pub trait PaginationHooks {
    /// Restructures the tree before the host assigns node identities.
    fn before_parse(&mut self, tree: ContentTree) -> Result<ContentTree, LayoutError>;

    /// Rebuilds the layout index. Runs once per render, after ids are stable.
    fn after_parse(&mut self, tree: &ContentTree) -> Result<(), LayoutError>;

    /// Called for every fragment as it is committed to its page. May insert
    /// figures after `rendered` through `host`, and writes geometry
    /// attributes onto both `source` and `rendered`.
    fn node_commit(
        &mut self,
        source: &mut NodeMetadata,
        rendered: &mut RenderedNode,
        host: &mut dyn HostLayout,
    ) -> Result<(), LayoutError>;

    fn page_complete(&mut self, page: &mut CompletedPage) -> Result<(), LayoutError>;

    /// Flushes the render and clears render-local flags.
    fn all_rendered(&mut self, pages: &[CompletedPage]) -> Result<RenderReport, LayoutError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedFigure {
    pub figure_id: FigureId,
    pub page: usize,
    pub class: TypesettingClass,
}

/// Summary of one render, taken before render-local flags are cleared.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderReport {
    pub document_id: String,
    pub pages: usize,
    /// Inserted figures in canonical order.
    pub placed: Vec<PlacedFigure>,
    /// Figures still waiting in a reference queue when the render ended.
    pub queued: Vec<FigureId>,
    /// Figures no block ever referenced.
    pub unreferenced: Vec<FigureId>,
}

impl RenderReport {
    pub fn page_of(&self, figure: &str) -> Option<usize> {
        self.placed
            .iter()
            .find(|p| p.figure_id.as_str() == figure)
            .map(|p| p.page)
    }

    pub fn is_placed(&self, figure: &str) -> bool {
        self.page_of(figure).is_some()
    }
}
