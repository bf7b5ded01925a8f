//! A one-pass reference paginator that drives the layout hooks.
//!
//! It flows the text blocks of a content tree onto fixed-size pages, splits
//! blocks that straddle a page boundary, and lays out whatever figures the
//! hooks insert. Figures only enter the flow through insertion; any figure
//! left inside the text flow is ignored.

use crate::error::PagefigError;
use pagefig_idf::{Attributes, ContentTree, IRNode, NodeMetadata};
use pagefig_layout::geometry::line_count;
use pagefig_layout::{
    CompletedPage, ElementRole, FigurePlacement, HostError, HostLayout, PageEntry, PageMetrics,
    PaginationHooks, PrecedingElement, RenderReport, RenderedKind, RenderedNode, TextMetrics,
};
use pagefig_types::Rect;
use std::collections::HashSet;

/// Page size and margins, in px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub margin_x: f32,
}

impl Default for PageGeometry {
    /// A4 at 96 dpi with 72px margins.
    fn default() -> Self {
        Self::new(794.0, 1123.0)
    }
}

impl PageGeometry {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
            margin_top: 72.0,
            margin_bottom: 72.0,
            margin_x: 72.0,
        }
    }

    /// The content area of every page.
    pub fn content_area(&self) -> Rect {
        Rect {
            x: self.margin_x,
            y: self.margin_top,
            width: (self.page_width - 2.0 * self.margin_x).max(1.0),
            height: (self.page_height - self.margin_top - self.margin_bottom).max(1.0),
        }
    }

    pub fn metrics(&self) -> PageMetrics {
        let area = self.content_area();
        PageMetrics {
            content_top: area.y,
            content_height: area.height,
            content_width: area.width,
        }
    }
}

pub struct BreakAnalysis {
    pub should_break: bool,
    pub remaining_height: f32,
}

/// Checks whether `height` px fit below `cursor_y` inside `bounds`.
pub fn check_fit(cursor_y: f32, height: f32, bounds: Rect) -> BreakAnalysis {
    let available = (bounds.bottom() - cursor_y).max(0.0);
    const EPSILON: f32 = 0.01;
    BreakAnalysis {
        should_break: height > available + EPSILON,
        remaining_height: available,
    }
}

/// Everything a render produced.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// The restructured tree, carrying the attributes the hooks wrote.
    pub tree: ContentTree,
    pub pages: Vec<CompletedPage>,
    /// Every committed fragment in commit order, with its attributes.
    pub fragments: Vec<RenderedNode>,
    pub report: RenderReport,
}

impl RenderedDocument {
    /// Ids of the entries on `page`, in render order.
    pub fn page_order(&self, page: usize) -> Vec<&str> {
        self.pages
            .get(page)
            .map(|p| p.entries.iter().map(|e| e.node_id.as_str()).collect())
            .unwrap_or_default()
    }

    /// The page a figure was rendered on.
    pub fn figure_page(&self, figure: &str) -> Option<usize> {
        self.pages
            .iter()
            .find(|p| p.figure_ids().any(|id| id == figure))
            .map(|p| p.index)
    }

    pub fn fragments_of(&self, node_id: &str) -> impl Iterator<Item = &RenderedNode> {
        self.fragments.iter().filter(move |f| f.node_id == node_id)
    }
}

/// What the hooks see of the host during a commit.
struct HostState {
    metrics: PageMetrics,
    pool: HashSet<String>,
    current: CompletedPage,
    fragments: Vec<RenderedNode>,
    pending: Vec<FigurePlacement>,
}

impl HostState {
    fn role_of(entry: &PageEntry) -> ElementRole {
        match entry.kind {
            RenderedKind::Figure => ElementRole::Figure(entry.node_id.as_str().into()),
            RenderedKind::Heading => ElementRole::Heading,
            RenderedKind::Text | RenderedKind::Table => ElementRole::Text,
            RenderedKind::Other => ElementRole::Other,
        }
    }
}

impl HostLayout for HostState {
    fn page_metrics(&self, _page: usize) -> PageMetrics {
        self.metrics
    }

    fn figures_on_page(&self, page: usize) -> usize {
        if page == self.current.index {
            self.current.figure_ids().count() + self.pending.len()
        } else {
            self.fragments
                .iter()
                .filter(|f| f.page == page && f.kind == RenderedKind::Figure)
                .count()
        }
    }

    fn preceding_element(&self, node: &RenderedNode) -> Option<PrecedingElement> {
        if node.page != self.current.index {
            return None;
        }
        self.current.entries.last().map(|e| PrecedingElement {
            node_id: e.node_id.clone(),
            role: Self::role_of(e),
        })
    }

    fn predecessor_attributes(&self, node_id: &str, page: usize) -> Option<Attributes> {
        self.fragments
            .iter()
            .rev()
            .find(|f| f.node_id == node_id && f.page < page)
            .map(|f| f.attributes.clone())
    }

    fn insert_figure_after(
        &mut self,
        anchor: &RenderedNode,
        placement: &FigurePlacement,
    ) -> Result<(), HostError> {
        if !self.pool.contains(placement.figure_id.as_str()) {
            return Err(HostError::UnknownFigure(placement.figure_id.to_string()));
        }
        if anchor.page != self.current.index {
            return Err(HostError::Rejected(format!(
                "anchor '{}' is on page {}, not the open page {}",
                anchor.node_id, anchor.page, self.current.index
            )));
        }
        self.pending.push(placement.clone());
        Ok(())
    }
}

/// A text-bearing block waiting to be flowed.
struct FlowBlock {
    id: String,
    kind: RenderedKind,
    chars: usize,
}

fn assign_ids(nodes: &mut [IRNode], next: &mut usize) {
    for node in nodes {
        let kind = node.kind();
        if let Some(meta) = node.meta_mut() {
            if meta.id.is_none() {
                meta.id = Some(format!("{kind}-{next}"));
                *next += 1;
            }
        }
        if let Some(children) = node.children_mut() {
            assign_ids(children, next);
        }
    }
}

fn collect_flow(nodes: &[IRNode], out: &mut Vec<FlowBlock>) {
    for node in nodes {
        let kind = match node {
            IRNode::Paragraph { .. } => RenderedKind::Text,
            IRNode::Heading { .. } => RenderedKind::Heading,
            IRNode::Table { .. } => RenderedKind::Table,
            IRNode::Block { children, .. } | IRNode::Section { children, .. } => {
                collect_flow(children, out);
                continue;
            }
            IRNode::Figure { .. } | IRNode::FigurePool { .. } => continue,
        };
        if let Some(id) = node.id() {
            out.push(FlowBlock {
                id: id.to_string(),
                kind,
                chars: node.text_len(),
            });
        }
    }
}

fn collect_figure_ids(nodes: &[IRNode], out: &mut HashSet<String>) {
    for node in nodes {
        if let (IRNode::Figure { .. }, Some(id)) = (node, node.id()) {
            out.insert(id.to_string());
        }
        collect_figure_ids(node.children(), out);
    }
}

pub struct Paginator {
    geometry: PageGeometry,
    text: TextMetrics,
}

impl Paginator {
    pub fn new(geometry: PageGeometry, text: TextMetrics) -> Self {
        Self { geometry, text }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Runs one full render of `tree` through `hooks`.
    pub fn render(
        &self,
        tree: ContentTree,
        hooks: &mut dyn PaginationHooks,
    ) -> Result<RenderedDocument, PagefigError> {
        let mut tree = hooks.before_parse(tree)?;
        assign_ids(&mut tree.children, &mut 0);
        hooks.after_parse(&tree)?;

        let mut flow = Vec::new();
        collect_flow(&tree.children, &mut flow);
        let mut pool = HashSet::new();
        collect_figure_ids(&tree.children, &mut pool);
        log::debug!(
            "Flowing {} blocks with {} figures in the pool",
            flow.len(),
            pool.len()
        );

        let area = self.geometry.content_area();
        let mut run = Run {
            tree: &mut tree,
            bounds: area,
            text: self.text,
            cursor: area.y,
            pages: Vec::new(),
            host: HostState {
                metrics: self.geometry.metrics(),
                pool,
                current: CompletedPage::default(),
                fragments: Vec::new(),
                pending: Vec::new(),
            },
        };

        for block in &flow {
            run.flow_block(hooks, block)?;
        }
        run.finish_page(hooks)?;

        let Run { pages, host, .. } = run;
        let report = hooks.all_rendered(&pages)?;
        Ok(RenderedDocument {
            tree,
            pages,
            fragments: host.fragments,
            report,
        })
    }
}

/// State of one render in progress.
struct Run<'t> {
    tree: &'t mut ContentTree,
    bounds: Rect,
    text: TextMetrics,
    /// Top of the free space on the open page, in page coordinates.
    cursor: f32,
    pages: Vec<CompletedPage>,
    host: HostState,
}

impl Run<'_> {
    fn chars_per_line(&self) -> usize {
        (self.bounds.width / self.text.avg_char_px()).floor().max(1.0) as usize
    }

    fn text_height(&self, chars: usize) -> f32 {
        line_count(chars.max(1), self.bounds.width, &self.text) as f32 * self.text.line_height
    }

    fn page_is_empty(&self) -> bool {
        self.host.current.entries.is_empty()
    }

    fn finish_page(&mut self, hooks: &mut dyn PaginationHooks) -> Result<(), PagefigError> {
        let next_index = self.host.current.index + 1;
        let mut page = std::mem::replace(
            &mut self.host.current,
            CompletedPage {
                index: next_index,
                entries: Vec::new(),
            },
        );
        hooks.page_complete(&mut page)?;
        log::trace!("Page {} complete with {} entries", page.index, page.entries.len());
        self.pages.push(page);
        self.cursor = self.bounds.y;
        Ok(())
    }

    fn flow_block(
        &mut self,
        hooks: &mut dyn PaginationHooks,
        block: &FlowBlock,
    ) -> Result<(), PagefigError> {
        let mut chars_left = block.chars;
        let mut continuation = false;

        loop {
            let height = self.text_height(chars_left);
            let fit = check_fit(self.cursor, height, self.bounds);
            if !fit.should_break {
                let mut node = self.fragment(block, chars_left, continuation, height);
                if continuation {
                    // Hosts cannot report the bottom of a split fragment.
                    node.bottom = None;
                }
                self.commit(hooks, node)?;
                self.cursor += height;
                return self.flush_figures(hooks);
            }

            let lines = (fit.remaining_height / self.text.line_height).floor() as usize;
            if lines == 0 || chars_left <= self.chars_per_line() {
                if self.page_is_empty() {
                    // Taller than a whole page: place it anyway.
                    let node = self.fragment(block, chars_left, continuation, height);
                    self.commit(hooks, node)?;
                    self.cursor += height;
                    return self.flush_figures(hooks);
                }
                self.finish_page(hooks)?;
                continue;
            }

            let first_chars = (lines * self.chars_per_line()).min(chars_left);
            let first_height = lines as f32 * self.text.line_height;
            let node = self.fragment(block, first_chars, continuation, first_height);
            self.commit(hooks, node)?;
            self.cursor += first_height;
            self.flush_figures(hooks)?;
            self.finish_page(hooks)?;

            chars_left -= first_chars;
            continuation = true;
            log::trace!("Block '{}' split with {chars_left} chars carried over", block.id);
        }
    }

    fn fragment(
        &self,
        block: &FlowBlock,
        chars: usize,
        continuation: bool,
        height: f32,
    ) -> RenderedNode {
        let mut node = RenderedNode::new(
            block.id.as_str(),
            block.kind,
            self.host.current.index,
            self.cursor,
        );
        node.bottom = Some(self.cursor + height);
        node.is_continuation = continuation;
        node.text_chars = chars;
        node
    }

    /// Hands a fragment to the hooks, then records it on the open page.
    fn commit(
        &mut self,
        hooks: &mut dyn PaginationHooks,
        mut node: RenderedNode,
    ) -> Result<(), PagefigError> {
        let mut scratch = NodeMetadata::default();
        let source = match self.tree.find_mut(&node.node_id).and_then(IRNode::meta_mut) {
            Some(meta) => meta,
            None => &mut scratch,
        };
        hooks.node_commit(source, &mut node, &mut self.host)?;

        self.host.current.entries.push(PageEntry {
            node_id: node.node_id.clone(),
            kind: node.kind,
        });
        self.host.fragments.push(node);
        Ok(())
    }

    /// Lays out the figures inserted during the last commit, in order.
    fn flush_figures(&mut self, hooks: &mut dyn PaginationHooks) -> Result<(), PagefigError> {
        for placement in std::mem::take(&mut self.host.pending) {
            let height = placement.predicted_height;
            if check_fit(self.cursor, height, self.bounds).should_break && !self.page_is_empty() {
                log::warn!(
                    "Figure '{}' ({height:.1}px) overflows page {}; moving it on",
                    placement.figure_id,
                    self.host.current.index
                );
                self.finish_page(hooks)?;
            }

            let mut node = RenderedNode::new(
                placement.figure_id.as_str(),
                RenderedKind::Figure,
                self.host.current.index,
                self.cursor,
            );
            node.bottom = Some(self.cursor + height);
            self.commit(hooks, node)?;
            self.cursor += (height + placement.margin_bottom).max(0.0);
        }
        Ok(())
    }
}
