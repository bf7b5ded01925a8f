//! Page context resolution: where on its page a committed node sits and how
//! much room is left under it.

use crate::config::EngineConfig;
use crate::geometry::{estimate_figure, estimate_text_height};
use crate::host::{HostLayout, PrecedingElement, RenderedKind, RenderedNode};
use crate::model::ModelSpec;
use crate::state::DocumentLayoutState;
use pagefig_idf::Attributes;
use pagefig_types::Size;

/// Names of the attributes written onto committed nodes.
pub mod attr {
    pub const PAGE: &str = "data-page";
    pub const CATEGORY: &str = "data-category";
    pub const OFFSET_TOP: &str = "data-offset-top";
    pub const OFFSET_BOTTOM: &str = "data-offset-bottom";
    pub const HEIGHT: &str = "data-height";
    pub const REMAINING_SPACE: &str = "data-remaining-space";
    pub const SPLIT: &str = "data-split";
    pub const BLOCK_ORDINAL: &str = "data-block-ordinal";
    pub const FIGURES_ON_PAGE: &str = "data-figures-on-page";
    pub const FIGURES_DECIDED: &str = "data-figures-decided";
    pub const PRECEDING: &str = "data-preceding";
}

/// The geometry rule a node is measured by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Figure,
    Heading,
    SplitContinuation,
    Regular,
}

impl NodeCategory {
    pub fn of(node: &RenderedNode) -> Self {
        match node.kind {
            RenderedKind::Figure => NodeCategory::Figure,
            _ if node.is_continuation => NodeCategory::SplitContinuation,
            RenderedKind::Heading => NodeCategory::Heading,
            _ => NodeCategory::Regular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Figure => "figure",
            NodeCategory::Heading => "heading",
            NodeCategory::SplitContinuation => "split-continuation",
            NodeCategory::Regular => "regular",
        }
    }
}

/// What an earlier fragment of the same node left behind in its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentTrace {
    pub page: usize,
    pub block_ordinal: Option<usize>,
    pub figures_decided: bool,
}

impl FragmentTrace {
    pub fn from_attributes(attrs: &Attributes) -> Option<Self> {
        let page = attrs.get(attr::PAGE)?.parse().ok()?;
        Some(Self {
            page,
            block_ordinal: attrs.get(attr::BLOCK_ORDINAL).and_then(|v| v.parse().ok()),
            figures_decided: attrs.get(attr::FIGURES_DECIDED).is_some_and(|v| v == "true"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageContext {
    pub page: usize,
    pub category: NodeCategory,
    /// Set for every fragment of a heading, continuations included.
    pub is_heading: bool,
    pub content_height: f32,
    pub content_width: f32,
    /// Node top, measured from the top of the content area.
    pub offset_top: f32,
    /// Node bottom, measured from the top of the content area.
    pub offset_bottom: f32,
    pub height: f32,
    /// Content height below the node, never negative.
    pub remaining_space: f32,
    pub figures_on_page: usize,
    pub page_at_quota: bool,
    pub preceding: Option<PrecedingElement>,
    pub block_ordinal: Option<usize>,
    /// Set for split continuations whose first fragment left a trace.
    pub predecessor: Option<FragmentTrace>,
}

impl PageContext {
    pub fn content_size(&self) -> Size {
        Size::new(self.content_width, self.content_height)
    }

    /// Figure slots left on the page before the quota is hit.
    pub fn free_figure_slots(&self, max_per_page: usize) -> usize {
        max_per_page.saturating_sub(self.figures_on_page)
    }

    pub fn write_attributes(&self, attrs: &mut Attributes) {
        attrs.insert(attr::PAGE.into(), self.page.to_string());
        attrs.insert(attr::CATEGORY.into(), self.category.as_str().into());
        attrs.insert(attr::OFFSET_TOP.into(), format!("{:.2}", self.offset_top));
        attrs.insert(attr::OFFSET_BOTTOM.into(), format!("{:.2}", self.offset_bottom));
        attrs.insert(attr::HEIGHT.into(), format!("{:.2}", self.height));
        attrs.insert(attr::REMAINING_SPACE.into(), format!("{:.2}", self.remaining_space));
        attrs.insert(
            attr::SPLIT.into(),
            (self.category == NodeCategory::SplitContinuation).to_string(),
        );
        attrs.insert(attr::FIGURES_ON_PAGE.into(), self.figures_on_page.to_string());
        if let Some(ordinal) = self.block_ordinal {
            attrs.insert(attr::BLOCK_ORDINAL.into(), ordinal.to_string());
        }
        if let Some(preceding) = &self.preceding {
            attrs.insert(attr::PRECEDING.into(), preceding.node_id.clone());
        }
    }
}

/// Computes the page context of a node about to be committed.
pub fn resolve_context(
    node: &RenderedNode,
    state: &DocumentLayoutState,
    host: &dyn HostLayout,
    config: &EngineConfig,
    model: &ModelSpec,
) -> PageContext {
    let metrics = host.page_metrics(node.page);
    let category = NodeCategory::of(node);
    let offset_top = (node.top - metrics.content_top).max(0.0);
    let body = &config.body_text;

    let observed_height = || match node.bottom {
        Some(bottom) => (bottom - node.top).max(0.0),
        None => {
            log::debug!("No bottom edge reported for '{}'; estimating", node.node_id);
            estimate_text_height(node.text_chars, metrics.content_width, body)
        }
    };

    let mut predecessor = None;
    let height = match category {
        NodeCategory::Regular | NodeCategory::Heading => observed_height(),
        NodeCategory::Figure => match state.figures.get(&node.node_id) {
            Some(figure) => {
                let class = figure.placed_class.as_ref().unwrap_or(figure.lookup_class());
                let content = Size::new(metrics.content_width, metrics.content_height);
                estimate_figure(&figure.geometry, model.preset(class), config, content).total_height
            }
            None => observed_height(),
        },
        NodeCategory::SplitContinuation => {
            predecessor = host
                .predecessor_attributes(&node.node_id, node.page)
                .as_ref()
                .and_then(FragmentTrace::from_attributes);
            estimate_text_height(node.text_chars, metrics.content_width, body)
        }
    };

    let offset_bottom = offset_top + height;
    let remaining_space = (metrics.content_height - offset_bottom).max(0.0);
    let figures_on_page = host.figures_on_page(node.page);

    let block_ordinal = predecessor
        .and_then(|p| p.block_ordinal)
        .or_else(|| state.text.get(&node.node_id).map(|b| b.position));

    PageContext {
        page: node.page,
        category,
        is_heading: node.kind == RenderedKind::Heading,
        content_height: metrics.content_height,
        content_width: metrics.content_width,
        offset_top,
        offset_bottom,
        height,
        remaining_space,
        figures_on_page,
        page_at_quota: figures_on_page >= config.max_figures_per_page,
        preceding: host.preceding_element(node),
        block_ordinal,
        predecessor,
    }
}
