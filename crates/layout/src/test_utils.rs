use crate::config::{EngineConfig, FigureMargin};
use crate::context::{NodeCategory, PageContext};
use crate::host::{
    FigurePlacement, HostError, HostLayout, PageMetrics, PrecedingElement, RenderedNode,
};
use crate::model::{ModelPreset, ModelSpec, WrapMode};
use pagefig_idf::{Attributes, ContentTree, FigureImage, IRNode, InlineNode, NodeMetadata};
use pagefig_traits::{StateStore, StoreError};
use pagefig_types::{Dimension, FigureId, TypesettingClass};
use std::collections::{BTreeMap, HashMap};

/// Figures default to "medium" and carry 10px above, 15px below.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        figure_margin: FigureMargin {
            top: 10.0,
            bottom: 15.0,
        },
        default_class: TypesettingClass::new("medium"),
        ..EngineConfig::viewer()
    }
}

/// A small catalogue with fixed pixel widths, so heights are easy to reason
/// about: a square "medium" figure without caption is 175px tall.
pub fn test_model() -> ModelSpec {
    let presets: BTreeMap<_, _> = [
        ("inline", ModelPreset::new(Dimension::Percent(100.0), WrapMode::Block)),
        ("medium", ModelPreset::new(Dimension::Px(150.0), WrapMode::Block)),
        ("float", ModelPreset::new(Dimension::Px(150.0), WrapMode::Float)),
        ("overmargin", ModelPreset::new(Dimension::Px(300.0), WrapMode::Overmargin)),
        ("page-top", ModelPreset::new(Dimension::Px(150.0), WrapMode::PageTop)),
    ]
    .into_iter()
    .map(|(name, preset)| (TypesettingClass::new(name), preset))
    .collect();
    ModelSpec::new(presets)
}

pub fn ids(list: &[&str]) -> Vec<FigureId> {
    list.iter().map(|s| FigureId::new(*s)).collect()
}

pub fn section(id: &str, children: Vec<IRNode>) -> IRNode {
    IRNode::Section {
        meta: NodeMetadata::with_id(id),
        children,
    }
}

pub fn heading(id: &str, text: &str) -> IRNode {
    IRNode::Heading {
        meta: NodeMetadata::with_id(id),
        level: 2,
        children: vec![InlineNode::text(text)],
    }
}

pub fn paragraph_with_refs(id: &str, refs: &[&str]) -> IRNode {
    let mut children = vec![InlineNode::text("Body text ")];
    for r in refs {
        children.push(InlineNode::link(format!("#{r}"), "Fig."));
    }
    IRNode::Paragraph {
        meta: NodeMetadata::with_id(id),
        children,
    }
}

pub fn figure(id: &str, width: f32, height: f32, caption: &str) -> IRNode {
    IRNode::Figure {
        meta: NodeMetadata::with_id(id),
        image: FigureImage {
            src: format!("{id}.png"),
            natural_width: width,
            natural_height: height,
        },
        caption: if caption.is_empty() {
            Vec::new()
        } else {
            vec![InlineNode::text(caption)]
        },
        class: None,
    }
}

/// `p0` references square figures `f1` and `f2`; `p1` references nothing.
pub fn two_figure_tree() -> ContentTree {
    ContentTree::new(
        "doc-1",
        vec![
            paragraph_with_refs("p0", &["f1", "f2"]),
            paragraph_with_refs("p1", &[]),
            figure("f1", 800.0, 800.0, ""),
            figure("f2", 800.0, 800.0, ""),
        ],
    )
}

pub fn three_figure_tree() -> ContentTree {
    ContentTree::new(
        "doc-1",
        vec![
            paragraph_with_refs("p0", &["f1", "f2", "f3"]),
            paragraph_with_refs("p1", &[]),
            figure("f1", 800.0, 800.0, ""),
            figure("f2", 800.0, 800.0, ""),
            figure("f3", 800.0, 800.0, ""),
        ],
    )
}

/// A regular node on page 0 of a 1000x600 content area with `remaining` px
/// left below it.
pub fn context_with_remaining(remaining: f32) -> PageContext {
    PageContext {
        page: 0,
        category: NodeCategory::Regular,
        is_heading: false,
        content_height: 1000.0,
        content_width: 600.0,
        offset_top: 0.0,
        offset_bottom: 1000.0 - remaining,
        height: 1000.0 - remaining,
        remaining_space: remaining,
        figures_on_page: 0,
        page_at_quota: false,
        preceding: None,
        block_ordinal: Some(0),
        predecessor: None,
    }
}

/// A store whose every operation fails.
#[derive(Debug)]
pub struct FailingStore;

impl StateStore for FailingStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::ReadFailed {
            key: key.to_string(),
            message: "disk unavailable".to_string(),
        })
    }

    fn write(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed {
            key: key.to_string(),
            message: "disk unavailable".to_string(),
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.write(key, "")
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// A host with a single page geometry whose content area starts at y = 50.
#[derive(Debug)]
pub struct MockHost {
    pub metrics: PageMetrics,
    pub figure_counts: HashMap<usize, usize>,
    pub preceding: Option<PrecedingElement>,
    pub predecessors: HashMap<(String, usize), Attributes>,
    /// Anchor node id and placement, in insertion order.
    pub inserted: Vec<(String, FigurePlacement)>,
    pub reject_inserts: bool,
}

impl MockHost {
    pub fn new(content_height: f32, content_width: f32) -> Self {
        Self {
            metrics: PageMetrics {
                content_top: 50.0,
                content_height,
                content_width,
            },
            figure_counts: HashMap::new(),
            preceding: None,
            predecessors: HashMap::new(),
            inserted: Vec::new(),
            reject_inserts: false,
        }
    }

    pub fn inserted_ids(&self) -> Vec<&str> {
        self.inserted
            .iter()
            .map(|(_, p)| p.figure_id.as_str())
            .collect()
    }

    /// A text fragment on `page` whose bottom edge leaves `remaining` px of
    /// content area below it.
    pub fn node_leaving(&self, id: &str, page: usize, remaining: f32) -> RenderedNode {
        let mut node = RenderedNode::new(id, crate::host::RenderedKind::Text, page, 50.0);
        node.bottom = Some(self.metrics.content_top + self.metrics.content_height - remaining);
        node
    }
}

impl HostLayout for MockHost {
    fn page_metrics(&self, _page: usize) -> PageMetrics {
        self.metrics
    }

    fn figures_on_page(&self, page: usize) -> usize {
        self.figure_counts.get(&page).copied().unwrap_or(0)
    }

    fn preceding_element(&self, _node: &RenderedNode) -> Option<PrecedingElement> {
        self.preceding.clone()
    }

    fn predecessor_attributes(&self, node_id: &str, page: usize) -> Option<Attributes> {
        self.predecessors.get(&(node_id.to_string(), page)).cloned()
    }

    fn insert_figure_after(
        &mut self,
        anchor: &RenderedNode,
        placement: &FigurePlacement,
    ) -> Result<(), HostError> {
        if self.reject_inserts {
            return Err(HostError::Rejected("test host rejects inserts".to_string()));
        }
        *self.figure_counts.entry(anchor.page).or_insert(0) += 1;
        self.inserted
            .push((anchor.node_id.clone(), placement.clone()));
        Ok(())
    }
}
