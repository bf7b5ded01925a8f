//! The reference index: one ordered map over text blocks, one over figures.
//!
//! Both are rebuilt from the content tree at the start of every render.
//! Persisted overrides are carried forward from the previous render only when
//! it was a render of the same document.

use crate::config::EngineConfig;
use crate::geometry::FigureGeometry;
use crate::state::DocumentLayoutState;
use crate::util::false_as_none;
use pagefig_idf::{ContentTree, IRNode};
use pagefig_types::{BlockId, DocumentId, FigureId, TypesettingClass};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Vertical pinning of a figure on its page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionClass {
    Top,
    Bottom,
}

impl PositionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionClass::Top => "top",
            PositionClass::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlockRecord {
    pub id: BlockId,
    /// Ordinal in document order; dense over the map.
    pub position: usize,
    /// Figures this block is responsible for, in the order they were queued.
    #[serde(default)]
    pub figure_refs: Vec<FigureId>,
    /// The block's placement turn has ended in this render.
    #[serde(default)]
    pub placed: bool,
    #[serde(default)]
    pub is_first_of_section: bool,
    #[serde(default)]
    pub is_heading: bool,
    /// Index of the section aggregate the block belongs to.
    #[serde(default)]
    pub section: usize,
    /// Figures referenced in the section up to and including this block.
    #[serde(default)]
    pub section_figures_referenced: usize,
    /// Blocks seen in the section up to and including this block.
    #[serde(default)]
    pub section_blocks_seen: usize,
    #[serde(default)]
    pub text_chars: usize,
    #[serde(with = "false_as_none", default)]
    pub style: Option<String>,
    #[serde(with = "false_as_none", default)]
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureRecord {
    pub id: FigureId,
    /// Canonical position among figures, in document order.
    pub position: usize,
    pub geometry: FigureGeometry,
    #[serde(default)]
    pub inserted: bool,
    #[serde(default)]
    pub is_most_recently_inserted: bool,
    /// Page the figure was inserted on in this render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    /// Class the figure was inserted with in this render.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placed_class: Option<TypesettingClass>,
    /// User override of the placement variant.
    #[serde(with = "false_as_none", default)]
    pub typesetting_class: Option<TypesettingClass>,
    #[serde(with = "false_as_none", default)]
    pub position_class: Option<PositionClass>,
    #[serde(with = "false_as_none", default)]
    pub style: Option<String>,
}

impl FigureRecord {
    /// The class used as this figure's constellation key segment.
    pub fn lookup_class(&self) -> &TypesettingClass {
        self.typesetting_class
            .as_ref()
            .unwrap_or(&self.geometry.assigned_class)
    }

    pub fn clear_render_local(&mut self) {
        self.inserted = false;
        self.is_most_recently_inserted = false;
        self.page = None;
        self.placed_class = None;
    }

    fn copy_overrides_from(&mut self, previous: &FigureRecord) {
        self.typesetting_class = previous.typesetting_class.clone();
        self.position_class = previous.position_class;
        self.style = previous.style.clone();
    }
}

/// Where a queued figure reference currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefHolder {
    Block(usize),
    /// The virtual block after the last one.
    Trailing,
}

#[derive(Serialize, Deserialize)]
struct StoredTextMap {
    #[serde(rename = "documentId")]
    document_id: DocumentId,
    #[serde(rename = "trailingRefs", default)]
    trailing_refs: Vec<FigureId>,
    #[serde(flatten)]
    blocks: BTreeMap<String, TextBlockRecord>,
}

/// Text blocks in document order, addressable by id and by ordinal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredTextMap", into = "StoredTextMap")]
pub struct TextContentMap {
    document_id: DocumentId,
    blocks: Vec<TextBlockRecord>,
    by_id: HashMap<BlockId, usize>,
    trailing_refs: Vec<FigureId>,
}

impl TryFrom<StoredTextMap> for TextContentMap {
    type Error = String;

    fn try_from(stored: StoredTextMap) -> Result<Self, Self::Error> {
        for (key, record) in &stored.blocks {
            if key != record.id.as_str() {
                return Err(format!("block stored under '{key}' has id '{}'", record.id));
            }
        }
        Self::from_records(
            stored.document_id,
            stored.blocks.into_values().collect(),
            stored.trailing_refs,
        )
    }
}

impl From<TextContentMap> for StoredTextMap {
    fn from(map: TextContentMap) -> Self {
        StoredTextMap {
            document_id: map.document_id,
            trailing_refs: map.trailing_refs,
            blocks: map
                .blocks
                .into_iter()
                .map(|b| (b.id.as_str().to_string(), b))
                .collect(),
        }
    }
}

impl TextContentMap {
    /// Builds the map, checking that ordinals form `0..n` and ids are unique.
    pub fn from_records(
        document_id: DocumentId,
        mut blocks: Vec<TextBlockRecord>,
        trailing_refs: Vec<FigureId>,
    ) -> Result<Self, String> {
        blocks.sort_by_key(|b| b.position);
        let mut by_id = HashMap::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            if block.position != i {
                return Err(format!(
                    "block ordinals are not dense: expected {i}, found {}",
                    block.position
                ));
            }
            if by_id.insert(block.id.clone(), i).is_some() {
                return Err(format!("duplicate block id '{}'", block.id));
            }
        }
        Ok(Self {
            document_id,
            blocks,
            by_id,
            trailing_refs,
        })
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&TextBlockRecord> {
        self.by_id.get(id).map(|&i| &self.blocks[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TextBlockRecord> {
        self.by_id.get(id).map(|&i| &mut self.blocks[i])
    }

    pub fn at(&self, position: usize) -> Option<&TextBlockRecord> {
        self.blocks.get(position)
    }

    pub fn at_mut(&mut self, position: usize) -> Option<&mut TextBlockRecord> {
        self.blocks.get_mut(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextBlockRecord> {
        self.blocks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TextBlockRecord> {
        self.blocks.iter_mut()
    }

    pub fn trailing_refs(&self) -> &[FigureId] {
        &self.trailing_refs
    }

    pub fn holder_of(&self, figure: &FigureId) -> Option<RefHolder> {
        self.blocks
            .iter()
            .position(|b| b.figure_refs.contains(figure))
            .map(RefHolder::Block)
            .or_else(|| {
                self.trailing_refs
                    .contains(figure)
                    .then_some(RefHolder::Trailing)
            })
    }

    /// Removes every reference to `figure`, wherever it is queued.
    pub fn detach_ref(&mut self, figure: &FigureId) {
        for block in &mut self.blocks {
            block.figure_refs.retain(|f| f != figure);
        }
        self.trailing_refs.retain(|f| f != figure);
    }

    /// Moves `figure` onto the block following `position`, or onto the
    /// virtual trailing block when `position` is the last one.
    pub fn queue_after(&mut self, position: usize, figure: &FigureId) -> RefHolder {
        self.detach_ref(figure);
        match self.blocks.get_mut(position + 1) {
            Some(next) => {
                next.figure_refs.push(figure.clone());
                RefHolder::Block(position + 1)
            }
            None => {
                self.trailing_refs.push(figure.clone());
                RefHolder::Trailing
            }
        }
    }

    /// Every figure id referenced by some block or by the trailing queue.
    pub fn referenced_figures(&self) -> BTreeSet<FigureId> {
        self.blocks
            .iter()
            .flat_map(|b| b.figure_refs.iter())
            .chain(self.trailing_refs.iter())
            .cloned()
            .collect()
    }

    pub fn clear_render_local(&mut self) {
        for block in &mut self.blocks {
            block.placed = false;
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredFigureMap {
    #[serde(rename = "documentId")]
    document_id: DocumentId,
    #[serde(flatten)]
    figures: BTreeMap<String, FigureRecord>,
}

/// Figures in canonical order, addressable by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredFigureMap", into = "StoredFigureMap")]
pub struct FigureMap {
    document_id: DocumentId,
    figures: Vec<FigureRecord>,
    by_id: HashMap<FigureId, usize>,
}

impl TryFrom<StoredFigureMap> for FigureMap {
    type Error = String;

    fn try_from(stored: StoredFigureMap) -> Result<Self, Self::Error> {
        for (key, record) in &stored.figures {
            if key != record.id.as_str() {
                return Err(format!("figure stored under '{key}' has id '{}'", record.id));
            }
        }
        Self::from_records(stored.document_id, stored.figures.into_values().collect())
    }
}

impl From<FigureMap> for StoredFigureMap {
    fn from(map: FigureMap) -> Self {
        StoredFigureMap {
            document_id: map.document_id,
            figures: map
                .figures
                .into_iter()
                .map(|f| (f.id.as_str().to_string(), f))
                .collect(),
        }
    }
}

impl FigureMap {
    pub fn from_records(
        document_id: DocumentId,
        mut figures: Vec<FigureRecord>,
    ) -> Result<Self, String> {
        figures.sort_by_key(|f| f.position);
        let mut by_id = HashMap::with_capacity(figures.len());
        for (i, figure) in figures.iter().enumerate() {
            if figure.position != i {
                return Err(format!(
                    "figure positions are not dense: expected {i}, found {}",
                    figure.position
                ));
            }
            if by_id.insert(figure.id.clone(), i).is_some() {
                return Err(format!("duplicate figure id '{}'", figure.id));
            }
        }
        Ok(Self {
            document_id,
            figures,
            by_id,
        })
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&FigureRecord> {
        self.by_id.get(id).map(|&i| &self.figures[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FigureRecord> {
        self.by_id.get(id).map(|&i| &mut self.figures[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FigureRecord> {
        self.figures.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FigureRecord> {
        self.figures.iter_mut()
    }

    pub fn most_recent(&self) -> Option<&FigureRecord> {
        self.figures.iter().find(|f| f.is_most_recently_inserted)
    }
}

/// Keys the stored maps hold next to the records.
const RESERVED_IDS: [&str; 2] = ["documentId", "trailingRefs"];

fn is_reserved(id: &str) -> bool {
    RESERVED_IDS.contains(&id)
}

/// Strips the fragment marker from a link target.
fn link_target(href: &str) -> &str {
    href.strip_prefix('#').unwrap_or(href)
}

struct IndexBuilder<'a> {
    config: &'a EngineConfig,
    figure_ids: HashSet<&'a str>,
    attributed: HashSet<&'a str>,
    blocks: Vec<TextBlockRecord>,
    seen_blocks: HashSet<&'a str>,
    next_section_node: usize,
    last_section_key: Option<Option<usize>>,
    section: usize,
    section_blocks_seen: usize,
    section_figures_referenced: usize,
}

impl<'a> IndexBuilder<'a> {
    fn collect_figures(&mut self, nodes: &'a [IRNode], out: &mut Vec<FigureRecord>) {
        for node in nodes {
            if let IRNode::Figure {
                meta, image, class, ..
            } = node
            {
                let Some(id) = meta.id.as_deref() else {
                    log::warn!("Figure '{}' has no id and cannot be referenced", image.src);
                    continue;
                };
                if is_reserved(id) {
                    log::warn!("Figure id '{id}' collides with a stored map key; not indexed");
                    continue;
                }
                if !self.figure_ids.insert(id) {
                    log::warn!("Duplicate figure id '{id}'; keeping the first occurrence");
                    continue;
                }
                let caption_chars = node.text_len();
                out.push(FigureRecord {
                    id: FigureId::new(id),
                    position: out.len(),
                    geometry: FigureGeometry {
                        natural_width: image.natural_width,
                        natural_height: image.natural_height,
                        caption_chars,
                        assigned_class: class
                            .as_deref()
                            .map(TypesettingClass::new)
                            .unwrap_or_else(|| self.config.default_class.clone()),
                    },
                    inserted: false,
                    is_most_recently_inserted: false,
                    page: None,
                    placed_class: None,
                    typesetting_class: None,
                    position_class: None,
                    style: None,
                });
            }
            self.collect_figures(node.children(), out);
        }
    }

    fn collect_blocks(&mut self, nodes: &'a [IRNode], section_node: Option<usize>) {
        for node in nodes {
            match node {
                IRNode::Section { children, .. } => {
                    let key = self.next_section_node;
                    self.next_section_node += 1;
                    self.collect_blocks(children, Some(key));
                }
                IRNode::Block { children, .. } => self.collect_blocks(children, section_node),
                n if n.is_text_bearing() => self.push_block(n, section_node),
                _ => {}
            }
        }
    }

    fn push_block(&mut self, node: &'a IRNode, section_node: Option<usize>) {
        let Some(id) = node.id() else {
            log::warn!("Skipping {} without an id; the host assigns ids before indexing", node.kind());
            return;
        };
        if is_reserved(id) {
            log::warn!("Block id '{id}' collides with a stored map key; not indexed");
            return;
        }
        if !self.seen_blocks.insert(id) {
            log::warn!("Duplicate block id '{id}'; keeping the first occurrence");
            return;
        }

        let is_first_of_section = self.last_section_key != Some(section_node);
        if is_first_of_section {
            if self.last_section_key.is_some() {
                self.section += 1;
            }
            self.last_section_key = Some(section_node);
            self.section_blocks_seen = 0;
            self.section_figures_referenced = 0;
        }

        let implicit = node
            .meta()
            .map(|m| m.implicit_refs.as_slice())
            .unwrap_or(&[]);
        let mut refs = Vec::new();
        for target in node
            .link_targets()
            .into_iter()
            .chain(implicit.iter().map(String::as_str))
        {
            let target = link_target(target);
            if self.figure_ids.contains(target) && self.attributed.insert(target) {
                refs.push(FigureId::new(target));
            }
        }

        self.section_blocks_seen += 1;
        self.section_figures_referenced += refs.len();

        self.blocks.push(TextBlockRecord {
            id: BlockId::new(id),
            position: self.blocks.len(),
            figure_refs: refs,
            placed: false,
            is_first_of_section,
            is_heading: node.is_heading(),
            section: self.section,
            section_figures_referenced: self.section_figures_referenced,
            section_blocks_seen: self.section_blocks_seen,
            text_chars: node.text_len(),
            style: None,
            class: None,
        });
    }
}

/// Scans the finalized tree and builds both maps.
///
/// Persisted `style`, `class`, `typesettingClass` and `positionClass` fields
/// are copied from `previous` when it describes the same document.
pub fn build_index(
    tree: &ContentTree,
    previous: Option<&DocumentLayoutState>,
    config: &EngineConfig,
) -> DocumentLayoutState {
    let document_id = DocumentId::new(tree.document_id.as_str());
    let mut builder = IndexBuilder {
        config,
        figure_ids: HashSet::new(),
        attributed: HashSet::new(),
        blocks: Vec::new(),
        seen_blocks: HashSet::new(),
        next_section_node: 0,
        last_section_key: None,
        section: 0,
        section_blocks_seen: 0,
        section_figures_referenced: 0,
    };

    let mut figures = Vec::new();
    builder.collect_figures(&tree.children, &mut figures);
    builder.collect_blocks(&tree.children, None);

    let unreferenced = figures
        .iter()
        .filter(|f| !builder.attributed.contains(f.id.as_str()))
        .count();
    if unreferenced > 0 {
        log::warn!("{unreferenced} figure(s) are not referenced by any text block");
    }

    let mut blocks = builder.blocks;
    match previous {
        Some(prev) if prev.document_id() == &document_id => {
            for block in &mut blocks {
                if let Some(old) = prev.text.get(block.id.as_str()) {
                    block.style = old.style.clone();
                    block.class = old.class.clone();
                }
            }
            for figure in &mut figures {
                if let Some(old) = prev.figures.get(figure.id.as_str()) {
                    figure.copy_overrides_from(old);
                }
            }
        }
        Some(prev) => log::info!(
            "Document changed from '{}' to '{}'; discarding persisted overrides",
            prev.document_id(),
            document_id
        ),
        None => {}
    }

    log::info!(
        "Indexed {} text blocks and {} figures for document '{}'",
        blocks.len(),
        figures.len(),
        document_id
    );

    // Positions are assigned densely above, so these cannot fail.
    let by_block: HashMap<BlockId, usize> = blocks
        .iter()
        .enumerate()
        .map(|(i, b)| (b.id.clone(), i))
        .collect();
    let by_figure: HashMap<FigureId, usize> = figures
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id.clone(), i))
        .collect();

    DocumentLayoutState {
        text: TextContentMap {
            document_id: document_id.clone(),
            blocks,
            by_id: by_block,
            trailing_refs: Vec::new(),
        },
        figures: FigureMap {
            document_id,
            figures,
            by_id: by_figure,
        },
    }
}
