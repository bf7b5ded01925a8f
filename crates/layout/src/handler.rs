//! `FigureLayoutHandler`: the hook implementation that ties the components
//! together.
//!
//! The handler keeps no layout state of its own between callbacks. Every hook
//! loads both maps from the store, works on them, and saves them before
//! returning, so a host is free to drop and recreate the handler at any
//! callback boundary.

use crate::LayoutError;
use crate::config::EngineConfig;
use crate::constellation::{ConstellationTable, Decision};
use crate::context::{NodeCategory, PageContext, attr, resolve_context};
use crate::fit::{Candidate, FitResult, fits, keeps_page_order};
use crate::hooks::{PaginationHooks, PlacedFigure, RenderReport};
use crate::host::{CompletedPage, HostLayout, PageEntry, RenderedNode};
use crate::index::{FigureRecord, PositionClass, TextBlockRecord, build_index};
use crate::lookahead::next_figure_refs;
use crate::model::{ModelSpec, WrapMode};
use crate::persistence::{clear_state, load_state};
use crate::placement::apply;
use crate::prepare::prepare_tree;
use crate::state::{DocumentLayoutState, LayoutPhase};
use pagefig_idf::{ContentTree, NodeMetadata};
use pagefig_traits::StateStore;
use pagefig_types::{BlockId, FigureId, TypesettingClass};
use std::collections::BTreeSet;
use std::sync::Arc;

pub struct FigureLayoutHandler {
    config: EngineConfig,
    model: ModelSpec,
    table: ConstellationTable,
    store: Arc<dyn StateStore>,
    phase: LayoutPhase,
}

impl FigureLayoutHandler {
    pub fn new(
        config: EngineConfig,
        model: ModelSpec,
        table: ConstellationTable,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            config,
            model,
            table,
            store,
            phase: LayoutPhase::Unbuilt,
        }
    }

    /// A handler over the default catalogue and its generated table.
    pub fn with_defaults(config: EngineConfig, store: Arc<dyn StateStore>) -> Self {
        let model = ModelSpec::default_catalogue();
        let table = ConstellationTable::generate(&model);
        Self::new(config, model, table, store)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn model(&self) -> &ModelSpec {
        &self.model
    }

    pub fn phase(&self) -> &LayoutPhase {
        &self.phase
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// The stored state. Hooks past `after_parse` cannot run without it.
    pub fn load(&self) -> Result<DocumentLayoutState, LayoutError> {
        load_state(self.store.as_ref())?.ok_or_else(|| {
            LayoutError::OutOfOrder("no layout index is stored; after_parse has not run".into())
        })
    }

    fn save(&self, state: &DocumentLayoutState) -> Result<(), LayoutError> {
        state.save(self.store.as_ref())
    }

    fn update_figure(
        &self,
        id: &str,
        change: impl FnOnce(&mut FigureRecord),
    ) -> Result<(), LayoutError> {
        let mut state = self.load()?;
        let figure = state
            .figures
            .get_mut(id)
            .ok_or_else(|| LayoutError::UnknownFigure(id.to_string()))?;
        change(figure);
        self.save(&state)
    }

    /// Persists a class override for a figure, or removes it with `None`.
    pub fn set_figure_class(
        &self,
        id: &str,
        class: Option<TypesettingClass>,
    ) -> Result<(), LayoutError> {
        if let Some(class) = &class {
            if !self.model.contains(class) {
                return Err(LayoutError::Config(format!(
                    "typesetting class '{class}' is not in the model spec"
                )));
            }
        }
        log::info!("Figure '{id}' class override set to {class:?}");
        self.update_figure(id, |f| f.typesetting_class = class)
    }

    pub fn set_figure_position(
        &self,
        id: &str,
        position: Option<PositionClass>,
    ) -> Result<(), LayoutError> {
        self.update_figure(id, |f| f.position_class = position)
    }

    pub fn set_figure_style(&self, id: &str, style: Option<String>) -> Result<(), LayoutError> {
        self.update_figure(id, |f| f.style = style)
    }

    fn update_block(
        &self,
        id: &str,
        change: impl FnOnce(&mut TextBlockRecord),
    ) -> Result<(), LayoutError> {
        let mut state = self.load()?;
        let block = state
            .text
            .get_mut(id)
            .ok_or_else(|| LayoutError::UnknownBlock(id.to_string()))?;
        change(block);
        self.save(&state)
    }

    /// Persists a freeform style for a text block, or removes it with `None`.
    pub fn set_block_style(&self, id: &str, style: Option<String>) -> Result<(), LayoutError> {
        self.update_block(id, |b| b.style = style)
    }

    pub fn set_block_class(&self, id: &str, class: Option<String>) -> Result<(), LayoutError> {
        log::info!("Block '{id}' class override set to {class:?}");
        self.update_block(id, |b| b.class = class)
    }

    /// Drops every persisted override of the stored document.
    pub fn clear_overrides(&self) -> Result<(), LayoutError> {
        let mut state = self.load()?;
        for figure in state.figures.iter_mut() {
            figure.typesetting_class = None;
            figure.position_class = None;
            figure.style = None;
        }
        for block in state.text.iter_mut() {
            block.style = None;
            block.class = None;
        }
        log::info!("Cleared overrides of '{}'", state.document_id());
        self.save(&state)
    }

    fn mark_decided(source: &mut NodeMetadata, rendered: &mut RenderedNode) {
        for attrs in [&mut source.attributes, &mut rendered.attributes] {
            attrs.insert(attr::FIGURES_DECIDED.into(), "true".into());
        }
    }

    /// One block's turn: propose, decide, place, defer.
    fn take_turn(
        &mut self,
        state: &mut DocumentLayoutState,
        rendered: &RenderedNode,
        ctx: &PageContext,
        block: &BlockId,
        position: usize,
        host: &mut dyn HostLayout,
    ) -> Result<(), LayoutError> {
        let ids = next_figure_refs(
            state,
            position,
            self.config.lookahead_window,
            self.config.cross_sections,
        );
        if ids.is_empty() {
            return Ok(());
        }

        let records: Vec<_> = ids
            .iter()
            .filter_map(|id| state.figures.get(id.as_str()))
            .collect();
        let before = state
            .recent_on_page(ctx.page)
            .and_then(|f| f.placed_class.clone());
        let entry = self.table.decide(
            before.as_ref(),
            records.first().map(|r| r.lookup_class()),
            records.get(1).map(|r| r.lookup_class()),
        );

        let beyond_pair = Decision::ineligible();
        let candidates: Vec<Candidate> = records
            .iter()
            .enumerate()
            .map(|(slot, record)| {
                let decision = match slot {
                    0 => &entry.current_figure,
                    1 => &entry.next_figure,
                    _ => &beyond_pair,
                };
                Candidate::resolve(record, decision, &self.model, &self.config, ctx)
            })
            .collect();

        let mut fit = fits(
            &entry,
            ctx,
            candidates.first(),
            candidates.get(1),
            &self.config,
        );
        if fit.current
            && candidates
                .first()
                .is_some_and(|c| !keeps_page_order(state, ctx.page, c.position))
        {
            log::debug!("A higher-numbered figure is already on page {}; deferring", ctx.page);
            fit = FitResult::none();
        }
        log::trace!(
            "{} of {} candidate(s) fit under '{block}'",
            fit.placed_count(),
            candidates.len()
        );

        self.phase = LayoutPhase::Placing(block.clone());
        let result = apply(
            state,
            host,
            rendered,
            ctx,
            position,
            fit,
            &candidates,
            &self.model,
            &self.config,
        );
        if result.is_err() {
            // Keep what the host did accept.
            self.save(state)?;
        }
        let outcome = result?;
        log::debug!(
            "Block {} on page {}: {} inserted, {} deferred",
            position,
            ctx.page,
            outcome.inserted.len(),
            outcome.deferred.len()
        );
        Ok(())
    }

    fn is_pinned(&self, state: &DocumentLayoutState, figure: &str) -> bool {
        state.figures.get(figure).is_some_and(|f| {
            f.position_class == Some(PositionClass::Top)
                || f.placed_class
                    .as_ref()
                    .is_some_and(|c| self.model.wrap_of(c) == WrapMode::PageTop)
        })
    }
}

impl PaginationHooks for FigureLayoutHandler {
    fn before_parse(&mut self, tree: ContentTree) -> Result<ContentTree, LayoutError> {
        Ok(prepare_tree(tree))
    }

    fn after_parse(&mut self, tree: &ContentTree) -> Result<(), LayoutError> {
        let previous = match load_state(self.store.as_ref()) {
            Ok(previous) => previous,
            Err(LayoutError::CorruptState(reason)) => {
                log::warn!("Stored layout state is unreadable ({reason}); rebuilding clean");
                clear_state(self.store.as_ref())?;
                None
            }
            Err(e) => return Err(e),
        };
        let state = build_index(tree, previous.as_ref(), &self.config);
        self.save(&state)?;
        self.phase = LayoutPhase::Indexed;
        Ok(())
    }

    fn node_commit(
        &mut self,
        source: &mut NodeMetadata,
        rendered: &mut RenderedNode,
        host: &mut dyn HostLayout,
    ) -> Result<(), LayoutError> {
        if !self.phase.accepts_commits() {
            return Err(LayoutError::OutOfOrder(format!(
                "node '{}' committed after the render was flushed",
                rendered.node_id
            )));
        }
        let mut state = self.load()?;

        let ctx = resolve_context(rendered, &state, &*host, &self.config, &self.model);
        ctx.write_attributes(&mut rendered.attributes);
        ctx.write_attributes(&mut source.attributes);

        if ctx.category == NodeCategory::Figure {
            return Ok(());
        }

        let Some(block) = state.text.get(&rendered.node_id) else {
            log::info!(
                "Node '{}' is not an indexed text block; no placement",
                rendered.node_id
            );
            return Ok(());
        };
        let (block_id, position) = (block.id.clone(), block.position);

        let decided_before = block.placed || ctx.predecessor.is_some_and(|p| p.figures_decided);
        if decided_before {
            log::trace!("Block '{block_id}' already had its turn");
            Self::mark_decided(source, rendered);
            return Ok(());
        }

        self.phase = LayoutPhase::Evaluating(block_id.clone());
        self.take_turn(&mut state, rendered, &ctx, &block_id, position, host)?;

        if let Some(block) = state.text.at_mut(position) {
            block.placed = true;
        }
        Self::mark_decided(source, rendered);
        self.save(&state)?;
        self.phase = LayoutPhase::Indexed;
        Ok(())
    }

    fn page_complete(&mut self, page: &mut CompletedPage) -> Result<(), LayoutError> {
        let state = self.load()?;

        let on_page: BTreeSet<&str> = page.figure_ids().collect();
        for figure in state.figures.iter().filter(|f| f.page == Some(page.index)) {
            if !on_page.contains(figure.id.as_str()) {
                log::warn!(
                    "Figure '{}' was inserted on page {} but is missing from it",
                    figure.id,
                    page.index
                );
            }
        }

        // Figures are on the page in canonical order, so only a leading run
        // of pinned figures can move up without overtaking a lower number.
        let pinned: Vec<String> = page
            .figure_ids()
            .take_while(|id| self.is_pinned(&state, id))
            .map(str::to_string)
            .collect();
        if pinned.is_empty() {
            return Ok(());
        }

        let (mut moved, rest): (Vec<PageEntry>, Vec<PageEntry>) =
            std::mem::take(&mut page.entries)
                .into_iter()
                .partition(|e| e.figure_id().is_some_and(|id| pinned.iter().any(|p| p == id)));
        log::debug!("Pinned {} figure(s) to the top of page {}", moved.len(), page.index);
        moved.extend(rest);
        page.entries = moved;
        Ok(())
    }

    fn all_rendered(&mut self, pages: &[CompletedPage]) -> Result<RenderReport, LayoutError> {
        let mut state = self.load()?;

        let placed: Vec<PlacedFigure> = state
            .figures
            .iter()
            .filter(|f| f.inserted)
            .filter_map(|f| {
                Some(PlacedFigure {
                    figure_id: f.id.clone(),
                    page: f.page?,
                    class: f.placed_class.clone()?,
                })
            })
            .collect();

        let referenced = state.text.referenced_figures();
        let queued: Vec<FigureId> = state
            .figures
            .iter()
            .filter(|f| !f.inserted && referenced.contains(&f.id))
            .map(|f| f.id.clone())
            .collect();
        let unreferenced: Vec<FigureId> = state
            .figures
            .iter()
            .filter(|f| !referenced.contains(&f.id))
            .map(|f| f.id.clone())
            .collect();

        let report = RenderReport {
            document_id: state.document_id().to_string(),
            pages: pages.len(),
            placed,
            queued,
            unreferenced,
        };
        log::info!(
            "Rendered '{}': {} pages, {} figures placed, {} still queued",
            report.document_id,
            report.pages,
            report.placed.len(),
            report.queued.len()
        );
        if !report.queued.is_empty() {
            log::warn!("Figures left unplaced: {:?}", report.queued);
        }

        state.clear_render_local();
        self.save(&state)?;
        self.phase = LayoutPhase::Persisted;
        Ok(report)
    }
}
