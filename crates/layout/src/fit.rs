//! Decides whether the candidates of a turn fit under the current node.

use crate::config::EngineConfig;
use crate::constellation::{ConstellationEntry, Decision};
use crate::context::PageContext;
use crate::geometry::{FigureEstimate, estimate_figure};
use crate::index::FigureRecord;
use crate::model::ModelSpec;
use crate::state::DocumentLayoutState;
use pagefig_types::{FigureId, TypesettingClass};

/// A figure proposed for this turn, sized as the variant it would be placed as.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub figure_id: FigureId,
    pub position: usize,
    pub class: TypesettingClass,
    pub estimate: FigureEstimate,
}

impl Candidate {
    /// Sizes `record` for placement. A persisted class override wins over the
    /// table's variant, which wins over the figure's own class.
    pub fn resolve(
        record: &FigureRecord,
        decision: &Decision,
        model: &ModelSpec,
        config: &EngineConfig,
        ctx: &PageContext,
    ) -> Self {
        let class = record
            .typesetting_class
            .clone()
            .or_else(|| decision.variant.clone())
            .unwrap_or_else(|| record.geometry.assigned_class.clone());
        let estimate = estimate_figure(
            &record.geometry,
            model.preset(&class),
            config,
            ctx.content_size(),
        );
        Self {
            figure_id: record.id.clone(),
            position: record.position,
            class,
            estimate,
        }
    }

    pub fn height(&self) -> f32 {
        self.estimate.total_height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FitResult {
    pub current: bool,
    pub next: bool,
}

impl FitResult {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn placed_count(&self) -> usize {
        usize::from(self.current) + usize::from(self.next)
    }
}

/// Evaluates both candidates against the page.
///
/// The next candidate can only succeed when the current one does, so figures
/// never leave a lower-numbered one behind.
pub fn fits(
    entry: &ConstellationEntry,
    ctx: &PageContext,
    current: Option<&Candidate>,
    next: Option<&Candidate>,
    config: &EngineConfig,
) -> FitResult {
    if ctx.is_heading {
        log::debug!("No figures directly after a heading on page {}", ctx.page);
        return FitResult::none();
    }
    if ctx.page_at_quota {
        log::debug!("Page {} already holds {} figures", ctx.page, ctx.figures_on_page);
        return FitResult::none();
    }

    let budget = ctx.remaining_space * config.safety_buffer;
    let slots = ctx.free_figure_slots(config.max_figures_per_page);

    let current_fits = match current {
        Some(c) => entry.current_figure.eligible && c.height() <= budget,
        None => false,
    };
    if !current_fits {
        return FitResult::none();
    }

    let next_fits = match (current, next) {
        (Some(c), Some(n)) => {
            entry.next_figure.eligible
                && slots >= 2
                && n.height() <= budget
                && c.height() + n.height() <= budget
        }
        _ => false,
    };

    FitResult {
        current: true,
        next: next_fits,
    }
}

/// Whether placing a figure at `position` on `page` keeps figure numbering
/// in render order, given the figures already inserted there.
pub fn keeps_page_order(state: &DocumentLayoutState, page: usize, position: usize) -> bool {
    state
        .figures
        .iter()
        .filter(|f| f.inserted && f.page == Some(page))
        .all(|f| f.position < position)
}
