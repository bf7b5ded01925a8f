//! Commits the outcome of a turn: inserts figures through the host and
//! queues the rest onto the next block.

use crate::LayoutError;
use crate::config::EngineConfig;
use crate::context::PageContext;
use crate::fit::{Candidate, FitResult};
use crate::geometry::float_compensation;
use crate::host::{FigurePlacement, HostLayout, RenderedNode};
use crate::index::{PositionClass, RefHolder};
use crate::model::{ModelSpec, WrapMode};
use crate::state::DocumentLayoutState;
use pagefig_types::{FigureId, TypesettingClass};

#[derive(Debug, Clone, PartialEq)]
pub struct InsertedFigure {
    pub figure_id: FigureId,
    pub class: TypesettingClass,
    pub position_class: Option<PositionClass>,
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlacementOutcome {
    pub inserted: Vec<InsertedFigure>,
    pub deferred: Vec<FigureId>,
}

/// Applies `fit` to the sorted `candidates` of the block at `block_position`.
///
/// Only the first two candidates can be inserted. Everything not inserted
/// that is held at or before the current block moves onto the next block;
/// references held further ahead stay where they are. A figure is recorded
/// as inserted only after the host accepted it.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    state: &mut DocumentLayoutState,
    host: &mut dyn HostLayout,
    anchor: &RenderedNode,
    ctx: &PageContext,
    block_position: usize,
    fit: FitResult,
    candidates: &[Candidate],
    model: &ModelSpec,
    config: &EngineConfig,
) -> Result<PlacementOutcome, LayoutError> {
    let mut outcome = PlacementOutcome::default();
    let mut before_wrap = state
        .recent_on_page(ctx.page)
        .and_then(|f| f.placed_class.as_ref())
        .map(|c| model.wrap_of(c));

    for (slot, candidate) in candidates.iter().enumerate() {
        let placed = match slot {
            0 => fit.current,
            1 => fit.next,
            _ => false,
        };

        if !placed {
            defer(state, block_position, &candidate.figure_id);
            outcome.deferred.push(candidate.figure_id.clone());
            continue;
        }

        let record = state
            .figures
            .get(candidate.figure_id.as_str())
            .ok_or_else(|| LayoutError::UnknownFigure(candidate.figure_id.to_string()))?;

        let position_class = record.position_class.or_else(|| {
            let pinned = model.wrap_of(&candidate.class) == WrapMode::PageTop
                || before_wrap == Some(WrapMode::PageTop);
            pinned.then_some(PositionClass::Top)
        });

        let placement = FigurePlacement {
            figure_id: candidate.figure_id.clone(),
            class: candidate.class.clone(),
            position_class,
            style: record.style.clone(),
            margin_bottom: float_compensation(&candidate.estimate, &config.caption_text),
            predicted_height: candidate.height(),
        };

        host.insert_figure_after(anchor, &placement)?;
        state.mark_inserted(&candidate.figure_id, ctx.page, &candidate.class)?;
        log::debug!(
            "Inserted figure '{}' as '{}' after '{}' on page {}",
            candidate.figure_id,
            candidate.class,
            anchor.node_id,
            ctx.page
        );

        before_wrap = Some(model.wrap_of(&candidate.class));
        outcome.inserted.push(InsertedFigure {
            figure_id: candidate.figure_id.clone(),
            class: candidate.class.clone(),
            position_class,
            page: ctx.page,
        });
    }

    Ok(outcome)
}

fn defer(state: &mut DocumentLayoutState, block_position: usize, figure: &FigureId) {
    match state.text.holder_of(figure) {
        Some(RefHolder::Block(p)) if p > block_position => {
            log::trace!("Figure '{figure}' stays queued on block {p}");
        }
        _ => {
            let holder = state.text.queue_after(block_position, figure);
            log::debug!("Deferred figure '{figure}' to {holder:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::RenderedKind;
    use crate::index::build_index;
    use crate::test_utils::*;

    fn candidates(state: &DocumentLayoutState, ctx: &PageContext, ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| {
                let record = state.figures.get(id).unwrap();
                Candidate::resolve(
                    record,
                    &crate::constellation::Decision::place_as(TypesettingClass::new("medium")),
                    &test_model(),
                    &test_config(),
                    ctx,
                )
            })
            .collect()
    }

    fn run(
        state: &mut DocumentLayoutState,
        host: &mut MockHost,
        anchor: &RenderedNode,
        ctx: &PageContext,
        position: usize,
        fit: FitResult,
        cands: &[Candidate],
    ) -> Result<PlacementOutcome, LayoutError> {
        apply(state, host, anchor, ctx, position, fit, cands, &test_model(), &test_config())
    }

    #[test]
    fn test_inserts_and_marks() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(400.0);
        let cands = candidates(&state, &ctx, &["f1", "f2"]);

        let fit = FitResult { current: true, next: true };
        let outcome = run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap();

        assert_eq!(outcome.inserted.len(), 2);
        assert!(outcome.deferred.is_empty());
        assert_eq!(host.inserted_ids(), vec!["f1", "f2"]);
        assert!(state.figures.get("f1").unwrap().inserted);
        assert!(state.figures.get("f2").unwrap().is_most_recently_inserted);
        assert!(!state.figures.get("f1").unwrap().is_most_recently_inserted);
    }

    #[test]
    fn test_defers_to_next_block() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(200.0);
        let cands = candidates(&state, &ctx, &["f1", "f2"]);

        let fit = FitResult { current: true, next: false };
        let outcome = run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap();

        assert_eq!(outcome.deferred, ids(&["f2"]));
        assert_eq!(state.text.at(1).unwrap().figure_refs, ids(&["f2"]));
        assert!(!state.figures.get("f2").unwrap().inserted);
    }

    #[test]
    fn test_third_candidate_always_deferred() {
        let mut state = build_index(&three_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(2000.0);
        let cands = candidates(&state, &ctx, &["f1", "f2", "f3"]);

        let fit = FitResult { current: true, next: true };
        let outcome = run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap();
        assert_eq!(outcome.deferred, ids(&["f3"]));
        assert!(state.text.at(1).unwrap().figure_refs.contains(&FigureId::new("f3")));
    }

    #[test]
    fn test_last_block_defers_to_trailing() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p1", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(0.0);
        state.text.queue_after(0, &FigureId::new("f1"));
        let cands = candidates(&state, &ctx, &["f1"]);

        run(&mut state, &mut host, &anchor, &ctx, 1, FitResult::none(), &cands).unwrap();
        assert_eq!(state.text.trailing_refs(), ids(&["f1"]).as_slice());
    }

    #[test]
    fn test_host_rejection_leaves_figure_unmarked() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        host.reject_inserts = true;
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(400.0);
        let cands = candidates(&state, &ctx, &["f1"]);

        let fit = FitResult { current: true, next: false };
        let err = run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap_err();
        assert!(matches!(err, LayoutError::Host(_)));
        assert!(!state.figures.get("f1").unwrap().inserted);
    }

    #[test]
    fn test_page_top_pins_position() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(2000.0);
        let mut cands = candidates(&state, &ctx, &["f1", "f2"]);
        cands[0].class = TypesettingClass::new("page-top");

        let fit = FitResult { current: true, next: true };
        let outcome = run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap();
        assert_eq!(outcome.inserted[0].position_class, Some(PositionClass::Top));
        // The follower inherits the pin.
        assert_eq!(outcome.inserted[1].position_class, Some(PositionClass::Top));
    }

    #[test]
    fn test_float_gets_negative_margin() {
        let mut state = build_index(&two_figure_tree(), None, &test_config());
        let mut host = MockHost::new(1000.0, 600.0);
        let anchor = RenderedNode::new("p0", RenderedKind::Text, 0, 50.0);
        let ctx = context_with_remaining(2000.0);
        let mut cands = candidates(&state, &ctx, &["f1"]);
        let mut record = state.figures.get("f1").unwrap().clone();
        record.geometry.caption_chars = 100;
        cands[0] = Candidate::resolve(
            &record,
            &crate::constellation::Decision::place_as(TypesettingClass::new("float")),
            &test_model(),
            &test_config(),
            &ctx,
        );

        let fit = FitResult { current: true, next: false };
        run(&mut state, &mut host, &anchor, &ctx, 0, fit, &cands).unwrap();
        assert!(host.inserted[0].1.margin_bottom < 0.0);
    }
}
