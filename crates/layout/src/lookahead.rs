//! Collects the figure references a block's turn has to decide on.

use crate::index::FigureRecord;
use crate::state::DocumentLayoutState;
use pagefig_types::FigureId;
use std::collections::HashSet;

/// Not-yet-inserted figures referenced by the block at `position` or by the
/// `window` blocks after it, sorted by canonical figure position.
///
/// The walk stops before a block that opens a new section unless
/// `cross_sections` is set. References to unknown figures are dropped.
pub fn next_figure_refs(
    state: &DocumentLayoutState,
    position: usize,
    window: usize,
    cross_sections: bool,
) -> Vec<FigureId> {
    let mut seen = HashSet::new();
    let mut found: Vec<&FigureRecord> = Vec::new();

    let mut collect = |refs: &[FigureId]| {
        for id in refs {
            match state.figures.get(id.as_str()) {
                Some(figure) if figure.inserted => {}
                Some(figure) => {
                    if seen.insert(id.clone()) {
                        found.push(figure);
                    }
                }
                None => log::warn!("Reference to unknown figure '{id}' dropped"),
            }
        }
    };

    let Some(current) = state.text.at(position) else {
        return Vec::new();
    };
    collect(&current.figure_refs);

    for ahead in (position + 1)..=(position + window) {
        let Some(block) = state.text.at(ahead) else {
            break;
        };
        if block.is_first_of_section && !cross_sections {
            log::trace!("Lookahead from block {position} stops at section start '{}'", block.id);
            break;
        }
        collect(&block.figure_refs);
    }

    found.sort_by_key(|f| f.position);
    found.into_iter().map(|f| f.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::build_index;
    use crate::test_utils::*;
    use pagefig_idf::ContentTree;
    use pagefig_types::TypesettingClass;

    fn sectioned_tree() -> ContentTree {
        ContentTree::new(
            "doc",
            vec![
                section(
                    "s1",
                    vec![
                        paragraph_with_refs("p0", &["f3"]),
                        paragraph_with_refs("p1", &["f1"]),
                    ],
                ),
                section(
                    "s2",
                    vec![
                        paragraph_with_refs("p2", &["f2"]),
                        paragraph_with_refs("p3", &["f4"]),
                    ],
                ),
                figure("f1", 100.0, 100.0, ""),
                figure("f2", 100.0, 100.0, ""),
                figure("f3", 100.0, 100.0, ""),
                figure("f4", 100.0, 100.0, ""),
            ],
        )
    }

    #[test]
    fn test_sorted_by_canonical_position() {
        let state = build_index(&sectioned_tree(), None, &test_config());
        // p0 references f3 before p1 references f1; figure order wins.
        assert_eq!(next_figure_refs(&state, 0, 3, false), ids(&["f1", "f3"]));
    }

    #[test]
    fn test_stops_at_section_boundary() {
        let state = build_index(&sectioned_tree(), None, &test_config());
        assert_eq!(next_figure_refs(&state, 1, 3, false), ids(&["f1"]));
        assert_eq!(
            next_figure_refs(&state, 1, 3, true),
            ids(&["f1", "f2", "f4"])
        );
    }

    #[test]
    fn test_first_block_of_section_scans_its_own_section() {
        let state = build_index(&sectioned_tree(), None, &test_config());
        assert_eq!(next_figure_refs(&state, 2, 3, false), ids(&["f2", "f4"]));
    }

    #[test]
    fn test_window_bounds_the_walk() {
        let state = build_index(&sectioned_tree(), None, &test_config());
        assert_eq!(next_figure_refs(&state, 0, 0, true), ids(&["f3"]));
        assert_eq!(next_figure_refs(&state, 0, 2, true), ids(&["f1", "f2", "f3"]));
    }

    #[test]
    fn test_skips_inserted_and_unknown() {
        let mut state = build_index(&sectioned_tree(), None, &test_config());
        state
            .mark_inserted(&FigureId::new("f1"), 0, &TypesettingClass::new("medium"))
            .unwrap();
        state.text.at_mut(0).unwrap().figure_refs.push(FigureId::new("ghost"));
        assert_eq!(next_figure_refs(&state, 0, 3, false), ids(&["f3"]));
    }

    #[test]
    fn test_out_of_range_position() {
        let state = build_index(&sectioned_tree(), None, &test_config());
        assert!(next_figure_refs(&state, 99, 3, true).is_empty());
    }
}
