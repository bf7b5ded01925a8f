//! Durable storage of the two maps, keyed by fixed names.
//!
//! Every hook reads the maps on entry and writes them back before returning,
//! since the host may drop the engine between callbacks. A store failure is
//! fatal for the render.

use crate::LayoutError;
use crate::index::{FigureMap, TextContentMap};
use crate::state::DocumentLayoutState;
use pagefig_traits::StateStore;

pub const TEXT_CONTENT_MAP_KEY: &str = "text-content-map";
pub const FIGURE_MAP_KEY: &str = "figure-map";

/// Reads both maps. Returns `Ok(None)` when nothing usable is stored (never
/// written, only half written, or the halves disagree on the document).
pub fn load_state(store: &dyn StateStore) -> Result<Option<DocumentLayoutState>, LayoutError> {
    let text = store.read(TEXT_CONTENT_MAP_KEY)?;
    let figures = store.read(FIGURE_MAP_KEY)?;

    let (text, figures) = match (text, figures) {
        (Some(t), Some(f)) => (t, f),
        (None, None) => return Ok(None),
        _ => {
            log::warn!("Only one of the layout maps is stored in {}; ignoring it", store.name());
            return Ok(None);
        }
    };

    let text: TextContentMap = serde_json::from_str(&text)
        .map_err(|e| LayoutError::CorruptState(format!("{TEXT_CONTENT_MAP_KEY}: {e}")))?;
    let figures: FigureMap = serde_json::from_str(&figures)
        .map_err(|e| LayoutError::CorruptState(format!("{FIGURE_MAP_KEY}: {e}")))?;

    let state = DocumentLayoutState { text, figures };
    if !state.is_consistent() {
        log::warn!(
            "Stored maps disagree on the document ('{}' vs '{}'); ignoring them",
            state.text.document_id(),
            state.figures.document_id()
        );
        return Ok(None);
    }
    Ok(Some(state))
}

pub fn save_state(store: &dyn StateStore, state: &DocumentLayoutState) -> Result<(), LayoutError> {
    let figures = serde_json::to_string(&state.figures)?;
    let text = serde_json::to_string(&state.text)?;
    store.write(FIGURE_MAP_KEY, &figures)?;
    store.write(TEXT_CONTENT_MAP_KEY, &text)?;
    log::trace!("Saved layout state for '{}' to {}", state.document_id(), store.name());
    Ok(())
}

pub fn clear_state(store: &dyn StateStore) -> Result<(), LayoutError> {
    store.remove(FIGURE_MAP_KEY)?;
    store.remove(TEXT_CONTENT_MAP_KEY)?;
    Ok(())
}
