//! The explicit layout state handed to every component, and the per-render
//! phase the hooks move through.

use crate::LayoutError;
use crate::index::{FigureMap, FigureRecord, TextContentMap};
use pagefig_types::{BlockId, DocumentId, FigureId, TypesettingClass};
use pagefig_traits::StateStore;

/// Both maps of one document render. The only mutable state of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayoutState {
    pub text: TextContentMap,
    pub figures: FigureMap,
}

impl DocumentLayoutState {
    pub fn document_id(&self) -> &DocumentId {
        self.text.document_id()
    }

    /// Both maps belong to the same document.
    pub fn is_consistent(&self) -> bool {
        self.text.document_id() == self.figures.document_id()
    }

    pub fn load(store: &dyn StateStore) -> Result<Option<Self>, LayoutError> {
        crate::persistence::load_state(store)
    }

    pub fn save(&self, store: &dyn StateStore) -> Result<(), LayoutError> {
        crate::persistence::save_state(store, self)
    }

    /// Records an insertion and hands the most-recently-inserted flag over to
    /// `id`. A figure can be inserted at most once per render.
    pub fn mark_inserted(
        &mut self,
        id: &FigureId,
        page: usize,
        class: &TypesettingClass,
    ) -> Result<(), LayoutError> {
        match self.figures.get(id.as_str()) {
            None => return Err(LayoutError::UnknownFigure(id.to_string())),
            Some(f) if f.inserted => {
                return Err(LayoutError::Invariant(format!(
                    "figure '{id}' inserted twice in one render"
                )));
            }
            Some(_) => {}
        }
        for figure in self.figures.iter_mut() {
            figure.is_most_recently_inserted = false;
        }
        if let Some(figure) = self.figures.get_mut(id.as_str()) {
            figure.inserted = true;
            figure.is_most_recently_inserted = true;
            figure.page = Some(page);
            figure.placed_class = Some(class.clone());
        }
        Ok(())
    }

    /// The most recently inserted figure, if it sits on `page`.
    pub fn recent_on_page(&self, page: usize) -> Option<&FigureRecord> {
        self.figures
            .most_recent()
            .filter(|f| f.page == Some(page))
    }

    /// Clears `placed`, `inserted` and `isMostRecentlyInserted`, keeping the
    /// persisted overrides.
    pub fn clear_render_local(&mut self) {
        self.text.clear_render_local();
        for figure in self.figures.iter_mut() {
            figure.clear_render_local();
        }
    }
}

/// Where a render currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LayoutPhase {
    #[default]
    Unbuilt,
    Indexed,
    Evaluating(BlockId),
    Placing(BlockId),
    Persisted,
}

impl LayoutPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutPhase::Unbuilt => "unbuilt",
            LayoutPhase::Indexed => "indexed",
            LayoutPhase::Evaluating(_) => "evaluating",
            LayoutPhase::Placing(_) => "placing",
            LayoutPhase::Persisted => "persisted",
        }
    }

    /// A handler that flushed its render takes no further commits. A fresh
    /// handler resumes from stored state, so `Unbuilt` accepts them.
    pub fn accepts_commits(&self) -> bool {
        !matches!(self, LayoutPhase::Persisted)
    }
}
