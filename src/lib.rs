//! Figure/text co-layout for one-pass pagination.
//!
//! The engine lives in `pagefig-layout`; this crate adds a reference host
//! paginator that drives its hooks, a file-backed state store and the
//! `pagefig` command-line tool.

pub mod error;
pub mod paginator;
pub mod store;

pub use error::PagefigError;
pub use paginator::{BreakAnalysis, PageGeometry, Paginator, RenderedDocument, check_fit};
pub use store::FileStateStore;

pub use pagefig_idf as idf;
pub use pagefig_layout as layout;
pub use pagefig_traits as traits;
pub use pagefig_types as types;

use pagefig_idf::ContentTree;
use pagefig_layout::{ConstellationTable, EngineConfig, FigureLayoutHandler, ModelSpec};
use pagefig_traits::StateStore;
use std::sync::Arc;

/// Everything needed to render articles with one engine configuration.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub config: EngineConfig,
    pub model: ModelSpec,
    /// Generated from `model` when absent.
    pub table: Option<ConstellationTable>,
    pub geometry: PageGeometry,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            config: EngineConfig::viewer(),
            model: ModelSpec::default_catalogue(),
            table: None,
            geometry: PageGeometry::default(),
        }
    }
}

impl RenderSettings {
    pub fn handler(&self, store: Arc<dyn StateStore>) -> FigureLayoutHandler {
        let table = self
            .table
            .clone()
            .unwrap_or_else(|| ConstellationTable::generate(&self.model));
        FigureLayoutHandler::new(self.config.clone(), self.model.clone(), table, store)
    }

    pub fn paginator(&self) -> Paginator {
        Paginator::new(self.geometry, self.config.body_text)
    }
}

/// Renders one article against `store`, carrying overrides from earlier
/// renders of the same document.
pub fn render_article(
    tree: ContentTree,
    settings: &RenderSettings,
    store: Arc<dyn StateStore>,
) -> Result<RenderedDocument, PagefigError> {
    settings.config.validate()?;
    settings.model.validate()?;
    let mut handler = settings.handler(store);
    settings.paginator().render(tree, &mut handler)
}
