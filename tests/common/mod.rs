pub mod fixtures;

use pagefig::layout::{
    CompletedPage, DocumentLayoutState, EngineConfig, FigureLayoutHandler, FigureMargin,
    HostLayout, LayoutError, ModelPreset, ModelSpec, PaginationHooks, RenderReport,
    RenderedNode, WrapMode,
};
use pagefig::idf::{ContentTree, NodeMetadata};
use pagefig::traits::{StateStore, StoreError};
use pagefig::types::Dimension;
use pagefig::{PageGeometry, RenderSettings, RenderedDocument};
use std::sync::Arc;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Square "medium" figures without caption come out 175px tall.
pub fn scenario_settings(page_height: f32) -> RenderSettings {
    RenderSettings {
        config: EngineConfig {
            figure_margin: FigureMargin {
                top: 10.0,
                bottom: 15.0,
            },
            default_class: "medium".into(),
            ..EngineConfig::viewer()
        },
        model: ModelSpec::default_catalogue()
            .with_preset("medium", ModelPreset::new(Dimension::Px(150.0), WrapMode::Block)),
        table: None,
        geometry: PageGeometry::new(794.0, page_height),
    }
}

/// Wraps a handler and snapshots the stored state along the way.
pub struct RecordingHooks {
    pub inner: FigureLayoutHandler,
    /// State right after each node commit, keyed by node id.
    pub after_commit: Vec<(String, DocumentLayoutState)>,
    /// State just before render-local flags were cleared.
    pub final_state: Option<DocumentLayoutState>,
}

impl RecordingHooks {
    pub fn new(inner: FigureLayoutHandler) -> Self {
        Self {
            inner,
            after_commit: Vec::new(),
            final_state: None,
        }
    }

    pub fn state_after(&self, node_id: &str) -> Option<&DocumentLayoutState> {
        self.after_commit
            .iter()
            .find(|(id, _)| id == node_id)
            .map(|(_, s)| s)
    }

    pub fn final_state(&self) -> &DocumentLayoutState {
        match &self.final_state {
            Some(state) => state,
            None => panic!("all_rendered was never called"),
        }
    }
}

impl PaginationHooks for RecordingHooks {
    fn before_parse(&mut self, tree: ContentTree) -> Result<ContentTree, LayoutError> {
        self.inner.before_parse(tree)
    }

    fn after_parse(&mut self, tree: &ContentTree) -> Result<(), LayoutError> {
        self.inner.after_parse(tree)
    }

    fn node_commit(
        &mut self,
        source: &mut NodeMetadata,
        rendered: &mut RenderedNode,
        host: &mut dyn HostLayout,
    ) -> Result<(), LayoutError> {
        self.inner.node_commit(source, rendered, host)?;
        self.after_commit
            .push((rendered.node_id.clone(), self.inner.load()?));
        Ok(())
    }

    fn page_complete(&mut self, page: &mut CompletedPage) -> Result<(), LayoutError> {
        self.inner.page_complete(page)
    }

    fn all_rendered(&mut self, pages: &[CompletedPage]) -> Result<RenderReport, LayoutError> {
        self.final_state = Some(self.inner.load()?);
        self.inner.all_rendered(pages)
    }
}

/// Builds a brand-new handler for every callback, as a host that tears the
/// engine down between calls would.
pub struct EphemeralHooks {
    pub settings: RenderSettings,
    pub store: Arc<dyn StateStore>,
}

impl EphemeralHooks {
    fn fresh(&self) -> FigureLayoutHandler {
        self.settings.handler(self.store.clone())
    }
}

impl PaginationHooks for EphemeralHooks {
    fn before_parse(&mut self, tree: ContentTree) -> Result<ContentTree, LayoutError> {
        self.fresh().before_parse(tree)
    }

    fn after_parse(&mut self, tree: &ContentTree) -> Result<(), LayoutError> {
        self.fresh().after_parse(tree)
    }

    fn node_commit(
        &mut self,
        source: &mut NodeMetadata,
        rendered: &mut RenderedNode,
        host: &mut dyn HostLayout,
    ) -> Result<(), LayoutError> {
        self.fresh().node_commit(source, rendered, host)
    }

    fn page_complete(&mut self, page: &mut CompletedPage) -> Result<(), LayoutError> {
        self.fresh().page_complete(page)
    }

    fn all_rendered(&mut self, pages: &[CompletedPage]) -> Result<RenderReport, LayoutError> {
        self.fresh().all_rendered(pages)
    }
}

/// Renders `tree` with a recording handler over `store`.
pub fn render_recorded(
    tree: ContentTree,
    settings: &RenderSettings,
    store: Arc<dyn StateStore>,
) -> Result<(RenderedDocument, RecordingHooks), pagefig::PagefigError> {
    let mut hooks = RecordingHooks::new(settings.handler(store));
    let doc = settings.paginator().render(tree, &mut hooks)?;
    Ok((doc, hooks))
}

/// A store that refuses every write.
#[derive(Debug, Default)]
pub struct ReadOnlyStore;

impl StateStore for ReadOnlyStore {
    fn read(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    fn write(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::WriteFailed {
            key: key.to_string(),
            message: "read-only".to_string(),
        })
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "read-only"
    }
}
