use thiserror::Error;

use pagefig_traits::StoreError;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Layout state could not be persisted: {0}")]
    Persistence(#[from] StoreError),
    #[error("Stored layout state is corrupt: {0}")]
    CorruptState(String),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("Hook called out of order: {0}")]
    OutOfOrder(String),
    #[error("Unknown figure '{0}'")]
    UnknownFigure(String),
    #[error("Unknown text block '{0}'")]
    UnknownBlock(String),
    #[error("Layout invariant violated: {0}")]
    Invariant(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub mod config;
pub mod constellation;
pub mod context;
pub mod fit;
pub mod geometry;
pub mod handler;
pub mod hooks;
pub mod host;
pub mod index;
pub mod lookahead;
pub mod model;
pub mod persistence;
pub mod placement;
pub mod prepare;
pub mod state;
pub mod util;

// Re-exports for convenience
pub use self::config::{EngineConfig, FigureMargin, TextMetrics};
pub use self::constellation::{ConstellationEntry, ConstellationTable, Decision};
pub use self::context::{NodeCategory, PageContext};
pub use self::handler::FigureLayoutHandler;
pub use self::hooks::{PaginationHooks, PlacedFigure, RenderReport};
pub use self::host::{
    CompletedPage, ElementRole, FigurePlacement, HostError, HostLayout, PageEntry, PageMetrics,
    PrecedingElement, RenderedKind, RenderedNode,
};
pub use self::index::{FigureRecord, PositionClass, TextBlockRecord};
pub use self::model::{ModelPreset, ModelSpec, WrapMode};
pub use self::state::{DocumentLayoutState, LayoutPhase};

#[cfg(test)]
mod test_utils;
