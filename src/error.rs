// src/error.rs
use pagefig_layout::LayoutError;
use pagefig_traits::StoreError;
use thiserror::Error;

/// Everything that can stop a render or the command-line tool.
#[derive(Error, Debug)]
pub enum PagefigError {
    #[error("Layout failed: {0}")]
    Layout(#[from] LayoutError),

    #[error("State store failed: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    Input(String),
}
