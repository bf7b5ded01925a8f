pub mod dimension;
pub mod geometry;
pub mod ids;

pub use dimension::Dimension;
pub use geometry::{Rect, Size};
pub use ids::{BlockId, DocumentId, FigureId, TypesettingClass};
