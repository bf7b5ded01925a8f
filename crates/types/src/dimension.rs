//! Lengths as they appear in model presets.
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Px(f32),
    /// Percentage of the reference length (usually the content width).
    Percent(f32),
    #[default]
    Auto,
}

impl Dimension {
    /// Resolves the dimension against a reference length. `Auto` resolves to
    /// the reference itself.
    pub fn resolve(&self, reference: f32) -> f32 {
        match self {
            Dimension::Px(v) => *v,
            Dimension::Percent(p) => reference * p / 100.0,
            Dimension::Auto => reference,
        }
    }
}
