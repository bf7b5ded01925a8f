//! Per-journal model specs: the catalogue of typesetting classes and the
//! size preset each one maps to.

use crate::LayoutError;
use pagefig_types::{Dimension, TypesettingClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How text flows around a figure of a given class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WrapMode {
    /// Full stop in the text flow.
    #[default]
    Block,
    /// Floated to one side, text wraps around it.
    Float,
    /// Wider than the text column, reaching into the margin.
    Overmargin,
    /// Pinned to the top of the page.
    PageTop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreset {
    /// Image width, resolved against the content width.
    pub width: Dimension,
    /// Maximum image height, resolved against the content height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Dimension>,
    #[serde(default)]
    pub wrap: WrapMode,
}

impl ModelPreset {
    pub fn new(width: Dimension, wrap: WrapMode) -> Self {
        Self {
            width,
            height: None,
            wrap,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelSpec {
    presets: BTreeMap<TypesettingClass, ModelPreset>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::default_catalogue()
    }
}

impl ModelSpec {
    pub fn new(presets: BTreeMap<TypesettingClass, ModelPreset>) -> Self {
        Self { presets }
    }

    /// The built-in catalogue used when no journal spec is supplied.
    pub fn default_catalogue() -> Self {
        let max_height = Some(Dimension::Percent(60.0));
        let entries = [
            ("inline", Dimension::Percent(100.0), WrapMode::Block),
            ("medium", Dimension::Percent(66.0), WrapMode::Block),
            ("inset", Dimension::Percent(75.0), WrapMode::Block),
            ("float", Dimension::Percent(50.0), WrapMode::Float),
            ("float-narrow", Dimension::Percent(33.0), WrapMode::Float),
            ("overmargin", Dimension::Percent(130.0), WrapMode::Overmargin),
            ("page-top", Dimension::Percent(100.0), WrapMode::PageTop),
        ];
        let presets = entries
            .into_iter()
            .map(|(name, width, wrap)| {
                (
                    TypesettingClass::new(name),
                    ModelPreset {
                        width,
                        height: max_height,
                        wrap,
                    },
                )
            })
            .collect();
        Self { presets }
    }

    /// Adds or replaces the preset of one class.
    pub fn with_preset(mut self, class: impl Into<TypesettingClass>, preset: ModelPreset) -> Self {
        self.presets.insert(class.into(), preset);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let spec: Self = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.presets.is_empty() {
            return Err(LayoutError::Config("model spec has no classes".to_string()));
        }
        for class in self.presets.keys() {
            let name = class.as_str();
            if name.is_empty() || name.contains('#') || name == TypesettingClass::NONE_TOKEN {
                return Err(LayoutError::Config(format!(
                    "invalid typesetting class name '{name}'"
                )));
            }
        }
        Ok(())
    }

    pub fn preset(&self, class: &TypesettingClass) -> Option<&ModelPreset> {
        self.presets.get(class)
    }

    pub fn contains(&self, class: &TypesettingClass) -> bool {
        self.presets.contains_key(class)
    }

    /// Wrap mode of a class; unknown classes behave like block figures.
    pub fn wrap_of(&self, class: &TypesettingClass) -> WrapMode {
        self.preset(class).map(|p| p.wrap).unwrap_or_default()
    }

    pub fn classes(&self) -> impl Iterator<Item = &TypesettingClass> {
        self.presets.keys()
    }
}
