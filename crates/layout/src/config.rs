use crate::LayoutError;
use pagefig_types::TypesettingClass;
use serde::{Deserialize, Serialize};

/// Font metrics the geometry estimator uses to predict text heights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextMetrics {
    /// Font size in px.
    pub font_size: f32,
    /// Line box height in px.
    pub line_height: f32,
    /// Average glyph advance as a fraction of the font size.
    pub char_width: f32,
}

impl TextMetrics {
    pub fn avg_char_px(&self) -> f32 {
        self.font_size * self.char_width
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            line_height: 24.0,
            char_width: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FigureMargin {
    pub top: f32,
    pub bottom: f32,
}

impl Default for FigureMargin {
    fn default() -> Self {
        Self {
            top: 12.0,
            bottom: 12.0,
        }
    }
}

/// Tunables of the figure placement engine.
///
/// The viewer and the reports journal disagree on several thresholds, so
/// every one of them lives here instead of in the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Fraction of the remaining page space a figure may use. Must be in `(0, 1]`.
    pub safety_buffer: f32,
    /// Maximum number of figures on a single page.
    pub max_figures_per_page: usize,
    /// Number of text blocks past the current one scanned for references.
    pub lookahead_window: usize,
    /// Whether the lookahead may continue into the next section.
    pub cross_sections: bool,
    pub body_text: TextMetrics,
    pub caption_text: TextMetrics,
    pub figure_margin: FigureMargin,
    /// Class used for figures whose markup requests none.
    pub default_class: TypesettingClass,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::viewer()
    }
}

impl EngineConfig {
    /// Thresholds of the interactive viewer.
    pub fn viewer() -> Self {
        Self {
            safety_buffer: 0.90,
            max_figures_per_page: 3,
            lookahead_window: 3,
            cross_sections: false,
            body_text: TextMetrics::default(),
            caption_text: TextMetrics {
                font_size: 13.0,
                line_height: 18.0,
                char_width: 0.5,
            },
            figure_margin: FigureMargin::default(),
            default_class: TypesettingClass::new("inline"),
        }
    }

    /// Thresholds of the reports journal: less slack, fewer figures per page.
    pub fn reports() -> Self {
        Self {
            safety_buffer: 0.95,
            max_figures_per_page: 2,
            ..Self::viewer()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if !(self.safety_buffer > 0.0 && self.safety_buffer <= 1.0) {
            return Err(LayoutError::Config(format!(
                "safetyBuffer must be in (0, 1], got {}",
                self.safety_buffer
            )));
        }
        if self.max_figures_per_page == 0 {
            return Err(LayoutError::Config(
                "maxFiguresPerPage must be at least 1".to_string(),
            ));
        }
        for (name, m) in [("bodyText", &self.body_text), ("captionText", &self.caption_text)] {
            if m.font_size <= 0.0 || m.line_height <= 0.0 || m.char_width <= 0.0 {
                return Err(LayoutError::Config(format!(
                    "{name} metrics must be positive"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_differ_in_buffer() {
        assert_eq!(EngineConfig::viewer().safety_buffer, 0.90);
        assert_eq!(EngineConfig::reports().safety_buffer, 0.95);
        assert_eq!(EngineConfig::default(), EngineConfig::viewer());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"safetyBuffer": 0.8, "crossSections": true}"#)
            .unwrap();
        assert_eq!(config.safety_buffer, 0.8);
        assert!(config.cross_sections);
        assert_eq!(config.lookahead_window, 3);
        assert_eq!(config.default_class.as_str(), "inline");
    }

    #[test]
    fn test_rejects_out_of_range_buffer() {
        let err = EngineConfig::from_json(r#"{"safetyBuffer": 1.5}"#).unwrap_err();
        assert!(matches!(err, LayoutError::Config(_)));
    }

    #[test]
    fn test_rejects_zero_quota() {
        let config = EngineConfig {
            max_figures_per_page: 0,
            ..EngineConfig::viewer()
        };
        assert!(config.validate().is_err());
    }
}
