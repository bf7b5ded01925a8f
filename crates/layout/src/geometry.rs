//! Geometry estimation.
//!
//! Figures are inserted by the engine itself, so their size has to be known
//! before the host renders them. Everything here is a pure function of the
//! declared metrics and the available page area.

use crate::config::{EngineConfig, TextMetrics};
use crate::model::{ModelPreset, WrapMode};
use pagefig_types::{Size, TypesettingClass};
use serde::{Deserialize, Serialize};

/// The size-relevant facts about a figure, computed once at index build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigureGeometry {
    pub natural_width: f32,
    pub natural_height: f32,
    pub caption_chars: usize,
    /// The class the markup asked for (or the configured default).
    pub assigned_class: TypesettingClass,
}

impl FigureGeometry {
    /// Height over width. Degenerate images are treated as square.
    pub fn aspect_ratio(&self) -> f32 {
        if self.natural_width > 0.0 && self.natural_height > 0.0 {
            self.natural_height / self.natural_width
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureEstimate {
    pub image: Size,
    pub caption_lines: usize,
    pub caption_height: f32,
    /// Image, caption and vertical margins.
    pub total_height: f32,
    /// Share of the content width the figure occupies.
    pub width_fraction: f32,
    pub wrap: WrapMode,
}

/// Number of lines `chars` characters need at `width` px.
pub fn line_count(chars: usize, width: f32, metrics: &TextMetrics) -> usize {
    if chars == 0 {
        return 0;
    }
    let per_line = (width / metrics.avg_char_px()).floor().max(1.0) as usize;
    chars.div_ceil(per_line)
}

/// Predicted height of `chars` characters of running text set at `width` px.
pub fn estimate_text_height(chars: usize, width: f32, metrics: &TextMetrics) -> f32 {
    line_count(chars, width, metrics) as f32 * metrics.line_height
}

/// Predicted rendered size of a figure of the given class.
///
/// `content` is the page content area; a preset width is resolved against its
/// width, a preset max height against its height.
pub fn estimate_figure(
    geometry: &FigureGeometry,
    preset: Option<&ModelPreset>,
    config: &EngineConfig,
    content: Size,
) -> FigureEstimate {
    let (width, max_height, wrap) = match preset {
        Some(p) => (
            p.width.resolve(content.width),
            p.height.map(|h| h.resolve(content.height)),
            p.wrap,
        ),
        None => (content.width, None, WrapMode::Block),
    };

    let mut image = Size::new(width, width * geometry.aspect_ratio());
    if let Some(max_height) = max_height {
        image = image.clamp_height(max_height);
    }

    let caption_width = image.width.max(1.0);
    let caption_lines = line_count(geometry.caption_chars, caption_width, &config.caption_text);
    let caption_height = caption_lines as f32 * config.caption_text.line_height;
    let total_height =
        image.height + caption_height + config.figure_margin.top + config.figure_margin.bottom;

    let width_fraction = if content.width > 0.0 {
        image.width / content.width
    } else {
        1.0
    };

    FigureEstimate {
        image,
        caption_lines,
        caption_height,
        total_height,
        width_fraction,
        wrap,
    }
}

/// Negative bottom margin that stops the host's text reflow from leaving a
/// gap under a floated figure. Zero for anything that does not float.
pub fn float_compensation(estimate: &FigureEstimate, caption: &TextMetrics) -> f32 {
    if estimate.wrap != WrapMode::Float {
        return 0.0;
    }
    -(estimate.caption_lines as f32 * caption.line_height * estimate.width_fraction)
}
