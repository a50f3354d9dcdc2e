//! Export styling
//!
//! Colors, stroke widths and note geometry used when baking annotations into
//! the page. Every field has a default, so a partial TOML/JSON style only
//! needs the keys it overrides.

use crate::geometry::Color;
use serde::{Deserialize, Serialize};

/// Accent green used by strokes, highlights and selections
pub const ACCENT: Color = Color::rgb(0.0, 0.65, 0.33);
/// Ink used for placed text and note bodies
pub const INK: Color = Color::rgb(0.13, 0.17, 0.23);
pub const NOTE_FILL: Color = Color::rgb(1.0, 0.93, 0.6);
pub const NOTE_BORDER: Color = Color::rgb(0.9, 0.8, 0.4);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportStyle {
    pub draw_color: Color,
    pub stroke_width: f64,
    /// Segments shorter than this are dropped from freehand strokes
    pub min_segment_length: f64,

    pub accent_color: Color,
    pub highlight_fill_opacity: f64,
    pub highlight_border_opacity: f64,
    pub highlight_border_width: f64,
    pub select_border_width: f64,
    pub select_dash: Vec<f64>,

    pub text_color: Color,
    pub text_size: f64,

    pub note_fill: Color,
    pub note_border: Color,
    pub note_border_width: f64,
    pub note_width: f64,
    pub note_height: f64,
    pub note_font_size: f64,
    pub note_padding: f64,
    pub note_wrap_width: f64,
    /// Distance from the note's top edge to the first baseline
    pub note_first_baseline: f64,
    pub note_line_height: f64,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            draw_color: ACCENT,
            stroke_width: 2.0,
            min_segment_length: 0.5,

            accent_color: ACCENT,
            highlight_fill_opacity: 0.25,
            highlight_border_opacity: 0.5,
            highlight_border_width: 1.0,
            select_border_width: 2.0,
            select_dash: vec![6.0, 4.0],

            text_color: INK,
            text_size: 14.0,

            note_fill: NOTE_FILL,
            note_border: NOTE_BORDER,
            note_border_width: 1.0,
            note_width: 120.0,
            note_height: 60.0,
            note_font_size: 11.0,
            note_padding: 6.0,
            note_wrap_width: 110.0,
            note_first_baseline: 16.0,
            note_line_height: 14.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_style_keeps_defaults() {
        let style: ExportStyle =
            serde_json::from_str(r##"{"text_size": 18, "draw_color": "#ff0000"}"##).unwrap();
        assert_eq!(style.text_size, 18.0);
        assert_eq!(style.draw_color, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(style.note_wrap_width, 110.0);
        assert_eq!(style.select_dash, vec![6.0, 4.0]);
    }
}
