//! Export style loading
//!
//! The style file is TOML whose top-level keys are `ExportStyle` fields.
//! Omitted keys keep their defaults:
//!
//! ```toml
//! draw_color = "#d00000"
//! stroke_width = 3.0
//! select_dash = [4.0, 2.0]
//! ```

use anyhow::Context;
use pdfink_core::ExportStyle;
use std::path::Path;

/// Load an export style from a TOML file
pub async fn load_style<P: AsRef<Path>>(path: P) -> anyhow::Result<ExportStyle> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read style file: {}", path.display()))?;
    parse_style(&content).with_context(|| format!("Invalid style file: {}", path.display()))
}

/// Parse an export style from a TOML string
pub fn parse_style(s: &str) -> anyhow::Result<ExportStyle> {
    let style: ExportStyle = toml::from_str(s).context("Failed to parse style TOML")?;

    anyhow::ensure!(style.stroke_width > 0.0, "stroke_width must be positive");
    anyhow::ensure!(
        style.note_wrap_width > 0.0,
        "note_wrap_width must be positive"
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&style.highlight_fill_opacity)
            && (0.0..=1.0).contains(&style.highlight_border_opacity),
        "highlight opacities must be within 0..=1"
    );

    Ok(style)
}
