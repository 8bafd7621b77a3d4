pub mod categorical;
pub mod sequential;

use crate::error::MosaicScaleError;
use mosaic_common::types::Rgba;

/// Parse a CSS color string (`#ff5a5f`, `white`, `rgba(...)`) into an 8-bit RGBA quadruple
pub fn parse_css_color(color: &str) -> Result<Rgba, MosaicScaleError> {
    let c = color
        .parse::<css_color_parser::Color>()
        .map_err(|_| MosaicScaleError::InvalidColor(color.to_string()))?;
    Ok([c.r, c.g, c.b, (c.a.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Replace the alpha channel of a color
pub fn with_alpha(color: Rgba, alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

/// CSS representation used by legends, `rgba(r, g, b, a)` with 0..=255 channels
pub fn css_rgba(color: &Rgba) -> String {
    format!("rgba({}, {}, {}, {})", color[0], color[1], color[2], color[3])
}
