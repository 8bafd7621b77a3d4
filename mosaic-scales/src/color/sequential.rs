use std::collections::HashMap;

use crate::color::parse_css_color;
use crate::error::MosaicScaleError;
use lazy_static::lazy_static;
use mosaic_common::types::Rgba;
use palette::{Mix, Srgba};

pub const DEFAULT_SEQUENTIAL_SCHEME: &str = "blue_white_yellow";

lazy_static! {
    static ref BUILTIN_SCHEMES: HashMap<&'static str, &'static [&'static str]> = {
        let mut schemes: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        schemes.insert("blue_white_yellow", &["#00d1c1", "white", "#ffb400"]);
        schemes.insert("fire", &["white", "yellow", "red", "black"]);
        schemes.insert("white_black", &["white", "black"]);
        schemes.insert("black_white", &["black", "white"]);
        schemes.insert(
            "dark_blue",
            &["#EBF5F8", "#6BB1CC", "#357E9B", "#1B4150", "#092935"],
        );
        schemes.insert("pink_grey", &["#E0067F", "white", "#808080"]);
        schemes.insert("greens", &["#ffffcc", "#78c679", "#006837"]);
        schemes.insert("purples", &["#f2f0f7", "#9e9ac8", "#54278f"]);
        schemes.insert("oranges", &["#fef0d9", "#fc8d59", "#b30000"]);
        schemes.insert(
            "red_yellow_blue",
            &["#d7191c", "#fdae61", "#ffffbf", "#abd9e9", "#2c7bb6"],
        );
        schemes
    };
}

/// Evenly spaced color stops interpolated in sRGB space
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialScheme {
    pub id: String,
    pub colors: Vec<Rgba>,
}

impl SequentialScheme {
    pub fn try_new(id: impl Into<String>, colors: &[&str]) -> Result<Self, MosaicScaleError> {
        let colors = colors
            .iter()
            .map(|c| parse_css_color(c))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_colors(id, colors)
    }

    pub fn from_colors(id: impl Into<String>, colors: Vec<Rgba>) -> Result<Self, MosaicScaleError> {
        if colors.is_empty() {
            return Err(MosaicScaleError::EmptyDomain);
        }
        Ok(Self {
            id: id.into(),
            colors,
        })
    }

    pub fn builtin(id: Option<&str>) -> Result<Self, MosaicScaleError> {
        let id = id.unwrap_or(DEFAULT_SEQUENTIAL_SCHEME);
        let colors = BUILTIN_SCHEMES
            .get(id)
            .ok_or_else(|| MosaicScaleError::UnknownColorScheme(id.to_string()))?;
        Self::try_new(id, colors)
    }

    /// Color at normalized position `t`, clamped to [0, 1]
    pub fn interpolate(&self, t: f64) -> Rgba {
        interpolate_rgba(&self.colors, t)
    }
}

/// Piecewise-linear interpolation over evenly spaced color stops
pub fn interpolate_rgba(colors: &[Rgba], t: f64) -> Rgba {
    if colors.is_empty() {
        return [0, 0, 0, 0];
    }
    let scale_factor = (colors.len() - 1) as f32;
    let t = if t.is_finite() { t as f32 } else { 0.0 };
    let continuous_index = (t * scale_factor).clamp(0.0, scale_factor);
    let lower_index = continuous_index.floor() as usize;
    let upper_index = continuous_index.ceil() as usize;

    if lower_index == upper_index {
        return colors[lower_index];
    }

    let lower = to_srgba(&colors[lower_index]);
    let upper = to_srgba(&colors[upper_index]);
    let mixed = lower.mix(upper, continuous_index - lower_index as f32);
    let (r, g, b, a) = mixed.into_format::<u8, u8>().into_components();
    [r, g, b, a]
}

fn to_srgba(color: &Rgba) -> Srgba {
    Srgba::new(color[0], color[1], color[2], color[3]).into_format::<f32, f32>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, [0, 0, 0, 255])]
    #[case(1.0, [255, 255, 255, 255])]
    #[case(0.5, [128, 128, 128, 255])]
    #[case(-3.0, [0, 0, 0, 255])]
    #[case(7.0, [255, 255, 255, 255])]
    fn test_interpolate_black_white(#[case] t: f64, #[case] expected: Rgba) {
        let scheme = SequentialScheme::builtin(Some("black_white")).unwrap();
        assert_eq!(scheme.interpolate(t), expected);
    }

    #[test]
    fn test_interpolate_hits_middle_stop() -> Result<(), MosaicScaleError> {
        let scheme = SequentialScheme::builtin(None)?;
        assert_eq!(scheme.interpolate(0.5), [255, 255, 255, 255]);
        Ok(())
    }
}
