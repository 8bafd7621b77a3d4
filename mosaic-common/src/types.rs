use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use strum::{EnumString, IntoStaticStr, VariantNames};

/// An 8-bit RGBA color quadruple, alpha in 0..=255
pub type Rgba = [u8; 4];

/// Identifier of a sub-visualization (slice) inside a composite
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SliceId(pub i64);

impl Display for SliceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SliceId {
    fn from(value: i64) -> Self {
        SliceId(value)
    }
}

/// The visualization kind declared by a slice
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    VariantNames,
)]
pub enum VizKind {
    #[serde(rename = "deck_scatter")]
    #[strum(serialize = "deck_scatter")]
    Scatter,
    #[serde(rename = "deck_polygon")]
    #[strum(serialize = "deck_polygon")]
    Polygon,
    #[serde(rename = "deck_text")]
    #[strum(serialize = "deck_text")]
    Text,
    #[default]
    #[serde(other)]
    #[strum(serialize = "other")]
    Other,
}

impl VizKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether features of this kind are run through the playback/category filters
    pub fn is_point_kind(&self) -> bool {
        matches!(self, VizKind::Scatter | VizKind::Text)
    }
}

/// Color picker value as stored in form data
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorPicker {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

impl Default for ColorPicker {
    fn default() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 1.0,
        }
    }
}

impl Hash for ColorPicker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        [self.r, self.g, self.b].hash(state);
        OrderedFloat::from(self.a).hash(state);
    }
}

impl ColorPicker {
    /// Alpha scaled to 0..=255
    pub fn alpha_u8(&self) -> u8 {
        (self.a.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    pub fn to_rgba(&self) -> Rgba {
        [self.r, self.g, self.b, self.alpha_u8()]
    }
}

/// Map viewport. Changes to the viewport never trigger a reload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    pub bearing: f64,
    pub pitch: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            zoom: 1.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_viz_kind_names() {
        assert_eq!(VizKind::from_str("deck_scatter").unwrap(), VizKind::Scatter);
        assert_eq!(VizKind::Text.as_str(), "deck_text");

        let kind: VizKind = serde_json::from_str("\"deck_arc\"").unwrap();
        assert_eq!(kind, VizKind::Other);
        let kind: VizKind = serde_json::from_str("\"deck_polygon\"").unwrap();
        assert_eq!(kind, VizKind::Polygon);
    }

    #[test]
    fn test_color_picker_alpha() {
        let c = ColorPicker {
            r: 10,
            g: 20,
            b: 30,
            a: 0.5,
        };
        assert_eq!(c.to_rgba(), [10, 20, 30, 128]);
        assert_eq!(ColorPicker::default().to_rgba(), [0, 0, 0, 255]);
    }
}
