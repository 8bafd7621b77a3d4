use mosaic_common::types::Rgba;
use mosaic_scales::bucket::RANGE_DELIMITER;
use mosaic_scales::color::css_rgba;
use mosaic_scales::format::NumberFormat;
use std::str::FromStr;
use strum::{EnumString, IntoStaticStr};

use crate::category::CategorySet;
use crate::error::MosaicGuidesError;

pub const ENABLED_ICON: char = '\u{25FC}';
pub const DISABLED_ICON: char = '\u{25FB}';

/// Corner of the map a legend is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, IntoStaticStr)]
pub enum LegendPosition {
    #[strum(serialize = "tl")]
    TopLeft,
    #[strum(serialize = "tr")]
    TopRight,
    #[strum(serialize = "bl")]
    BottomLeft,
    #[strum(serialize = "br")]
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAnchor {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAnchor {
    Left,
    Right,
}

impl LegendPosition {
    /// Parse a configured position, `None` and `"none"` mean the legend is hidden
    pub fn parse(position: Option<&str>) -> Result<Option<Self>, MosaicGuidesError> {
        match position {
            None | Some("none") => Ok(None),
            Some(p) => LegendPosition::from_str(p)
                .map(Some)
                .map_err(|_| MosaicGuidesError::InvalidLegendPosition(p.to_string())),
        }
    }

    pub fn vertical(&self) -> VerticalAnchor {
        match self {
            LegendPosition::TopLeft | LegendPosition::TopRight => VerticalAnchor::Top,
            LegendPosition::BottomLeft | LegendPosition::BottomRight => VerticalAnchor::Bottom,
        }
    }

    pub fn horizontal(&self) -> HorizontalAnchor {
        match self {
            LegendPosition::TopLeft | LegendPosition::BottomLeft => HorizontalAnchor::Left,
            LegendPosition::TopRight | LegendPosition::BottomRight => HorizontalAnchor::Right,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub key: String,
    pub label: String,
    pub icon: char,
    pub color: Rgba,
    pub css_color: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: Option<String>,
    /// `None` for inline legends, which are laid out by their container
    pub position: Option<LegendPosition>,
    pub entries: Vec<LegendEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendConfig {
    pub title: Option<String>,
    pub position: Option<LegendPosition>,
    /// Number format applied to numeric keys and to both ends of range keys
    pub format: Option<String>,
    /// Inline legends are stacked next to each other rather than anchored to a corner
    pub inline: bool,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            title: None,
            position: Some(LegendPosition::TopRight),
            format: None,
            inline: false,
        }
    }
}

impl LegendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn position(mut self, position: Option<LegendPosition>) -> Self {
        self.position = position;
        self
    }

    pub fn format(mut self, format: Option<String>) -> Self {
        self.format = format;
        self
    }

    pub fn inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }
}

/// Build the legend for a category set, or `None` when nothing should be shown
pub fn make_legend(
    categories: &CategorySet,
    config: &LegendConfig,
) -> Result<Option<Legend>, MosaicGuidesError> {
    if categories.is_empty() || (!config.inline && config.position.is_none()) {
        return Ok(None);
    }

    let format = config
        .format
        .as_deref()
        .filter(|f| !f.is_empty())
        .map(NumberFormat::parse)
        .transpose()?;

    let entries = categories
        .iter()
        .map(|(key, state)| LegendEntry {
            key: key.to_string(),
            label: format_label(key, format.as_ref()),
            icon: if state.enabled {
                ENABLED_ICON
            } else {
                DISABLED_ICON
            },
            color: state.color,
            css_color: css_rgba(&state.color),
            enabled: state.enabled,
        })
        .collect();

    Ok(Some(Legend {
        title: config.title.clone(),
        position: if config.inline { None } else { config.position },
        entries,
    }))
}

fn format_label(key: &str, format: Option<&NumberFormat>) -> String {
    let Some(format) = format else {
        return key.to_string();
    };
    match key.split_once(RANGE_DELIMITER) {
        Some((lower, upper)) => format!(
            "{}{RANGE_DELIMITER}{}",
            format_value(lower, format),
            format_value(upper, format)
        ),
        None => format_value(key, format),
    }
}

// Non-numeric keys are shown as-is
fn format_value(value: &str, format: &NumberFormat) -> String {
    match value.trim().parse::<f64>() {
        Ok(v) => format.format(v),
        Err(_) => value.to_string(),
    }
}
