use std::collections::HashMap;

use crate::color::parse_css_color;
use crate::error::MosaicScaleError;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use mosaic_common::types::Rgba;

pub const DEFAULT_CATEGORICAL_SCHEME: &str = "bnbColors";

const BNB_COLORS: &[&str] = &[
    "#ff5a5f", "#7b0051", "#007A87", "#00d1c1", "#8ce071", "#ffb400", "#b4a76c", "#ff8083",
    "#cc0086", "#00a1b3", "#00ffeb", "#bbedab", "#ffd266", "#cbc29a", "#ff3339", "#ff1ab1",
    "#005c66", "#00b3a5", "#55d12e", "#b37e00", "#988b4e",
];

const SUPERSET_COLORS: &[&str] = &[
    "#1FA8C9", "#454E7C", "#5AC189", "#FF7F44", "#666666", "#E04355", "#FCC700", "#A868B7",
    "#3CCCCB", "#A38F79", "#8FD3E4", "#A1A6BD", "#ACE1C4", "#FEC0A1", "#B2B2B2", "#EFA1AA",
    "#FDE380", "#D3B3DA", "#9EE5E5", "#D1C6BC",
];

const D3_CATEGORY_10: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

const GOOGLE_CATEGORY_10C: &[&str] = &[
    "#3366cc", "#dc3912", "#ff9900", "#109618", "#990099", "#0099c6", "#dd4477", "#66aa00",
    "#b82e2e", "#316395",
];

lazy_static! {
    static ref BUILTIN_SCHEMES: HashMap<&'static str, &'static [&'static str]> = {
        let mut schemes = HashMap::new();
        schemes.insert("bnbColors", BNB_COLORS);
        schemes.insert("supersetColors", SUPERSET_COLORS);
        schemes.insert("d3Category10", D3_CATEGORY_10);
        schemes.insert("googleCategory10c", GOOGLE_CATEGORY_10C);
        schemes
    };
}

/// A named list of colors cycled through by an ordinal color scale
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalScheme {
    pub id: String,
    pub colors: Vec<Rgba>,
}

impl CategoricalScheme {
    pub fn try_new(id: impl Into<String>, colors: &[&str]) -> Result<Self, MosaicScaleError> {
        let colors = colors
            .iter()
            .map(|c| parse_css_color(c))
            .collect::<Result<Vec<_>, _>>()?;
        if colors.is_empty() {
            return Err(MosaicScaleError::EmptyDomain);
        }
        Ok(Self {
            id: id.into(),
            colors,
        })
    }

    /// Look up a built-in scheme, `None` selects the default scheme
    pub fn builtin(id: Option<&str>) -> Result<Self, MosaicScaleError> {
        let id = id.unwrap_or(DEFAULT_CATEGORICAL_SCHEME);
        let colors = BUILTIN_SCHEMES
            .get(id)
            .ok_or_else(|| MosaicScaleError::UnknownColorScheme(id.to_string()))?;
        Self::try_new(id, colors)
    }

    pub fn builtin_ids() -> Vec<&'static str> {
        let mut ids: Vec<_> = BUILTIN_SCHEMES.keys().copied().collect();
        ids.sort();
        ids
    }
}

/// Ordinal scale with an implicit domain.
///
/// Each new key is assigned the next color of the scheme (cycling), and keeps that color for
/// the lifetime of the scale. Feeding keys in the same order always yields the same colors.
#[derive(Debug, Clone)]
pub struct OrdinalColorScale {
    scheme: CategoricalScheme,
    mapping: IndexMap<String, Rgba>,
}

impl OrdinalColorScale {
    pub fn new(scheme: CategoricalScheme) -> Self {
        Self {
            scheme,
            mapping: IndexMap::new(),
        }
    }

    pub fn scheme(&self) -> &CategoricalScheme {
        &self.scheme
    }

    /// Keys seen so far, in assignment order
    pub fn domain(&self) -> Vec<String> {
        self.mapping.keys().cloned().collect()
    }

    pub fn color(&mut self, key: &str) -> Rgba {
        if let Some(color) = self.mapping.get(key) {
            return *color;
        }
        let color = self.scheme.colors[self.mapping.len() % self.scheme.colors.len()];
        self.mapping.insert(key.to_string(), color);
        color
    }
}
