use crate::types::Rgba;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Geometry carried by a feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// `[longitude, latitude]`
    Point([f64; 2]),
    /// Exterior ring as `[longitude, latitude]` pairs
    Polygon(Vec<[f64; 2]>),
}

/// A single record of a slice payload.
///
/// The well-known fields (`cat_color`, `__timestamp`, `name`, `color`) are lifted out of the
/// properties bag; everything else (metric values, tooltip columns, ...) stays in `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFeature", into = "RawFeature")]
pub struct Feature {
    pub geometry: Option<FeatureGeometry>,
    pub category: Option<String>,
    pub timestamp: Option<i64>,
    pub name: Option<String>,
    pub color: Option<Rgba>,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new_point(position: [f64; 2]) -> Self {
        Self {
            geometry: Some(FeatureGeometry::Point(position)),
            ..Default::default()
        }
    }

    pub fn new_polygon(ring: Vec<[f64; 2]>) -> Self {
        Self {
            geometry: Some(FeatureGeometry::Polygon(ring)),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Numeric value of a metric column, if present and numeric
    pub fn metric(&self, label: &str) -> Option<f64> {
        match self.properties.get(label)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<[f64; 2]> {
        match &self.geometry {
            Some(FeatureGeometry::Point(p)) => Some(*p),
            _ => None,
        }
    }
}

/// The feature list of a payload, plus whatever else the backend sent along with it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self {
            features,
            extra: Map::new(),
        }
    }
}

/// Raw response of a slice query, `{"data": {"features": [...]}, ...}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlicePayload {
    #[serde(default)]
    pub data: FeatureCollection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SlicePayload {
    pub fn from_features(features: Vec<Feature>) -> Self {
        Self {
            data: features.into(),
            extra: Map::new(),
        }
    }

    pub fn features(&self) -> &[Feature] {
        &self.data.features
    }

    /// A payload with the same metadata but a replaced feature list
    pub fn with_features(&self, features: Vec<Feature>) -> Self {
        Self {
            data: FeatureCollection {
                features,
                extra: self.data.extra.clone(),
            },
            extra: self.extra.clone(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawFeature {
    #[serde(default, alias = "coordinates", skip_serializing_if = "Option::is_none")]
    position: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    polygon: Option<Vec<[f64; 2]>>,
    #[serde(
        default,
        rename = "cat_color",
        deserialize_with = "deserialize_label",
        skip_serializing_if = "Option::is_none"
    )]
    category: Option<String>,
    #[serde(
        default,
        rename = "__timestamp",
        deserialize_with = "deserialize_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    timestamp: Option<i64>,
    #[serde(
        default,
        deserialize_with = "deserialize_label",
        skip_serializing_if = "Option::is_none"
    )]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<Rgba>,
    #[serde(flatten)]
    properties: Map<String, Value>,
}

impl From<RawFeature> for Feature {
    fn from(raw: RawFeature) -> Self {
        let geometry = match (raw.position, raw.polygon) {
            (Some(p), _) => Some(FeatureGeometry::Point(p)),
            (None, Some(ring)) => Some(FeatureGeometry::Polygon(ring)),
            (None, None) => None,
        };
        Self {
            geometry,
            category: raw.category,
            timestamp: raw.timestamp,
            name: raw.name,
            color: raw.color,
            properties: raw.properties,
        }
    }
}

impl From<Feature> for RawFeature {
    fn from(feature: Feature) -> Self {
        let (position, polygon) = match feature.geometry {
            Some(FeatureGeometry::Point(p)) => (Some(p), None),
            Some(FeatureGeometry::Polygon(ring)) => (None, Some(ring)),
            None => (None, None),
        };
        Self {
            position,
            polygon,
            category: feature.category,
            timestamp: feature.timestamp,
            name: feature.name,
            color: feature.color,
            properties: feature.properties,
        }
    }
}

/// Category and name columns may come back as numbers or booleans, normalize to strings
fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Timestamps are epoch milliseconds, possibly serialized as floats
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.parse::<i64>().ok(),
        _ => None,
    })
}
