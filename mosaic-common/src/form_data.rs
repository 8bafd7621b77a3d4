use crate::types::{ColorPicker, SliceId, VizKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CLUSTER_RADIUS: f64 = 40.0;
pub const DEFAULT_CLUSTER_MAX_ZOOM: u8 = 16;
pub const DEFAULT_NUM_BUCKETS: usize = 10;
pub const DEFAULT_OPACITY: f32 = 80.0;
pub const DEFAULT_GRANULARITY: &str = "P1D";

/// A metric is either a saved metric name or an ad-hoc metric object with a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricSpec {
    Named(String),
    Adhoc {
        label: String,
        #[serde(flatten)]
        definition: Map<String, Value>,
    },
}

impl MetricSpec {
    pub fn label(&self) -> &str {
        match self {
            MetricSpec::Named(name) => name,
            MetricSpec::Adhoc { label, .. } => label,
        }
    }
}

/// Form data of a single slice.
///
/// Field names follow the stored chart configuration, unknown fields are preserved in `extra`
/// so that the effective query sent to the backend is not lossy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormData {
    pub slice_id: Option<SliceId>,
    pub viz_type: VizKind,
    pub filters: Vec<Value>,
    pub extra_filters: Vec<Value>,
    pub dimension: Option<String>,
    pub metric: Option<MetricSpec>,
    pub color_picker: Option<ColorPicker>,
    pub color_picker_alt: Option<ColorPicker>,
    pub color_scheme: Option<String>,
    pub linear_color_scheme: Option<String>,
    pub opacity: f32,
    pub break_points: Vec<String>,
    pub num_buckets: Option<usize>,
    pub grade_colors: bool,
    pub enable_gradient: bool,
    pub per_zoom_level: bool,
    pub clusterize: bool,
    pub cluster_radius: f64,
    pub cluster_max_zoom: u8,
    pub time_grain_sqla: Option<String>,
    pub granularity: Option<String>,
    pub legend_position: Option<String>,
    pub legend_format: Option<String>,
    pub js_data_mutator: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for FormData {
    fn default() -> Self {
        Self {
            slice_id: None,
            viz_type: VizKind::default(),
            filters: vec![],
            extra_filters: vec![],
            dimension: None,
            metric: None,
            color_picker: None,
            color_picker_alt: None,
            color_scheme: None,
            linear_color_scheme: None,
            opacity: DEFAULT_OPACITY,
            break_points: vec![],
            num_buckets: None,
            grade_colors: false,
            enable_gradient: false,
            per_zoom_level: false,
            clusterize: false,
            cluster_radius: DEFAULT_CLUSTER_RADIUS,
            cluster_max_zoom: DEFAULT_CLUSTER_MAX_ZOOM,
            time_grain_sqla: None,
            granularity: None,
            legend_position: Some("tr".to_string()),
            legend_format: None,
            js_data_mutator: None,
            extra: Map::new(),
        }
    }
}

impl FormData {
    pub fn new(viz_type: VizKind) -> Self {
        Self {
            viz_type,
            ..Default::default()
        }
    }

    pub fn color_picker_or_default(&self) -> ColorPicker {
        self.color_picker.unwrap_or_default()
    }

    pub fn metric_label(&self) -> Option<&str> {
        self.metric.as_ref().map(|m| m.label())
    }

    /// Label used in legend titles: the grouping dimension, else the metric label
    pub fn legend_label(&self) -> Option<&str> {
        self.dimension.as_deref().or_else(|| self.metric_label())
    }

    /// Time grain token, `time_grain_sqla` taking precedence over `granularity`
    pub fn time_grain(&self) -> Option<&str> {
        self.time_grain_sqla
            .as_deref()
            .or(self.granularity.as_deref())
    }

    pub fn has_mutator(&self) -> bool {
        self.js_data_mutator
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// One sub-visualization of a composite, as declared in the composite configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceDescriptor {
    pub slice_id: SliceId,
    #[serde(default)]
    pub slice_name: String,
    #[serde(default)]
    pub form_data: FormData,
}

impl SliceDescriptor {
    pub fn new(slice_id: impl Into<SliceId>, slice_name: impl Into<String>, form_data: FormData) -> Self {
        let slice_id = slice_id.into();
        let mut form_data = form_data;
        form_data.slice_id = Some(slice_id);
        Self {
            slice_id,
            slice_name: slice_name.into(),
            form_data,
        }
    }
}

/// Top-level configuration of a multi-layer composite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    pub filters: Vec<Value>,
    pub extra_filters: Vec<Value>,
    #[serde(alias = "deck_slices")]
    pub slices: Vec<SliceDescriptor>,
    pub time_grain_sqla: Option<String>,
    pub granularity: Option<String>,
}

impl CompositeConfig {
    /// Granularity used for the shared playback window
    pub fn time_grain(&self) -> &str {
        self.time_grain_sqla
            .as_deref()
            .or(self.granularity.as_deref())
            .unwrap_or(DEFAULT_GRANULARITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_data_defaults() {
        let fd: FormData = serde_json::from_value(json!({
            "viz_type": "deck_text",
            "metric": {"label": "SUM(count)", "expressionType": "SIMPLE"},
            "row_limit": 5000
        }))
        .unwrap();

        assert_eq!(fd.viz_type, VizKind::Text);
        assert_eq!(fd.cluster_radius, DEFAULT_CLUSTER_RADIUS);
        assert_eq!(fd.cluster_max_zoom, DEFAULT_CLUSTER_MAX_ZOOM);
        assert_eq!(fd.metric_label(), Some("SUM(count)"));
        assert_eq!(fd.legend_label(), Some("SUM(count)"));
        assert_eq!(fd.extra.get("row_limit"), Some(&json!(5000)));
        assert!(!fd.has_mutator());
    }

    #[test]
    fn test_legend_label_prefers_dimension() {
        let mut fd = FormData::new(VizKind::Scatter);
        fd.dimension = Some("city".to_string());
        fd.metric = Some(MetricSpec::Named("count".to_string()));
        assert_eq!(fd.legend_label(), Some("city"));
    }

    #[test]
    fn test_composite_time_grain() {
        let config: CompositeConfig = serde_json::from_value(json!({
            "granularity": "PT1H",
            "deck_slices": [{"slice_id": 3, "form_data": {"viz_type": "deck_scatter"}}]
        }))
        .unwrap();
        assert_eq!(config.time_grain(), "PT1H");
        assert_eq!(config.slices[0].slice_id, SliceId(3));
        assert_eq!(CompositeConfig::default().time_grain(), DEFAULT_GRANULARITY);
    }
}
