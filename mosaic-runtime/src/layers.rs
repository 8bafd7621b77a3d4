use mosaic_common::feature::SlicePayload;
use mosaic_common::form_data::FormData;
use mosaic_common::types::{Rgba, SliceId, Viewport, VizKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::collaborators::LayerGenerator;
use crate::error::LayerError;
use crate::text::TextLabel;

pub const MARKER_LAYER_ID: &str = "icon-layer";
pub const MARKER_ICON: &str = "marker";
pub const MARKER_COLOR: Rgba = [0, 166, 153, 255];
pub const MARKER_SIZE: f32 = 5.0;
pub const MARKER_SIZE_SCALE: f32 = 15.0;

/// Everything the layer generator needs to build the layer of one slice
#[derive(Debug, Clone)]
pub struct LayerRequest<'a> {
    pub slice_id: SliceId,
    pub kind: VizKind,
    pub form_data: &'a FormData,
    /// The slice payload with its features replaced by the filtered ones
    pub payload: &'a SlicePayload,
    /// Labels of clusterized text slices at the current zoom
    pub labels: Option<&'a [TextLabel]>,
    pub viewport: &'a Viewport,
}

impl LayerRequest<'_> {
    /// Conventional layer id, e.g. `scatter-layer-12`
    pub fn layer_id(&self) -> String {
        let kind = self.kind.as_str();
        let kind = kind.strip_prefix("deck_").unwrap_or(kind);
        format!("{kind}-layer-{}", self.slice_id)
    }
}

/// An item the user picked on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedItem {
    /// `[lng, lat]`
    pub center: [f64; 2],
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl SelectedItem {
    pub fn new(center: [f64; 2]) -> Self {
        Self {
            center,
            properties: Map::new(),
        }
    }
}

/// Pin drawn over the selected item
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionMarker {
    pub id: &'static str,
    pub icon: &'static str,
    pub position: [f64; 2],
    pub size: f32,
    pub size_scale: f32,
    pub color: Rgba,
    pub item: SelectedItem,
}

impl From<&SelectedItem> for SelectionMarker {
    fn from(item: &SelectedItem) -> Self {
        Self {
            id: MARKER_LAYER_ID,
            icon: MARKER_ICON,
            position: item.center,
            size: MARKER_SIZE,
            size_scale: MARKER_SIZE_SCALE,
            color: MARKER_COLOR,
            item: item.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderLayer<L> {
    Slice { slice_id: SliceId, layer: L },
    Marker(SelectionMarker),
}

impl<L> RenderLayer<L> {
    pub fn slice_id(&self) -> Option<SliceId> {
        match self {
            RenderLayer::Slice { slice_id, .. } => Some(*slice_id),
            RenderLayer::Marker(_) => None,
        }
    }
}

/// Plain description of a generated layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub id: String,
    pub kind: VizKind,
    pub feature_count: usize,
    pub labels: Vec<String>,
}

/// Layer generator that describes layers instead of building renderable objects
#[derive(Debug, Default, Clone)]
pub struct SummaryLayerGenerator;

impl LayerGenerator for SummaryLayerGenerator {
    type Layer = LayerSummary;

    fn generate(&self, request: &LayerRequest<'_>) -> Result<LayerSummary, LayerError> {
        let labels = match request.labels {
            Some(labels) => labels.iter().map(|l| l.text.clone()).collect(),
            None => vec![],
        };
        Ok(LayerSummary {
            id: request.layer_id(),
            kind: request.kind,
            feature_count: request.payload.features().len(),
            labels,
        })
    }
}
