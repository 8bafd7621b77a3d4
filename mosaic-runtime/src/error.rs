use mosaic_common::types::SliceId;
use mosaic_geometry::error::MosaicGeometryError;
use mosaic_guides::error::MosaicGuidesError;
use mosaic_scales::error::MosaicScaleError;
use thiserror::Error;

/// Failure of the data fetch collaborator for one slice
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Server responded with {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// The sandboxed data mutator rejected or failed to evaluate its expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Data mutator failed: {0}")]
pub struct MutatorError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Layer generation failed: {0}")]
pub struct LayerError(pub String);

#[derive(Debug, Error)]
pub enum MosaicRuntimeError {
    #[error("Fetch failed for slice {slice_id}: {source}")]
    Fetch {
        slice_id: SliceId,
        #[source]
        source: FetchError,
    },

    #[error("Mutator failed for slice {slice_id}: {source}")]
    Mutator {
        slice_id: SliceId,
        #[source]
        source: MutatorError,
    },

    #[error("Layer generation failed for slice {slice_id}: {source}")]
    Layer {
        slice_id: SliceId,
        #[source]
        source: LayerError,
    },

    #[error("Stale completion for slice {slice_id}: generation {generation}, current {current}")]
    StaleGeneration {
        slice_id: SliceId,
        generation: u64,
        current: u64,
    },

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] serde_json::Error),

    #[error("Completion channel closed")]
    ChannelClosed,

    #[error("Scale error: {0}")]
    ScaleError(#[from] MosaicScaleError),

    #[error("Geometry error: {0}")]
    GeometryError(#[from] MosaicGeometryError),

    #[error("Guides error: {0}")]
    GuidesError(#[from] MosaicGuidesError),
}
