use mosaic_common::types::SliceId;
use mosaic_scales::error::MosaicScaleError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MosaicGuidesError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No categories for slice {0}")]
    UnknownSlice(SliceId),

    #[error("Invalid legend position: {0}")]
    InvalidLegendPosition(String),

    #[error("Invalid legend format: {0}")]
    InvalidFormat(#[from] MosaicScaleError),
}
