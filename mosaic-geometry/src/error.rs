use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MosaicGeometryError {
    #[error("Invalid zoom range: {min_zoom}..={max_zoom}")]
    InvalidZoomRange { min_zoom: u8, max_zoom: u8 },

    #[error("Cluster radius must be positive and finite: {0}")]
    InvalidRadius(f64),

    #[error("Cluster not found: zoom {zoom}, index {index}")]
    ClusterNotFound { zoom: u8, index: usize },
}
