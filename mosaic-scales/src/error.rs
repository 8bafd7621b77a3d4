#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MosaicScaleError {
    #[error("Unknown color scheme: {0}")]
    UnknownColorScheme(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Invalid time grain: {0}")]
    InvalidTimeGrain(String),

    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(i64),

    #[error("Break point is not numeric: {0}")]
    NonNumericBreakPoint(String),

    #[error("Invalid number format: {0}")]
    InvalidNumberFormat(String),

    #[error("Empty domain")]
    EmptyDomain,
}
