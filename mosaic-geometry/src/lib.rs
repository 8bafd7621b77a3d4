pub mod cluster;
pub mod error;
pub mod labels;
pub mod projection;

pub use cluster::{ClusterIndex, ClusterNode, ClusterOptions, Extremum};
