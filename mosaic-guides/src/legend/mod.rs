pub mod display;
pub mod state;

pub use display::{make_legend, Legend, LegendConfig, LegendEntry, LegendPosition};
