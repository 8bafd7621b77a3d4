pub mod category;
pub mod error;
pub mod legend;

pub use category::{CategorySet, CategoryState};
pub use legend::state::LegendStateMachine;
