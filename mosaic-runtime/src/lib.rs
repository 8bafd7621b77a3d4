pub mod categories;
pub mod collaborators;
pub mod compositor;
pub mod error;
pub mod filter;
pub mod layers;
pub mod query;
pub mod state;
pub mod text;
pub mod time_window;

pub use compositor::MultiSliceCompositor;
