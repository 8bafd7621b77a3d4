pub mod bucket;
pub mod color;
pub mod error;
pub mod format;
pub mod temporal;
