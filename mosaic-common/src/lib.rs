pub mod feature;
pub mod form_data;
pub mod types;
