pub mod editor;
pub mod errors;
pub mod models;
pub mod notify;
pub mod payload;
pub mod reducer;
pub mod service;
pub mod validation;
