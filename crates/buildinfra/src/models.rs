//! These models represent a build infrastructure profile while it is being edited.
//!
//! The orchestrator speaks its own JSON format (see `payload`). We convert the fetched
//! response into these structs on load and only convert back on submit, so the editing
//! model can keep user-typed text and row ids that never reach the server.
pub mod configuration;
pub mod form_errors;
pub mod profile;
pub mod rows;
pub mod units;
