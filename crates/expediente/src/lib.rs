//! Case-file ("expediente") backend library.
//!
//! Everything that reasons about clients, uploaded documents, review
//! state, and export artifacts lives here. Persistence and blob storage
//! are abstract collaborators behind the traits in
//! [`workflows::intake::repository`], so the workflows can be exercised
//! with in-memory doubles.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
