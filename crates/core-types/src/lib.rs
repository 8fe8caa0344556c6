//! # Reportdesk Core Types
//!
//! The report entity model shared by every other crate in the workspace.
//!
//! - `Report`: a report as it exists in the store, with its assigned identity
//!   and creation timestamp.
//! - `NewReport`: a validated candidate, ready to be handed to storage.
//! - `payload`: normalization of inbound bodies and the field rules that turn
//!   loosely-typed JSON into a `NewReport`.

pub mod error;
pub mod payload;
pub mod report;

// Re-export the core types to provide a clean public API.
pub use error::{FieldErrors, ReportError};
pub use payload::{normalize_payload, REQUIRED_FIELDS};
pub use report::{NewReport, Report};
