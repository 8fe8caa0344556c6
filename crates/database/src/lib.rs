//! # Reportdesk Database Crate
//!
//! This crate owns the single outbound connection to the document store and is
//! the only place that knows reports live in MongoDB.
//!
//! ## Architectural Principles
//!
//! - **Owned gateway, no ambient globals:** connection state is tracked by a
//!   `ConnectionMonitor` owned by the gateway and handed out by reference; the
//!   web layer receives the gateway explicitly through its shared state.
//! - **Bounded startup retries:** `connect_with_retry` retries a fixed number of
//!   times and then escalates to a fatal error, so a misconfigured deployment
//!   fails instead of waiting forever.
//! - **Trait seam:** `ReportStore` is the interface handlers program against, which
//!   lets tests swap in the in-memory store (`testing` feature).
//!
//! ## Public API
//!
//! - `MongoConnector` / `Connector`: one connect attempt.
//! - `connect_with_retry` + `RetryPolicy`: the bounded startup loop.
//! - `ReportStore` / `MongoGateway`: create, list, disconnect, connection state.
//! - `ConnectionState` / `ConnectionMonitor`: non-blocking reachability snapshot.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod repository;
pub mod state;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect_with_retry, Connector, MongoConfig, MongoConnector, RetryPolicy};
pub use error::DbError;
#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryReportStore;
pub use repository::{MongoGateway, ReportStore};
pub use state::{ConnectionMonitor, ConnectionState};
