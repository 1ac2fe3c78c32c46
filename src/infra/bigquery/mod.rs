//! Google BigQuery over its REST API (`jobs.query` / `getQueryResults`).
//!
//! [`BigQueryClient`] implements both [`RecordSource`] and
//! [`SeverityPredictor`].
//!
//! [`RecordSource`]: crate::services::record_source::RecordSource
//! [`SeverityPredictor`]: crate::services::prediction::SeverityPredictor

pub mod client;
pub mod sql;
pub mod types;

pub use client::BigQueryClient;
