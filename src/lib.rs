//! Crash analysis dashboard: filters, aggregates and predicts over the
//! city crash table.

pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod services;
pub mod session;
pub mod table;
