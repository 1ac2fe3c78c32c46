//! Concrete collaborators: the BigQuery REST client, CSV exports, and the
//! configuration that wires them up.

pub mod bigquery;
pub mod config;
pub mod csv_file;
