//! Wire types for the BigQuery v2 query endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::table::Table;

/// Body of `POST /projects/{project}/queries`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest<'a> {
    pub query: &'a str,
    pub use_legacy_sql: bool,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query_parameters: Vec<QueryParameter>,
}

/// A named query parameter, bound server-side as `@name`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterValue {
    pub value: String,
}

impl QueryParameter {
    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType { kind: "STRING" },
            parameter_value: ParameterValue {
                value: value.to_string(),
            },
        }
    }

    pub fn int64(name: &str, value: i64) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType { kind: "INT64" },
            parameter_value: ParameterValue {
                value: value.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchema {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

/// Shared shape of the `jobs.query` and `getQueryResults` responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub job_complete: bool,
}

impl QueryResponse {
    /// Moves this page's schema (if not yet known) and rows into `table`.
    pub fn drain_into(&mut self, table: &mut Table) {
        if table.columns.is_empty() {
            if let Some(schema) = self.schema.take() {
                table.columns = schema.fields.into_iter().map(|f| f.name).collect();
            }
        }
        table.rows.extend(
            self.rows
                .drain(..)
                .map(|row| row.f.into_iter().map(|cell| cell.v).collect()),
        );
    }
}
