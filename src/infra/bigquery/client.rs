use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{PredictionError, SourceError};
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_json, json_request};
use crate::infra::bigquery::sql;
use crate::infra::bigquery::types::{QueryParameter, QueryRequest, QueryResponse};
use crate::infra::config::WarehouseSettings;
use crate::record::CrashRecord;
use crate::services::prediction::{PredictionRequest, SeverityPrediction, SeverityPredictor};
use crate::services::record_source::RecordSource;
use crate::table::{Table, decode_records};

pub const BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// How long the server may hold each request waiting for the job.
const QUERY_TIMEOUT_MS: u64 = 10_000;

/// Upper bound on `getQueryResults` calls for one query (pages plus polls).
const MAX_RESULT_CALLS: usize = 10_000;

/// BigQuery REST client scoped to one project and dataset.
pub struct BigQueryClient<C> {
    http: C,
    base_url: String,
    settings: WarehouseSettings,
}

impl BigQueryClient<ApiKey<BasicClient>> {
    /// Client authenticated with the configured OAuth access token.
    pub fn from_settings(settings: WarehouseSettings) -> Result<Self, SourceError> {
        let basic = BasicClient::with_timeouts(Duration::from_secs(60), Duration::from_secs(10))?;
        let http = ApiKey::bearer(basic, &settings.access_token)
            .map_err(|e| SourceError::InvalidRequest(format!("access token: {e}")))?;
        Ok(Self::new(http, settings))
    }
}

impl<C: HttpClient> BigQueryClient<C> {
    pub fn new(http: C, settings: WarehouseSettings) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
            settings,
        }
    }

    /// Points the client at another endpoint (emulators, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn table_name(&self) -> String {
        sql::qualified_name(
            &self.settings.project_id,
            &self.settings.dataset,
            &self.settings.table,
        )
    }

    pub fn model_name(&self) -> String {
        sql::qualified_name(
            &self.settings.project_id,
            &self.settings.dataset,
            &self.settings.model,
        )
    }

    /// Runs a standard-SQL query and collects every result page.
    #[tracing::instrument(skip(self, statement, parameters), fields(parameters = parameters.len()))]
    pub async fn query(
        &self,
        statement: &str,
        parameters: Vec<QueryParameter>,
    ) -> Result<Table, SourceError> {
        let body = QueryRequest {
            query: statement,
            use_legacy_sql: false,
            timeout_ms: QUERY_TIMEOUT_MS,
            location: self.settings.location.as_deref(),
            parameter_mode: (!parameters.is_empty()).then_some("NAMED"),
            query_parameters: parameters,
        };
        let url = format!("{}/projects/{}/queries", self.base_url, self.settings.project_id);
        let req = json_request(reqwest::Method::POST, &url, Some(&body))?;
        let mut response: QueryResponse = fetch_json(&self.http, req).await?;

        let job = response.job_reference.clone();
        let mut table = Table::default();
        let mut calls = 0usize;

        loop {
            let page_token = if response.job_complete {
                response.drain_into(&mut table);
                match response.page_token.take() {
                    Some(token) => Some(token),
                    None => break,
                }
            } else {
                debug!("Query job still running, polling");
                None
            };

            let Some(job) = job.as_ref() else {
                return Err(SourceError::Incomplete("<no job reference>".to_string()));
            };
            calls += 1;
            if calls > MAX_RESULT_CALLS {
                warn!(job_id = %job.job_id, calls, "Giving up on query results");
                return Err(SourceError::Incomplete(job.job_id.clone()));
            }

            let req = self.results_request(
                &job.job_id,
                job.location.as_deref(),
                page_token.as_deref(),
            )?;
            response = fetch_json(&self.http, req).await?;
        }

        debug!(
            columns = table.columns.len(),
            rows = table.rows.len(),
            result_calls = calls,
            "Query finished"
        );
        Ok(table)
    }

    fn results_request(
        &self,
        job_id: &str,
        location: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<reqwest::Request, SourceError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, self.settings.project_id, job_id
        );
        let mut req = json_request::<()>(reqwest::Method::GET, &url, None)?;
        {
            let mut query = req.url_mut().query_pairs_mut();
            query.append_pair("timeoutMs", &QUERY_TIMEOUT_MS.to_string());
            if let Some(location) = location.or(self.settings.location.as_deref()) {
                query.append_pair("location", location);
            }
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }
        Ok(req)
    }
}

#[async_trait]
impl<C: HttpClient> RecordSource for BigQueryClient<C> {
    #[tracing::instrument(skip(self), fields(table = %self.table_name()))]
    async fn fetch_records(&self) -> Result<Vec<CrashRecord>, SourceError> {
        let table = self.query(&sql::records_query(&self.table_name()), Vec::new()).await?;
        let records = decode_records(&table)?;
        info!(records = records.len(), "Crash records fetched from BigQuery");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("bigquery {}", self.table_name())
    }
}

#[async_trait]
impl<C: HttpClient> SeverityPredictor for BigQueryClient<C> {
    #[tracing::instrument(skip(self, request), fields(model = %self.model_name()))]
    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<SeverityPrediction, PredictionError> {
        request.validate()?;

        let table = self
            .query(
                &sql::prediction_query(&self.model_name()),
                sql::prediction_parameters(request),
            )
            .await?;

        let column = table.column(sql::PREDICTED_LABEL)?;
        if table.rows.is_empty() {
            return Err(PredictionError::EmptyResult);
        }
        let label = table.text(0, column).ok_or(PredictionError::EmptyResult)?;
        let prediction = SeverityPrediction::from_label(&label)?;

        info!(%prediction, "Severity predicted");
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::{Value, json};

    struct Unused;

    /// Replies with canned JSON bodies in order and records every request.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<(u16, Value)>>,
        seen: Mutex<Vec<(reqwest::Method, String)>>,
    }

    impl Scripted {
        fn new(replies: Vec<Value>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| (200, r)).collect()),
                ..Default::default()
            }
        }

        fn seen(&self) -> Vec<(reqwest::Method, String)> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClient for Scripted {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            self.seen
                .lock()
                .unwrap()
                .push((req.method().clone(), req.url().to_string()));
            let (status, body) = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request");
            let resp = http::Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(body.to_string())
                .unwrap();
            Ok(reqwest::Response::from(resp))
        }
    }

    fn settings() -> WarehouseSettings {
        WarehouseSettings {
            project_id: "sj-crashes".to_string(),
            access_token: "t".to_string(),
            dataset: "crash_analysis".to_string(),
            table: "processed_crash_data".to_string(),
            model: "crash_severity_model".to_string(),
            location: None,
        }
    }

    fn label_page(rows: &[&str]) -> Value {
        json!({
            "schema": { "fields": [{ "name": "predicted_is_fatal", "type": "INTEGER" }] },
            "jobReference": { "projectId": "sj-crashes", "jobId": "job_p" },
            "rows": rows.iter().map(|v| json!({ "f": [{ "v": v }] })).collect::<Vec<_>>(),
            "jobComplete": true
        })
    }

    fn request() -> PredictionRequest {
        PredictionRequest {
            collision_type: "Rear End".to_string(),
            primary_collision_factor: "Unsafe Speed".to_string(),
            weather: "Clear".to_string(),
            roadway_surface: "Dry".to_string(),
            lighting: "Daylight".to_string(),
            minor_injuries: 1,
            severe_injuries: 0,
        }
    }

    #[async_trait]
    impl HttpClient for Unused {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            unreachable!("requests are only built in these tests")
        }
    }

    fn client(location: Option<&str>) -> BigQueryClient<Unused> {
        BigQueryClient::new(
            Unused,
            WarehouseSettings {
                project_id: "sj-crashes".to_string(),
                access_token: "t".to_string(),
                dataset: "crash_analysis".to_string(),
                table: "processed_crash_data".to_string(),
                model: "crash_severity_model".to_string(),
                location: location.map(str::to_string),
            },
        )
    }

    #[test]
    fn test_names() {
        let c = client(None);
        assert_eq!(c.table_name(), "`sj-crashes.crash_analysis.processed_crash_data`");
        assert_eq!(c.model_name(), "`sj-crashes.crash_analysis.crash_severity_model`");
        assert_eq!(
            c.describe(),
            "bigquery `sj-crashes.crash_analysis.processed_crash_data`"
        );
    }

    #[test]
    fn test_results_request_url() {
        let c = client(Some("US")).with_base_url("http://localhost:9050/bigquery/v2");
        let req = c.results_request("job_1", None, Some("tok en")).unwrap();
        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "http://localhost:9050/bigquery/v2/projects/sj-crashes/queries/job_1\
             ?timeoutMs=10000&location=US&pageToken=tok+en"
        );

        let req = c.results_request("job_1", Some("EU"), None).unwrap();
        assert_eq!(req.url().query(), Some("timeoutMs=10000&location=EU"));
    }

    #[tokio::test]
    async fn test_query_polls_then_follows_pages() {
        let http = Scripted::new(vec![
            json!({
                "jobReference": { "projectId": "sj-crashes", "jobId": "j1", "location": "US" },
                "jobComplete": false
            }),
            json!({
                "schema": { "fields": [{ "name": "COLLISIONTYPE" }] },
                "jobReference": { "projectId": "sj-crashes", "jobId": "j1" },
                "rows": [{ "f": [{ "v": "Rear End" }] }, { "f": [{ "v": "Broadside" }] }],
                "pageToken": "p2",
                "jobComplete": true
            }),
            json!({
                "rows": [{ "f": [{ "v": "Head-On" }] }],
                "jobComplete": true
            }),
        ]);
        let client = BigQueryClient::new(http, settings());

        let table = client.query("SELECT COLLISIONTYPE", Vec::new()).await.unwrap();
        assert_eq!(table.columns, vec!["COLLISIONTYPE"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.text(2, 0).as_deref(), Some("Head-On"));

        let seen = client.http.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].0, reqwest::Method::POST);
        assert!(seen[0].1.ends_with("/projects/sj-crashes/queries"));
        assert!(seen[1].1.ends_with("/queries/j1?timeoutMs=10000&location=US"));
        assert!(seen[2].1.ends_with("&pageToken=p2"));
    }

    #[tokio::test]
    async fn test_incomplete_job_without_reference_is_error() {
        let http = Scripted::new(vec![json!({ "jobComplete": false })]);
        let client = BigQueryClient::new(http, settings());

        let result = client.query("SELECT 1", Vec::new()).await;
        assert!(matches!(result, Err(SourceError::Incomplete(_))));
        assert_eq!(client.http.seen().len(), 1);
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced() {
        let http = Scripted {
            replies: Mutex::new(VecDeque::from([(403, json!({ "error": "denied" }))])),
            ..Default::default()
        };
        let client = BigQueryClient::new(http, settings());

        match client.fetch_records().await {
            Err(SourceError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert!(body.contains("denied"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_predict_reads_label() {
        let http = Scripted::new(vec![label_page(&["1"]), label_page(&["0"])]);
        let client = BigQueryClient::new(http, settings());

        assert_eq!(
            client.predict(&request()).await.unwrap(),
            SeverityPrediction::Fatal
        );
        assert_eq!(
            client.predict(&request()).await.unwrap(),
            SeverityPrediction::NonFatal
        );
    }

    #[tokio::test]
    async fn test_predict_without_rows_is_empty_result() {
        let http = Scripted::new(vec![label_page(&[])]);
        let client = BigQueryClient::new(http, settings());

        let result = client.predict(&request()).await;
        assert!(matches!(result, Err(PredictionError::EmptyResult)));
    }

    #[tokio::test]
    async fn test_predict_rejects_invalid_input_before_querying() {
        let client = BigQueryClient::new(Scripted::default(), settings());
        let mut bad = request();
        bad.severe_injuries = 11;

        let result = client.predict(&bad).await;
        assert!(matches!(result, Err(PredictionError::InvalidInput(_))));
        assert!(client.http.seen().is_empty());
    }
}
