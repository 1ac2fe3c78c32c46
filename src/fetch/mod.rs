mod basic;
pub mod auth;

pub use basic::BasicClient;

use async_trait::async_trait;
use reqwest::{Request, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SourceError;

/// Sends a prepared request. Credential wrappers decorate an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Builds a request for `method` on `url`, with an optional JSON body.
pub fn json_request<B: Serialize>(
    method: reqwest::Method,
    url: &str,
    body: Option<&B>,
) -> Result<reqwest::Request, SourceError> {
    let url: reqwest::Url = url
        .parse()
        .map_err(|e| SourceError::InvalidRequest(format!("{url}: {e}")))?;
    let mut req = reqwest::Request::new(method, url);

    if let Some(body) = body {
        req.headers_mut().insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    }

    Ok(req)
}

/// Executes `req` and decodes a JSON response body.
///
/// Non-success statuses become [`SourceError::Status`] carrying the body text.
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    req: reqwest::Request,
) -> Result<T, SourceError> {
    let resp = client.execute(req).await?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(SourceError::Status { status, body });
    }

    Ok(resp.json().await?)
}
