use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::BackendError;
use crate::state::Status;

#[derive(Serialize)]
struct ChatRequest<'a> {
    question: &'a str,
}

/// Successful `POST /api/chat` payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ReloadResponse {
    #[serde(default)]
    chunks: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    answer: Option<String>,
}

/// Result of a successful reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    pub chunks: u64,
}

/// HTTP client for the question-answering backend.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid backend URL: {base_url}"))?;
        // Url::join replaces the last path segment unless the base ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Decode(format!("bad endpoint {path}: {e}")))
    }

    pub async fn status(&self) -> Result<Status, BackendError> {
        let url = self.endpoint("api/status")?;
        let response = self.client.get(url).send().await?;
        let body = success_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn chat(&self, question: &str) -> Result<ChatAnswer, BackendError> {
        let url = self.endpoint("api/chat")?;
        let response = self
            .client
            .post(url)
            .json(&ChatRequest { question })
            .send()
            .await?;
        let body = success_body(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn reload(&self) -> Result<ReloadSummary, BackendError> {
        let url = self.endpoint("api/reload")?;
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .send()
            .await?;
        let body = success_body(response).await?;
        let reload: ReloadResponse = serde_json::from_str(&body)?;
        Ok(ReloadSummary {
            chunks: reload.chunks.as_ref().and_then(chunk_count).unwrap_or(0),
        })
    }

    /// Image references are opaque, but relative ones only make sense against
    /// the backend they came from.
    pub fn resolve_image(&self, reference: &str) -> String {
        if Url::parse(reference).is_ok() {
            return reference.to_string();
        }
        let relative = reference.trim_start_matches('/');
        match self.base_url.join(relative) {
            Ok(url) => url.to_string(),
            Err(_) => reference.to_string(),
        }
    }
}

async fn success_body(response: Response) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }

    // A body that is not JSON at all says nothing about the request.
    let error_body: ErrorBody = serde_json::from_str(&body).map_err(|_| {
        BackendError::Decode(format!("HTTP {} with a non-JSON body", status.as_u16()))
    })?;
    let reason = error_body
        .status
        .or(error_body.answer)
        .filter(|r| !r.trim().is_empty());

    Err(BackendError::Http {
        status: status.as_u16(),
        reason,
    })
}

/// The backend reports `chunks` as a number or as a numeric string.
fn chunk_count(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
