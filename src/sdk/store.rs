use super::catalog::TaskId;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogLoadError {
    #[error("Task store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Task store answered HTTP {0}")]
    Status(u16),

    #[error("Failed to parse task rows: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Write-back request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Write-back answered HTTP {0}")]
    Status(u16),
}

/// Body of a write-back; an empty `assignedDriver` clears the assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveRequest {
    pub id: TaskId,
    #[serde(rename = "assignedDriver")]
    pub assigned_driver: String,
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Value>, CatalogLoadError>;

    /// The store's reply body is opaque; only transport failures surface.
    async fn save_assignment(&self, request: &SaveRequest) -> Result<(), StoreError>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowsEnvelope {
    Wrapped { rows: Vec<Value> },
    Bare(Vec<Value>),
}

/// Task store behind a single GET/POST endpoint.
pub struct HttpTaskStore {
    client: Client,
    endpoint: String,
}

impl HttpTaskStore {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
        })
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn fetch_rows(&self) -> Result<Vec<Value>, CatalogLoadError> {
        log::debug!("[STORE] Fetching task rows from {}", self.endpoint);
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogLoadError::Status(status.as_u16()));
        }
        let text = response.text().await?;
        parse_rows(&text)
    }

    async fn save_assignment(&self, request: &SaveRequest) -> Result<(), StoreError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Accepts `{ "rows": [...] }` or a bare array.
pub fn parse_rows(text: &str) -> Result<Vec<Value>, CatalogLoadError> {
    let envelope: RowsEnvelope = serde_json::from_str(text).map_err(|e| {
        log::error!("Failed to parse task rows. Error: {}. Body: {}", e, text);
        e
    })?;
    Ok(match envelope {
        RowsEnvelope::Wrapped { rows } | RowsEnvelope::Bare(rows) => rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_envelope_and_bare_array() {
        assert_eq!(parse_rows(r#"{"rows":[{"id":1},{"id":2}]}"#).unwrap().len(), 2);
        assert_eq!(parse_rows(r#"[{"id":1}]"#).unwrap().len(), 1);
        assert!(matches!(parse_rows(r#"{"items":[]}"#), Err(CatalogLoadError::Parse(_))));
    }

    #[test]
    fn save_request_uses_store_field_names() {
        let body = serde_json::to_value(SaveRequest {
            id: "t1".into(),
            assigned_driver: String::new(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"id": "t1", "assignedDriver": ""}));
    }
}
