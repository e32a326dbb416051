//! HTTP document store.
//!
//! Talks to a `find` endpoint shaped like the MongoDB Data API:
//! `POST {url}/action/find` with the namespace, an empty filter and a
//! projection document, answered by `{"documents": [...]}`.

use super::{Document, SalesStore, StoreError};
use crate::models::Field;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Connection settings for an HTTP document store.
#[derive(Debug, Clone)]
pub struct HttpStore {
    pub url: String,
    pub data_source: String,
    pub database: String,
    pub collection: String,
    pub api_key: Option<String>,
    /// Query timeout; `None` keeps the client default.
    pub timeout_seconds: Option<u64>,
}

/// Request body for the find action.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindRequest<'a> {
    data_source: &'a str,
    database: &'a str,
    collection: &'a str,
    filter: serde_json::Map<String, serde_json::Value>,
    projection: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FindResponse {
    documents: Vec<serde_json::Value>,
}

impl HttpStore {
    fn endpoint(&self) -> String {
        format!("{}/action/find", self.url.trim_end_matches('/'))
    }

    fn request_body(&self, projection: &[Field]) -> FindRequest<'_> {
        let mut fields: serde_json::Map<String, serde_json::Value> = projection
            .iter()
            .map(|f| (f.as_str().to_string(), serde_json::Value::from(1)))
            .collect();
        fields.insert("_id".to_string(), serde_json::Value::from(0));

        FindRequest {
            data_source: &self.data_source,
            database: &self.database,
            collection: &self.collection,
            filter: serde_json::Map::new(),
            projection: fields,
        }
    }

    fn client(&self) -> Result<reqwest::Client, StoreError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = self.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }

    fn map_send_error(&self, e: reqwest::Error) -> StoreError {
        if e.is_timeout() {
            StoreError::Timeout(self.timeout_seconds.unwrap_or_default())
        } else if e.is_connect() {
            StoreError::Unreachable(self.url.clone())
        } else {
            StoreError::Request(e)
        }
    }
}

/// Turn a find response into documents.
fn parse_documents(response: FindResponse) -> Result<Vec<Document>, StoreError> {
    response
        .documents
        .into_iter()
        .map(|value| match value {
            serde_json::Value::Object(doc) => Ok(doc),
            other => Err(StoreError::UnexpectedShape(format!(
                "document is not an object: {other}"
            ))),
        })
        .collect()
}

impl SalesStore for HttpStore {
    fn describe(&self) -> String {
        format!("{}/{}.{}", self.url, self.database, self.collection)
    }

    async fn find(&self, projection: &[Field]) -> Result<Vec<Document>, StoreError> {
        let client = self.client()?;
        let url = self.endpoint();
        debug!("POST {}", url);

        let mut request = client.post(&url).json(&self.request_body(projection));
        if let Some(ref key) = self.api_key {
            request = request.header("api-key", key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        let parsed: FindResponse = response
            .json()
            .await
            .map_err(|e| StoreError::UnexpectedShape(e.to_string()))?;

        parse_documents(parsed)
    }
}
