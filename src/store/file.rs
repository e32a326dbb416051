//! JSON export store.
//!
//! Reads a collection export from disk on every query. Both a JSON array
//! of documents and newline-delimited JSON (one document per line, as
//! `mongoexport` writes by default) are accepted.

use super::{project, Document, SalesStore, StoreError};
use crate::models::Field;
use std::path::PathBuf;
use tracing::debug;

/// A store backed by a JSON export file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, content: &str) -> Result<Vec<Document>, StoreError> {
        let parse_err = |source| StoreError::Parse {
            path: self.path.clone(),
            source,
        };

        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            let values: Vec<serde_json::Value> = serde_json::from_str(trimmed).map_err(parse_err)?;
            return values.into_iter().map(|v| self.object_entry(v)).collect();
        }

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).map_err(parse_err)?;
                self.object_entry(value)
            })
            .collect()
    }

    fn object_entry(&self, value: serde_json::Value) -> Result<Document, StoreError> {
        match value {
            serde_json::Value::Object(doc) => Ok(doc),
            other => Err(StoreError::UnexpectedShape(format!(
                "{} contains a non-object entry: {}",
                self.path.display(),
                other
            ))),
        }
    }
}

impl SalesStore for FileStore {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn find(&self, projection: &[Field]) -> Result<Vec<Document>, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;

        let documents = self.parse(&content)?;
        debug!("Read {} documents from {}", documents.len(), self.path.display());

        Ok(documents
            .into_iter()
            .map(|doc| project(doc, projection))
            .collect())
    }
}
