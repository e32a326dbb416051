//! Read-only access to the sales record store.
//!
//! A store answers one kind of question: "give me every sale document,
//! projected onto these fields". Each query acquires its own resource
//! (a file handle or an HTTP client) and releases it before returning.

pub mod file;
pub mod http;

pub use file::FileStore;
pub use http::HttpStore;

use crate::models::{DataError, Field, ReportKind, SaleRecord};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

/// A raw store document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Failures talking to the store. All of them are fatal for a report.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read sales data from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sales data from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to sales store at {0}")]
    Unreachable(String),

    #[error("sales store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("sales store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected store response: {0}")]
    UnexpectedShape(String),
}

/// Errors from running one report's query.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Data(#[from] DataError),
}

/// A read-only source of sale documents.
#[allow(async_fn_in_trait)]
pub trait SalesStore {
    /// Human-readable location of the store, for logs.
    fn describe(&self) -> String;

    /// Fetch every document, keeping only the projected fields.
    async fn find(&self, projection: &[Field]) -> Result<Vec<Document>, StoreError>;
}

/// The configured store backend.
#[derive(Debug, Clone)]
pub enum Store {
    File(FileStore),
    Http(HttpStore),
}

impl SalesStore for Store {
    fn describe(&self) -> String {
        match self {
            Store::File(s) => s.describe(),
            Store::Http(s) => s.describe(),
        }
    }

    async fn find(&self, projection: &[Field]) -> Result<Vec<Document>, StoreError> {
        match self {
            Store::File(s) => s.find(projection).await,
            Store::Http(s) => s.find(projection).await,
        }
    }
}

/// Keep only the projected keys of a document.
pub fn project(mut document: Document, projection: &[Field]) -> Document {
    document.retain(|key, _| projection.iter().any(|f| f.as_str() == key));
    document
}

/// Run the report's projected query and decode the snapshot.
pub async fn load_records<S: SalesStore>(
    store: &S,
    kind: ReportKind,
) -> Result<Vec<SaleRecord>, LoadError> {
    let projection = kind.projection();
    debug!(
        "Querying {} with projection {:?}",
        store.describe(),
        projection
    );

    let documents = store.find(projection).await?;
    info!("Fetched {} sale documents for {:?}", documents.len(), kind);

    let records = documents
        .into_iter()
        .enumerate()
        .map(|(index, doc)| SaleRecord::from_document(index, doc))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedStore(Vec<serde_json::Value>);

    impl SalesStore for FixedStore {
        fn describe(&self) -> String {
            "fixed".to_string()
        }

        async fn find(&self, projection: &[Field]) -> Result<Vec<Document>, StoreError> {
            Ok(self
                .0
                .iter()
                .filter_map(|v| v.as_object().cloned())
                .map(|doc| project(doc, projection))
                .collect())
        }
    }

    #[test]
    fn test_project_strips_unrequested_fields() {
        let doc = json!({"_id": 1, "ProductID": 1, "ProductName": "A", "Price": 3.0});
        let projected = project(
            doc.as_object().cloned().unwrap(),
            &[Field::ProductId, Field::ProductName],
        );

        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("ProductID"));
        assert!(!projected.contains_key("_id"));
        assert!(!projected.contains_key("Price"));
    }

    #[tokio::test]
    async fn test_load_records_applies_projection() {
        let store = FixedStore(vec![json!({
            "CustomerID": 1,
            "CustomerName": "Ali",
            "TotalPrice": 10.0,
            "Quantity": 3
        })]);

        let records = load_records(&store, ReportKind::TopCustomers).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_price, Some(10.0));
        assert!(records[0].quantity.is_none());
    }

    #[tokio::test]
    async fn test_load_records_reports_malformed_document() {
        let store = FixedStore(vec![
            json!({"SaleDate": "2024-01-01", "TotalPrice": 1.0}),
            json!({"SaleDate": "not a date", "TotalPrice": 1.0}),
        ]);

        let err = load_records(&store, ReportKind::MonthlyTrend)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LoadError::Data(DataError::Malformed { index: 1, .. })
        ));
    }
}
