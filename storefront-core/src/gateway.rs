use async_trait::async_trait;
use serde_json::{Map, Value};
use crate::query::{Filter, ResourceQuery};

/// A single ERP document as returned by the resource API.
pub type Document = Map<String, Value>;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Generic access to named ERP resources.
///
/// Implementations own transport, authentication and retries. Filter, field
/// and pagination semantics follow the resource API: see [`ResourceQuery`].
#[async_trait]
pub trait ErpGateway: Send + Sync {
    async fn get_doc(&self, doctype: &str, name: &str) -> GatewayResult<Document>;

    async fn list_docs(&self, doctype: &str, query: &ResourceQuery) -> GatewayResult<Vec<Document>>;

    /// Number of documents matching `filters`, ignoring pagination.
    async fn count_docs(&self, doctype: &str, filters: &[Filter]) -> GatewayResult<usize>;

    /// Creates a document and returns it as stored, including its assigned `name`.
    async fn create_doc(&self, doctype: &str, payload: Document) -> GatewayResult<Document>;

    async fn update_doc(&self, doctype: &str, name: &str, payload: Document) -> GatewayResult<Document>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{doctype} not found: {name}")]
    NotFound {
        doctype: String,
        name: String,
    },

    #[error("ERP rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },

    #[error("ERP transport failure: {0}")]
    Transport(String),

    #[error("Malformed ERP response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Only transport failures are worth retrying; everything else reflects
    /// data or configuration on the ERP side.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Transport("timeout".into()).is_transient());
        assert!(!GatewayError::Rejected { status: 417, message: "bad".into() }.is_transient());
        assert!(!GatewayError::NotFound { doctype: "Item".into(), name: "X".into() }.is_transient());
    }

    #[test]
    fn test_not_found_message() {
        let err = GatewayError::NotFound { doctype: "Item".into(), name: "SKU-1".into() };
        assert_eq!(err.to_string(), "Item not found: SKU-1");
    }
}
