//! The page persistence contract.
//!
//! Three calls, mirroring the service the editor talks to:
//!
//! - `fetch`: read a page's annotations (`{annotations, updated_at}`).
//! - `save`: replace them with the full list (`{annotations}` → `{updated_at}`).
//! - `rerun`: ask the recognizer to redo the page text. Geometry and
//!   grouping stay with the editor; callers reload afterwards.

use async_trait::async_trait;
use ocrfix_core::wire::error_message;
use ocrfix_core::{PageDocument, SaveBody, SaveReceipt, WireError};
use std::fmt;
use thiserror::Error;

/// Identifies one page image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("bad response: {0}")]
    Decode(#[from] WireError),
    #[error("page {0} not found")]
    NotFound(PageId),
    #[error("request cancelled")]
    Cancelled,
    /// Pending edits could not be saved before a page-level operation.
    #[error("unsaved edits: {0}")]
    Unsaved(String),
}

impl BackendError {
    /// Build from a non-2xx response: the JSON `error` field when the body
    /// carries one, else the status text.
    pub fn from_http(status: u16, status_text: &str, body: &str) -> Self {
        BackendError::Http {
            status,
            message: error_message(status_text, body),
        }
    }
}

#[async_trait]
pub trait PageBackend: Send + Sync {
    async fn fetch(&self, page: &PageId) -> Result<PageDocument, BackendError>;

    async fn save(&self, page: &PageId, body: &SaveBody) -> Result<SaveReceipt, BackendError>;

    async fn rerun(&self, page: &PageId) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn http_error_prefers_json_body() {
        let err = BackendError::from_http(500, "Internal Server Error", r#"{"error": "disk full"}"#);
        assert_eq!(err.to_string(), "disk full (HTTP 500)");
    }

    #[test]
    fn http_error_falls_back_to_status_text() {
        let err = BackendError::from_http(502, "Bad Gateway", "<html>oops</html>");
        assert_eq!(err.to_string(), "Bad Gateway (HTTP 502)");
    }
}
