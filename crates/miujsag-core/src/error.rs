use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search engine unreachable: {0}")]
    Connectivity(String),

    #[error("search engine timed out: {0}")]
    Timeout(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("indexing failed for document {document_id}: {source}")]
    Indexing {
        document_id: String,
        #[source]
        source: Box<SearchError>,
    },

    #[error("invalid query: {0}")]
    Query(String),

    #[error("search engine returned status {status}: {reason}")]
    Engine { status: u16, reason: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Internal(format!("undecodable engine response: {err}"))
        } else {
            Self::Connectivity(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub operation: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

impl SearchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Connectivity(_) => "CONNECTIVITY_ERROR",
            Self::Timeout(_) => "TIMEOUT_ERROR",
            Self::Schema(_) => "SCHEMA_ERROR",
            Self::Indexing { .. } => "INDEXING_ERROR",
            Self::Query(_) => "QUERY_ERROR",
            Self::Engine { .. } => "ENGINE_ERROR",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Json(_) => "JSON_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures where the engine never produced an answer.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connectivity(_) | Self::Timeout(_))
    }

    /// True when an engine reply reports that an index is already present.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::Engine { status: 400, reason } if reason.contains("resource_already_exists_exception")
        )
    }

    #[must_use]
    pub fn document_id(&self) -> Option<&str> {
        match self {
            Self::Indexing { document_id, .. } => Some(document_id),
            _ => None,
        }
    }

    pub(crate) fn indexing(document_id: &str, source: SearchError) -> Self {
        Self::Indexing {
            document_id: document_id.to_string(),
            source: Box::new(source),
        }
    }

    pub fn to_payload(&self, operation: impl Into<String>) -> ErrorPayload {
        ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
            operation: operation.into(),
            trace_id: Uuid::new_v4().to_string(),
            document_id: self.document_id().map(ToString::to_string),
        }
    }
}
