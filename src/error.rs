//! Unified ingestion error model.
//! Every stage of the pipeline (catalog, fetch, normalize) reports through `IngestError`,
//! so callers see one all-or-nothing failure type regardless of where the run stopped.

use thiserror::Error;

use crate::fetch::PageAttempt;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("the specified table ({0}) could not be found in the schema catalog")]
    AliasNotFound(String),

    #[error("request for {page} failed: {source}")]
    TransportFailure {
        page: PageAttempt,
        #[source]
        source: TransportError,
    },

    #[error("malformed response for {page}: {reason}")]
    MalformedResponse { page: PageAttempt, reason: String },

    #[error("required fields missing from every record: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),

    #[error("output columns named more than once: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    #[error("invalid value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    #[error("schema descriptor '{path}': {reason}")]
    Descriptor { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl IngestError {
    pub fn code_str(&self) -> &'static str {
        match self {
            IngestError::AliasNotFound(_) => "alias_not_found",
            IngestError::TransportFailure { .. } => "transport_failure",
            IngestError::MalformedResponse { .. } => "malformed_response",
            IngestError::MissingRequiredFields(_) => "missing_required_fields",
            IngestError::DuplicateColumns(_) => "duplicate_columns",
            IngestError::InvalidFieldValue { .. } => "invalid_field_value",
            IngestError::Descriptor { .. } => "descriptor",
            IngestError::Config(_) => "config",
        }
    }

    pub fn descriptor<P: std::fmt::Display, S: Into<String>>(path: P, reason: S) -> Self {
        IngestError::Descriptor { path: path.to_string(), reason: reason.into() }
    }

    pub fn invalid_value<F: Into<String>, S: Into<String>>(field: F, reason: S) -> Self {
        IngestError::InvalidFieldValue { field: field.into(), reason: reason.into() }
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
