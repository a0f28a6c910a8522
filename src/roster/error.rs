use crate::model::RecordId;
use crate::validation::FieldCheck;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RosterError {
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldCheck>),

    #[error("Duplicate key: a record with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Backing store unreachable: {0}")]
    Connectivity(String),

    #[error("Store setup failed: {0}")]
    Setup(String),

    /// A store failure that is neither connectivity nor a key collision.
    #[error("Store error: {0}")]
    Store(String),

    #[error("No record with id {0}")]
    NotFound(RecordId),

    #[error("Import rejected at line {line}: {reason}")]
    MalformedImport { line: usize, reason: String },

    #[error("No record selected")]
    NoSelection,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RosterError {
    /// Only connectivity failures are worth another attempt; everything else
    /// would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RosterError::Connectivity(_))
    }
}

fn summarize(checks: &[FieldCheck]) -> String {
    checks
        .iter()
        .map(|c| c.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, RosterError>;
