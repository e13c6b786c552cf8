//! Error types for collaborator calls.

use thiserror::Error;

/// Failures of an optional collaborator call.
///
/// Every variant is recoverable: callers fall back to their deterministic
/// path and record the failure as a run issue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CollaboratorError {
    /// No collaborator is configured for this run.
    #[error("collaborator disabled")]
    Disabled,

    /// The call did not complete within the configured timeout.
    #[error("collaborator timed out after {0} seconds")]
    Timeout(u64),

    /// Connection or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("collaborator returned HTTP {status}")]
    Status { status: u16 },

    /// The endpoint answered without any content.
    #[error("collaborator returned an empty response")]
    EmptyResponse,

    /// The content could not be parsed as the expected JSON document.
    #[error("collaborator returned invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON parsed but broke the output contract.
    #[error("collaborator output rejected: {}", problems.join("; "))]
    SchemaViolation { problems: Vec<String> },
}

impl CollaboratorError {
    /// Short machine-friendly label, used in log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::EmptyResponse => "empty_response",
            Self::InvalidJson(_) => "invalid_json",
            Self::SchemaViolation { .. } => "schema_violation",
        }
    }

    /// Whether the failure is worth reporting to the user.
    ///
    /// A disabled collaborator is the normal offline path.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollaboratorError>;
