//! Structural normalization failures.

use bizdiag_model::PackType;
use thiserror::Error;

/// Problems that exclude a whole pack from the run.
///
/// Per-row problems never surface here; they become warnings on the panel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("{pack} upload has no columns")]
    NoColumns { pack: PackType },

    #[error("{pack} field `{field}` is required but not mapped to any column")]
    MissingRequiredField { pack: PackType, field: String },

    #[error("{pack} mapping uses column `{column}` which is not in the upload")]
    ColumnNotFound { pack: PackType, column: String },
}

impl NormalizeError {
    pub fn pack(&self) -> PackType {
        match self {
            Self::NoColumns { pack }
            | Self::MissingRequiredField { pack, .. }
            | Self::ColumnNotFound { pack, .. } => *pack,
        }
    }
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
