#![deny(unsafe_code)]

use std::path::PathBuf;

use bizdiag_model::PackType;

use crate::expr::FormulaError;

/// Fatal problems with a vertical playbook. A run cannot start without a valid one.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse vertical config: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    #[error("vertical config is missing required section `{section}`")]
    MissingSection { section: &'static str },

    #[error("vertical config section `{section}` is empty")]
    EmptySection { section: &'static str },

    #[error("duplicate {kind} `{id}`")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{pack} pack must declare key field `{field}`")]
    MissingKeyField { pack: PackType, field: &'static str },

    #[error("signal `{signal}` has an invalid formula: {source}")]
    InvalidFormula {
        signal: String,
        #[source]
        source: FormulaError,
    },

    #[error("signal dependency cycle among: {signals}")]
    SignalCycle { signals: String },

    #[error("name `{name}` is used both as a signal and as a canonical field")]
    NameCollision { name: String },

    #[error("initiative `{initiative}` has invalid sizing: {message}")]
    InvalidSizing { initiative: String, message: String },

    #[error("initiative `{initiative}` has an invalid benchmark gap: {message}")]
    InvalidBenchmarkGap { initiative: String, message: String },

    #[error("invalid mode threshold: {message}")]
    InvalidThreshold { message: String },

    #[error("invalid questionnaire rule: {message}")]
    InvalidRule { message: String },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
