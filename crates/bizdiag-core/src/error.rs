use bizdiag_config::ConfigError;
use thiserror::Error;

/// The only way a run can fail. Everything else becomes a
/// [`RunIssue`](bizdiag_model::RunIssue) on the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid vertical configuration: {0}")]
    Configuration(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
