use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid month key `{0}`: expected YYYY-MM")]
    InvalidMonthKey(String),
    #[error("unknown data pack `{0}`")]
    UnknownPack(String),
    #[error("duplicate evidence key `{0}`")]
    DuplicateEvidenceKey(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
