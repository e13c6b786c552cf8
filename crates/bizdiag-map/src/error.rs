//! Error types for mapping operations.

use std::fmt;

use bizdiag_model::Transform;

/// Errors from applying human-confirmed mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Canonical field not declared for the pack.
    FieldNotFound(String),
    /// Column not found in the uploaded table.
    ColumnNotFound(String),
    /// Column already mapped to another field.
    ColumnAlreadyUsed { column: String, field: String },
    /// Transform that cannot read the field's type.
    TransformMismatch { field: String, transform: Transform },
}

impl MappingError {
    /// The canonical field involved, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::FieldNotFound(field) => Some(field),
            Self::ColumnAlreadyUsed { field, .. } => Some(field),
            Self::TransformMismatch { field, .. } => Some(field),
            Self::ColumnNotFound(_) => None,
        }
    }

    /// The source column involved, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Self::ColumnNotFound(column) => Some(column),
            Self::ColumnAlreadyUsed { column, .. } => Some(column),
            Self::FieldNotFound(_) | Self::TransformMismatch { .. } => None,
        }
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldNotFound(field) => write!(f, "Canonical field not found: {field}"),
            Self::ColumnNotFound(column) => write!(f, "Column not found: {column}"),
            Self::ColumnAlreadyUsed { column, field } => {
                write!(f, "Column '{column}' already mapped to '{field}'")
            }
            Self::TransformMismatch { field, transform } => {
                write!(f, "Transform '{transform}' cannot read field '{field}'")
            }
        }
    }
}

impl std::error::Error for MappingError {}
