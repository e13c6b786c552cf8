use serde::{Deserialize, Serialize};

use crate::pack::PackType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Malformed cell, missing optional field, low mapping confidence.
    DataQuality,
    /// Pack excluded from the panel.
    Structural,
    /// LLM unavailable or returned unusable output; a fallback was used.
    Collaborator,
}

impl IssueCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCategory::DataQuality => "data_quality",
            IssueCategory::Structural => "structural",
            IssueCategory::Collaborator => "collaborator",
        }
    }
}

/// A recoverable problem recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIssue {
    pub category: IssueCategory,
    pub severity: IssueSeverity,
    pub pack: Option<PackType>,
    pub field: Option<String>,
    pub message: String,
}

impl RunIssue {
    pub fn data_quality(pack: Option<PackType>, message: impl Into<String>) -> Self {
        Self {
            category: IssueCategory::DataQuality,
            severity: IssueSeverity::Warning,
            pack,
            field: None,
            message: message.into(),
        }
    }

    pub fn structural(pack: PackType, message: impl Into<String>) -> Self {
        Self {
            category: IssueCategory::Structural,
            severity: IssueSeverity::Error,
            pack: Some(pack),
            field: None,
            message: message.into(),
        }
    }

    pub fn collaborator(message: impl Into<String>) -> Self {
        Self {
            category: IssueCategory::Collaborator,
            severity: IssueSeverity::Warning,
            pack: None,
            field: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_pack(mut self, pack: PackType) -> Self {
        self.pack = Some(pack);
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    #[must_use]
    pub fn with_severity(mut self, severity: IssueSeverity) -> Self {
        self.severity = severity;
        self
    }
}

pub fn error_count(issues: &[RunIssue]) -> usize {
    issues
        .iter()
        .filter(|issue| issue.severity == IssueSeverity::Error)
        .count()
}

pub fn warning_count(issues: &[RunIssue]) -> usize {
    issues
        .iter()
        .filter(|issue| issue.severity == IssueSeverity::Warning)
        .count()
}
