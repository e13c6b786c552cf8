use serde::{Deserialize, Serialize};

use crate::fact::FactSet;
use crate::initiative::{ExcludedInitiative, RankedInitiative, SelectedInitiative};
use crate::issue::{self, RunIssue};
use crate::mapping::MappingResult;
use crate::mode::ModeAssessment;
use crate::pack::PackType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackSummary {
    pub pack: PackType,
    pub source: String,
    pub input_rows: usize,
    pub usable_rows: usize,
    pub months: usize,
    pub completeness: f64,
    pub mapped_fields: usize,
    pub required_gaps: usize,
    pub pending_confirmations: usize,
    /// Set when a structural failure kept the pack out of the panel.
    pub excluded: bool,
}

/// Everything a run hands to the narrative and report layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub vertical_id: String,
    pub vertical_name: String,
    pub input_digest: String,
    pub mode: ModeAssessment,
    pub facts: FactSet,
    pub ranked: Vec<RankedInitiative>,
    pub excluded: Vec<ExcludedInitiative>,
    pub selected: Vec<SelectedInitiative>,
    pub packs: Vec<PackSummary>,
    pub mappings: Vec<MappingResult>,
    pub issues: Vec<RunIssue>,
}

impl DiagnosticReport {
    pub fn error_count(&self) -> usize {
        issue::error_count(&self.issues)
    }

    pub fn warning_count(&self) -> usize {
        issue::warning_count(&self.issues)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}
