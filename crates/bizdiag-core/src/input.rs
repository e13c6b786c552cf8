//! Run inputs and options.

use bizdiag_analytics::Answers;
use bizdiag_map::ConfidenceThresholds;
use bizdiag_model::{FieldMapping, PackType, RawTable};

/// One uploaded table for one data pack.
#[derive(Debug, Clone, PartialEq)]
pub struct PackUpload {
    pub pack: PackType,
    pub table: RawTable,
    /// Mappings a person confirmed; they replace suggestions for the same
    /// field.
    pub confirmed: Vec<FieldMapping>,
}

impl PackUpload {
    pub fn new(pack: PackType, table: RawTable) -> Self {
        Self {
            pack,
            table,
            confirmed: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_confirmed(mut self, confirmed: Vec<FieldMapping>) -> Self {
        self.confirmed = confirmed;
        self
    }
}

/// Everything a single run reads besides the vertical playbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunInput {
    pub uploads: Vec<PackUpload>,
    pub answers: Answers,
}

impl RunInput {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_upload(mut self, upload: PackUpload) -> Self {
        self.uploads.push(upload);
        self
    }

    #[must_use]
    pub fn with_answers(mut self, answers: Answers) -> Self {
        self.answers = answers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub thresholds: ConfidenceThresholds,
    /// Distinct sample values kept per profiled column.
    pub sample_size: usize,
    /// Normalize with suggestions that still await confirmation. When off,
    /// only auto-confirmed and person-confirmed mappings are used.
    pub accept_unconfirmed: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            thresholds: ConfidenceThresholds::default(),
            sample_size: 5,
            accept_unconfirmed: true,
        }
    }
}

impl RunOptions {
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    #[must_use]
    pub fn with_accept_unconfirmed(mut self, accept: bool) -> Self {
        self.accept_unconfirmed = accept;
        self
    }
}
