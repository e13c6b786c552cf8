use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages an initiative passes through during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionStage {
    Candidates,
    Eligible,
    Sized,
    Ranked,
    Selected,
}

impl fmt::Display for SelectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionStage::Candidates => "CANDIDATES",
            SelectionStage::Eligible => "ELIGIBLE",
            SelectionStage::Sized => "SIZED",
            SelectionStage::Ranked => "RANKED",
            SelectionStage::Selected => "SELECTED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityOutcome {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRange {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

/// An initiative that survived eligibility and the count cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedInitiative {
    pub id: String,
    pub title: String,
    pub category: String,
    pub eligibility: EligibilityOutcome,
    pub impact: Option<ImpactRange>,
    /// Evidence key the impact was derived from.
    pub sizing_basis: Option<String>,
    pub sizing_note: Option<String>,
    pub evidence_keys: Vec<String>,
    pub missing_evidence: Vec<String>,
    pub confidence: f64,
    /// Adverse distance from the benchmark in `[0, 1]`, when the playbook
    /// declares one for this initiative.
    pub gap_magnitude: Option<f64>,
    pub priority_weight: f64,
    pub priority_score: f64,
    /// 1-based.
    pub rank: usize,
    /// Position in the vertical playbook.
    pub declaration_index: usize,
}

impl RankedInitiative {
    pub fn impact_low(&self) -> Option<f64> {
        self.impact.map(|impact| impact.low)
    }

    pub fn impact_mid(&self) -> Option<f64> {
        self.impact.map(|impact| impact.mid)
    }

    pub fn impact_high(&self) -> Option<f64> {
        self.impact.map(|impact| impact.high)
    }
}

/// An initiative dropped before ranking, with the stage that dropped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedInitiative {
    pub id: String,
    pub title: String,
    pub stage: SelectionStage,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    Llm,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedInitiative {
    #[serde(flatten)]
    pub initiative: RankedInitiative,
    pub explanation: String,
    pub cited_evidence: Vec<String>,
    pub assumptions: Vec<String>,
    pub data_gaps: Vec<String>,
    pub narrative_source: NarrativeSource,
}
