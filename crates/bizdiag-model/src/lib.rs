//! Data model shared by every stage of the diagnostic pipeline.

pub mod error;
pub mod fact;
pub mod initiative;
pub mod issue;
pub mod mapping;
pub mod mode;
pub mod month;
pub mod pack;
pub mod panel;
pub mod profile;
pub mod report;
pub mod table;
pub mod value;

pub use error::{ModelError, Result};
pub use fact::{AnalyticsFact, FactSet, FactUnit};
pub use initiative::{
    EligibilityOutcome, ExcludedInitiative, ImpactRange, NarrativeSource, RankedInitiative,
    SelectedInitiative, SelectionStage,
};
pub use issue::{IssueCategory, IssueSeverity, RunIssue};
pub use mapping::{FieldMapping, MappingGap, MappingResult, MergePolicy, Transform};
pub use mode::{ModeAssessment, OperatingMode};
pub use month::MonthKey;
pub use pack::PackType;
pub use panel::{MonthlyPanelRow, PackPanel};
pub use profile::{ColumnProfile, InferredType, NumericStats, TableProfile};
pub use report::{DiagnosticReport, PackSummary};
pub use table::{RawRow, RawTable};
pub use value::{CellValue, format_number};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_counts() {
        let issues = vec![
            RunIssue::structural(PackType::Labor, "required field `pay_period_start` absent"),
            RunIssue::data_quality(Some(PackType::Revenue), "3 rows had unparseable dates"),
            RunIssue::collaborator("narrative fell back to templates"),
        ];
        assert_eq!(issue::error_count(&issues), 1);
        assert_eq!(issue::warning_count(&issues), 2);
    }

    #[test]
    fn mapping_result_helpers() {
        let result = MappingResult {
            pack: PackType::Pnl,
            mappings: vec![
                FieldMapping::confirmed("month", vec!["Period".into()], Transform::ParseMonth),
                FieldMapping::new("revenue", vec!["Sales".into()], Transform::ToNumber, 0.7),
            ],
            gaps: vec![MappingGap {
                canonical_field: "cogs".into(),
                required: false,
                reason: "no candidate column".into(),
            }],
            unmapped_columns: vec!["Notes".into()],
        };
        assert_eq!(result.mapped_count(), 2);
        assert_eq!(result.required_gaps().count(), 0);
        assert_eq!(result.pending_confirmation().count(), 1);
        assert!((result.mean_confidence().unwrap() - 0.85).abs() < 1e-6);
        assert!(result.mapping_for("revenue").is_some());
    }

    #[test]
    fn pack_names_parse_loosely() {
        assert_eq!("p&l".parse::<PackType>().unwrap(), PackType::Pnl);
        assert_eq!("Labour".parse::<PackType>().unwrap(), PackType::Labor);
        assert!("inventory".parse::<PackType>().is_err());
    }
}
