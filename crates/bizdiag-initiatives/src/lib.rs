//! Initiative selection.
//!
//! A vertical playbook runs through CANDIDATES, ELIGIBLE, SIZED, RANKED and
//! SELECTED. Everything up to RANKED is deterministic. Only the final
//! narrative may come from a collaborator, and it is constrained to the
//! ranked initiatives, to evidence keys that exist in the fact set and to
//! numbers it was shown.

#![deny(unsafe_code)]

pub mod eligibility;
pub mod grounding;
pub mod narrative;
pub mod ranking;
pub mod selector;
pub mod sizing;

pub use eligibility::check_eligibility;
pub use grounding::GroundedNumbers;
pub use narrative::{NARRATIVE_TASK, Narrative, narrate, template_selection};
pub use ranking::{assign_ranks, evidence_coverage, gap_magnitude, priority_score};
pub use selector::{InitiativeSelector, SelectionOutcome};
pub use sizing::{Sizing, size_initiative};
