#![deny(unsafe_code)]

//! Column-to-canonical-field mapping.
//!
//! [`FieldMapper`] scores every uploaded column against every canonical
//! field of a data pack and assigns them greedily. A collaborator may
//! override scores ([`FieldMapper::suggest_assisted`]) and people may
//! confirm mappings ([`apply_confirmed`]).

pub mod advice;
pub mod engine;
pub mod error;
pub mod merge;
pub mod score;
pub mod types;

pub use advice::{AdviceEntry, AssistedMapping, MAPPING_TASK, MappingAdvice};
pub use engine::{FieldMapper, ScoreOverrides};
pub use error::MappingError;
pub use merge::apply_confirmed;
pub use score::{ColumnScore, ScoreComponent, ScoringEngine, normalize};
pub use types::{ConfidenceLevel, ConfidenceThresholds, count_by_level};
