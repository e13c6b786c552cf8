//! Collaborator-assisted mapping.
//!
//! The collaborator sees column metadata only: names, inferred types, null
//! fractions and unique counts. Never cell values. Its validated confidences
//! replace the heuristic score for the pairs it names and then go through the
//! same floor and assignment as every other candidate.

use std::collections::BTreeSet;

use bizdiag_config::DataPackSpec;
use bizdiag_llm::{Collaborator, CollaboratorError, CollaboratorRequest, request_structured};
use bizdiag_model::{MappingResult, TableProfile};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::engine::{FieldMapper, ScoreOverrides};

/// Task name used for mapping requests.
pub const MAPPING_TASK: &str = "mapping";

const MAPPING_SYSTEM: &str = "You map spreadsheet columns to canonical business fields. \
Return a single JSON object only: {\"mappings\": [{\"canonical_field\": string, \
\"source_columns\": [string], \"confidence\": number between 0 and 1, \"reasoning\": string}]}. \
Use only the field and column names provided.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingAdvice {
    pub mappings: Vec<AdviceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceEntry {
    pub canonical_field: String,
    pub source_columns: Vec<String>,
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

/// Build the metadata-only request for one pack.
pub fn build_request(pack: &DataPackSpec, profile: &TableProfile) -> CollaboratorRequest {
    let fields: Vec<_> = pack
        .fields
        .iter()
        .map(|field| {
            json!({
                "name": field.name,
                "required": field.required,
                "type": field.field_type,
                "synonyms": field.synonyms,
            })
        })
        .collect();
    let columns: Vec<_> = profile
        .columns
        .iter()
        .map(|column| {
            json!({
                "name": column.name,
                "inferred_type": column.inferred_type,
                "null_fraction": column.null_fraction,
                "unique_count": column.unique_count,
            })
        })
        .collect();
    let prompt = json!({
        "pack": pack.pack_type,
        "fields": fields,
        "columns": columns,
    });
    CollaboratorRequest::new(MAPPING_TASK, MAPPING_SYSTEM, prompt.to_string())
}

/// Problems with an advice document; empty when it is usable.
pub fn validate_advice(
    advice: &MappingAdvice,
    pack: &DataPackSpec,
    profile: &TableProfile,
) -> Vec<String> {
    let columns: BTreeSet<&str> = profile.columns.iter().map(|c| c.name.as_str()).collect();
    let mut problems = Vec::new();
    for entry in &advice.mappings {
        if pack.field(&entry.canonical_field).is_none() {
            problems.push(format!("unknown canonical field `{}`", entry.canonical_field));
        }
        for column in &entry.source_columns {
            if !columns.contains(column.as_str()) {
                problems.push(format!("unknown column `{column}`"));
            }
        }
        if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
            problems.push(format!(
                "confidence {} for `{}` is outside [0, 1]",
                entry.confidence, entry.canonical_field
            ));
        }
    }
    problems
}

/// Ask the collaborator for validated score overrides.
pub fn request_overrides(
    collaborator: &dyn Collaborator,
    pack: &DataPackSpec,
    profile: &TableProfile,
) -> Result<ScoreOverrides, CollaboratorError> {
    let request = build_request(pack, profile);
    let advice: MappingAdvice = request_structured(collaborator, &request, |advice| {
        validate_advice(advice, pack, profile)
    })?;
    let mut overrides = ScoreOverrides::new();
    for entry in advice.mappings {
        for column in entry.source_columns {
            overrides.insert((entry.canonical_field.clone(), column), entry.confidence);
        }
    }
    debug!(pack = %pack.pack_type, pairs = overrides.len(), "mapping advice accepted");
    Ok(overrides)
}

/// Mapping result plus the collaborator failure, if the heuristic path was
/// used because advice was unavailable or rejected.
#[derive(Debug, Clone)]
pub struct AssistedMapping {
    pub result: MappingResult,
    pub advice_error: Option<CollaboratorError>,
}

impl FieldMapper<'_> {
    /// Suggestions with collaborator advice when it is available and valid,
    /// heuristic-only otherwise.
    pub fn suggest_assisted(
        &self,
        profile: &TableProfile,
        collaborator: &dyn Collaborator,
    ) -> AssistedMapping {
        match request_overrides(collaborator, self.pack(), profile) {
            Ok(overrides) => AssistedMapping {
                result: self.suggest_with_overrides(profile, &overrides, collaborator.name()),
                advice_error: None,
            },
            Err(err) => {
                if err.is_reportable() {
                    info!(
                        pack = %self.pack().pack_type,
                        kind = err.kind(),
                        "mapping advice unavailable, using heuristic scores"
                    );
                }
                AssistedMapping {
                    result: self.suggest(profile),
                    advice_error: Some(err),
                }
            }
        }
    }
}
