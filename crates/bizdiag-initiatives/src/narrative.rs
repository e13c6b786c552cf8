//! Narrative selection over the ranked initiatives.
//!
//! The collaborator sees the fact set and ranked initiative metadata. It
//! never sees rows, eligibility reasoning or excluded initiatives. It may
//! pick a subset, reorder it and write the text, but every id must be a
//! ranked initiative, every cited key an existing fact and every number in
//! the text one it was shown. Anything else falls back to the template
//! narrative over the ranked list.

use std::collections::BTreeSet;

use bizdiag_llm::{Collaborator, CollaboratorError, CollaboratorRequest, request_structured};
use bizdiag_model::{
    FactSet, ModeAssessment, NarrativeSource, RankedInitiative, SelectedInitiative, format_number,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::grounding::GroundedNumbers;

/// Task name used for narrative requests.
pub const NARRATIVE_TASK: &str = "narrative";

const NARRATIVE_SYSTEM: &str = "You write short business diagnostics. \
Return a single JSON object only: {\"selected\": [{\"initiative_id\": string, \
\"explanation\": string, \"cited_evidence\": [string], \"assumptions\": [string], \
\"data_gaps\": [string]}]}. Choose only from the initiatives provided, cite only the \
evidence keys provided and do not invent numbers.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeDraft {
    pub selected: Vec<DraftEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftEntry {
    pub initiative_id: String,
    pub explanation: String,
    #[serde(default)]
    pub cited_evidence: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub data_gaps: Vec<String>,
}

/// Selected initiatives plus the collaborator failure when the template was
/// used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Narrative {
    pub selected: Vec<SelectedInitiative>,
    pub source: NarrativeSource,
    pub error: Option<CollaboratorError>,
}

/// Build the request from facts and ranked initiative metadata.
pub fn build_request(
    mode: &ModeAssessment,
    facts: &FactSet,
    ranked: &[RankedInitiative],
) -> CollaboratorRequest {
    request_for(&request_payload(mode, facts, ranked))
}

fn request_for(payload: &Value) -> CollaboratorRequest {
    CollaboratorRequest::new(NARRATIVE_TASK, NARRATIVE_SYSTEM, payload.to_string())
}

fn request_payload(mode: &ModeAssessment, facts: &FactSet, ranked: &[RankedInitiative]) -> Value {
    let facts: Vec<_> = facts
        .iter()
        .map(|fact| {
            json!({
                "key": fact.evidence_key,
                "label": fact.label,
                "value": fact.value,
                "value_text": fact.value_text,
                "unit": fact.unit,
                "period": fact.period,
            })
        })
        .collect();
    let initiatives: Vec<_> = ranked
        .iter()
        .map(|initiative| {
            json!({
                "id": initiative.id,
                "title": initiative.title,
                "category": initiative.category,
                "rank": initiative.rank,
                "priority_score": initiative.priority_score,
                "confidence": initiative.confidence,
                "gap_magnitude": initiative.gap_magnitude,
                "impact_low": initiative.impact_low(),
                "impact_mid": initiative.impact_mid(),
                "impact_high": initiative.impact_high(),
                "sizing_basis": initiative.sizing_basis,
                "evidence_keys": initiative.evidence_keys,
            })
        })
        .collect();
    json!({
        "mode": mode.mode,
        "mode_confidence": mode.confidence,
        "months_available": mode.months_available,
        "facts": facts,
        "initiatives": initiatives,
    })
}

/// Problems with a draft; empty when it is usable.
///
/// Numbers in the explanation, assumptions and data gaps are checked
/// against `grounded`, the numbers the collaborator was shown.
pub fn validate_draft(
    draft: &NarrativeDraft,
    ranked: &[RankedInitiative],
    facts: &FactSet,
    grounded: &GroundedNumbers,
) -> Vec<String> {
    let mut problems = Vec::new();
    if draft.selected.is_empty() && !ranked.is_empty() {
        problems.push("no initiative selected".to_string());
    }
    if draft.selected.len() > ranked.len() {
        problems.push(format!(
            "{} initiatives selected, at most {} allowed",
            draft.selected.len(),
            ranked.len()
        ));
    }
    let mut seen = BTreeSet::new();
    for entry in &draft.selected {
        let id = entry.initiative_id.as_str();
        if !ranked.iter().any(|initiative| initiative.id == id) {
            problems.push(format!("`{id}` is not a ranked initiative"));
        }
        if !seen.insert(id) {
            problems.push(format!("`{id}` selected twice"));
        }
        if entry.explanation.trim().is_empty() {
            problems.push(format!("`{id}` has no explanation"));
        }
        for key in &entry.cited_evidence {
            if !facts.contains(key) {
                problems.push(format!("`{id}` cites unknown evidence `{key}`"));
            }
        }
        let texts = std::iter::once(&entry.explanation)
            .chain(&entry.assumptions)
            .chain(&entry.data_gaps);
        for text in texts {
            for number in grounded.ungrounded(text) {
                problems.push(format!("`{id}` states {number}, which matches no fact"));
            }
        }
    }
    problems
}

/// Narrative from the collaborator when it returns a valid draft, from the
/// template otherwise.
pub fn narrate(
    collaborator: &dyn Collaborator,
    mode: &ModeAssessment,
    facts: &FactSet,
    ranked: &[RankedInitiative],
) -> Narrative {
    if ranked.is_empty() {
        return Narrative {
            selected: Vec::new(),
            source: NarrativeSource::Template,
            error: None,
        };
    }

    let payload = request_payload(mode, facts, ranked);
    let grounded = GroundedNumbers::from_json(&payload);
    let request = request_for(&payload);
    match request_structured(collaborator, &request, |draft: &NarrativeDraft| {
        validate_draft(draft, ranked, facts, &grounded)
    }) {
        Ok(draft) => {
            let selected: Vec<_> = draft
                .selected
                .into_iter()
                .filter_map(|entry| {
                    let initiative = ranked.iter().find(|r| r.id == entry.initiative_id)?;
                    Some(from_draft(initiative, entry, mode))
                })
                .collect();
            debug!(selected = selected.len(), "narrative draft accepted");
            Narrative {
                selected,
                source: NarrativeSource::Llm,
                error: None,
            }
        }
        Err(err) => {
            if err.is_reportable() {
                info!(kind = err.kind(), "narrative unavailable, using template text");
            }
            Narrative {
                selected: ranked
                    .iter()
                    .map(|initiative| template_selection(initiative, facts, mode))
                    .collect(),
                source: NarrativeSource::Template,
                error: Some(err),
            }
        }
    }
}

fn from_draft(
    initiative: &RankedInitiative,
    entry: DraftEntry,
    mode: &ModeAssessment,
) -> SelectedInitiative {
    let assumptions = if entry.assumptions.is_empty() {
        template_assumptions(initiative, mode)
    } else {
        entry.assumptions
    };
    SelectedInitiative {
        initiative: initiative.clone(),
        explanation: entry.explanation,
        cited_evidence: entry.cited_evidence,
        assumptions,
        data_gaps: entry.data_gaps,
        narrative_source: NarrativeSource::Llm,
    }
}

/// Deterministic narrative for one ranked initiative.
pub fn template_selection(
    initiative: &RankedInitiative,
    facts: &FactSet,
    mode: &ModeAssessment,
) -> SelectedInitiative {
    let mut cited: Vec<String> = initiative
        .evidence_keys
        .iter()
        .filter(|key| facts.contains(key))
        .cloned()
        .collect();
    if let Some(basis) = &initiative.sizing_basis
        && facts.contains(basis)
        && !cited.contains(basis)
    {
        cited.push(basis.clone());
    }

    let mut explanation = format!(
        "{} ranks #{} with a priority score of {}.",
        initiative.title,
        initiative.rank,
        rounded(initiative.priority_score)
    );
    match initiative.impact {
        Some(impact) => explanation.push_str(&format!(
            " Estimated annual impact is {} to {}, most likely {}.",
            rounded(impact.low),
            rounded(impact.high),
            rounded(impact.mid)
        )),
        None => explanation.push_str(" Impact could not be sized from the data provided."),
    }
    let evidence: Vec<String> = cited
        .iter()
        .filter_map(|key| facts.get(key))
        .map(|fact| match (fact.value, &fact.value_text) {
            (Some(value), _) => format!("{} = {}", fact.evidence_key, rounded(value)),
            (None, Some(text)) => format!("{} = {text}", fact.evidence_key),
            (None, None) => fact.evidence_key.clone(),
        })
        .collect();
    if !evidence.is_empty() {
        explanation.push_str(&format!(" Evidence: {}.", evidence.join(", ")));
    }

    let mut data_gaps: Vec<String> = initiative
        .missing_evidence
        .iter()
        .map(|key| format!("`{key}` unavailable"))
        .collect();
    if initiative.impact.is_none()
        && let Some(note) = &initiative.sizing_note
    {
        data_gaps.push(note.clone());
    }

    SelectedInitiative {
        initiative: initiative.clone(),
        explanation,
        cited_evidence: cited,
        assumptions: template_assumptions(initiative, mode),
        data_gaps,
        narrative_source: NarrativeSource::Template,
    }
}

fn template_assumptions(initiative: &RankedInitiative, mode: &ModeAssessment) -> Vec<String> {
    let mut assumptions = Vec::new();
    if initiative.impact.is_some()
        && let Some(note) = &initiative.sizing_note
    {
        assumptions.push(format!("Sized as {note}."));
    }
    assumptions.push(format!(
        "Confidence {} reflects {} at {} and the share of supporting evidence available.",
        rounded(initiative.confidence),
        mode.mode,
        rounded(mode.confidence)
    ));
    assumptions
}

fn rounded(value: f64) -> String {
    format_number((value * 100.0).round() / 100.0)
}
