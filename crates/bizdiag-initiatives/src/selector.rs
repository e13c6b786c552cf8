use std::time::Instant;

use bizdiag_config::{InitiativeSpec, VerticalConfig};
use bizdiag_llm::{Collaborator, CollaboratorError};
use bizdiag_model::{
    EligibilityOutcome, ExcludedInitiative, FactSet, ModeAssessment, NarrativeSource,
    RankedInitiative, SelectedInitiative, SelectionStage,
};
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::eligibility::check_eligibility;
use crate::narrative::narrate;
use crate::ranking::{
    assign_ranks, by_declared_weight, evidence_coverage, gap_magnitude, priority_score,
};
use crate::sizing::size_initiative;

/// Result of running the playbook through every selection stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub ranked: Vec<RankedInitiative>,
    pub excluded: Vec<ExcludedInitiative>,
    pub selected: Vec<SelectedInitiative>,
    pub narrative_source: NarrativeSource,
    #[serde(skip)]
    pub narrative_error: Option<CollaboratorError>,
}

/// Runs CANDIDATES → ELIGIBLE → SIZED → RANKED → SELECTED for one vertical.
#[derive(Debug, Clone, Copy)]
pub struct InitiativeSelector<'a> {
    config: &'a VerticalConfig,
}

struct Eligible<'a> {
    index: usize,
    spec: &'a InitiativeSpec,
    eligibility: EligibilityOutcome,
}

impl<'a> InitiativeSelector<'a> {
    pub fn new(config: &'a VerticalConfig) -> Self {
        Self { config }
    }

    /// Eligible, capped, sized and ranked initiatives, without narrative.
    pub fn rank(
        &self,
        mode: &ModeAssessment,
        facts: &FactSet,
    ) -> (Vec<RankedInitiative>, Vec<ExcludedInitiative>) {
        let mut excluded = Vec::new();
        let mut eligible = Vec::new();
        for (index, spec) in self.config.initiatives.iter().enumerate() {
            let eligibility = check_eligibility(spec, mode, facts);
            if eligibility.eligible {
                eligible.push(Eligible {
                    index,
                    spec,
                    eligibility,
                });
            } else {
                debug!(initiative = %spec.id, "not eligible");
                excluded.push(ExcludedInitiative {
                    id: spec.id.clone(),
                    title: spec.title.clone(),
                    stage: SelectionStage::Eligible,
                    reasons: eligibility.reasons,
                });
            }
        }

        // The cap is applied on declared weight, before any sizing.
        let cap = self.config.assumptions.max_initiatives.for_mode(mode.mode);
        eligible.sort_by(|a, b| {
            by_declared_weight(
                (a.spec.priority_weight, a.index),
                (b.spec.priority_weight, b.index),
            )
        });
        for dropped in eligible.split_off(cap.min(eligible.len())) {
            debug!(initiative = %dropped.spec.id, cap, "beyond mode cap");
            excluded.push(ExcludedInitiative {
                id: dropped.spec.id.clone(),
                title: dropped.spec.title.clone(),
                stage: SelectionStage::Sized,
                reasons: vec![format!("beyond the {} cap of {cap}", mode.mode)],
            });
        }

        let annualization = self.config.assumptions.annualization_factor;
        let mut ranked: Vec<RankedInitiative> = eligible
            .into_iter()
            .map(|candidate| {
                let spec = candidate.spec;
                let sizing = size_initiative(spec, facts, annualization);
                let (present, missing): (Vec<String>, Vec<String>) = spec
                    .evidence_keys
                    .iter()
                    .cloned()
                    .partition(|key| facts.contains(key));
                let confidence =
                    mode.confidence * evidence_coverage(spec.evidence_keys.len(), present.len());
                let gap = spec
                    .benchmark_gap
                    .as_ref()
                    .map(|gap| gap_magnitude(gap, facts));
                let score = priority_score(
                    spec.priority_weight,
                    confidence,
                    sizing.impact.map(|impact| impact.mid),
                    gap,
                );
                debug!(initiative = %spec.id, sized = sizing.impact.is_some(), ?gap, score, "sized");
                RankedInitiative {
                    id: spec.id.clone(),
                    title: spec.title.clone(),
                    category: spec.category.clone(),
                    eligibility: candidate.eligibility,
                    impact: sizing.impact,
                    sizing_basis: sizing.basis,
                    sizing_note: Some(sizing.note),
                    evidence_keys: present,
                    missing_evidence: missing,
                    confidence,
                    gap_magnitude: gap,
                    priority_weight: spec.priority_weight,
                    priority_score: score,
                    rank: 0,
                    declaration_index: candidate.index,
                }
            })
            .collect();
        assign_ranks(&mut ranked);

        excluded.sort_by_key(|excluded| {
            self.config
                .initiatives
                .iter()
                .position(|spec| spec.id == excluded.id)
        });
        (ranked, excluded)
    }

    /// Every stage, including the collaborator narrative with its fallback.
    pub fn select(
        &self,
        mode: &ModeAssessment,
        facts: &FactSet,
        collaborator: &dyn Collaborator,
    ) -> SelectionOutcome {
        let span = info_span!("initiatives", vertical = %self.config.vertical_id);
        let _guard = span.enter();
        let started = Instant::now();

        let (ranked, excluded) = self.rank(mode, facts);
        let narrative = narrate(collaborator, mode, facts, &ranked);

        info!(
            candidates = self.config.initiatives.len(),
            ranked = ranked.len(),
            excluded = excluded.len(),
            selected = narrative.selected.len(),
            narrative = ?narrative.source,
            duration_ms = started.elapsed().as_millis() as u64,
            "initiative selection complete"
        );
        SelectionOutcome {
            ranked,
            excluded,
            selected: narrative.selected,
            narrative_source: narrative.source,
            narrative_error: narrative.error,
        }
    }
}
