//! Mapping engine: greedy one-to-one assignment of columns to canonical fields.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use bizdiag_config::DataPackSpec;
use bizdiag_model::{FieldMapping, MappingGap, MappingResult, TableProfile};
use tracing::debug;

use crate::score::{ColumnScore, ScoringEngine};
use crate::types::ConfidenceThresholds;

/// Scores supplied from outside the heuristic, keyed by `(field, column)`.
pub type ScoreOverrides = BTreeMap<(String, String), f32>;

struct Candidate {
    field_idx: usize,
    column_idx: usize,
    score: ColumnScore,
}

/// Suggests mappings from the columns of one upload to the canonical fields
/// of one data pack.
///
/// Every column maps to at most one field and, except for fields declared
/// `multi_source`, every field takes at most one column. Candidates below
/// the confidence floor are never used. Scores at or above the high
/// threshold are auto-confirmed; the rest wait for a person.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper<'a> {
    pack: &'a DataPackSpec,
    thresholds: ConfidenceThresholds,
}

impl<'a> FieldMapper<'a> {
    pub fn new(pack: &'a DataPackSpec) -> Self {
        Self {
            pack,
            thresholds: ConfidenceThresholds::default(),
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn pack(&self) -> &'a DataPackSpec {
        self.pack
    }

    /// Heuristic suggestions only.
    pub fn suggest(&self, profile: &TableProfile) -> MappingResult {
        self.suggest_with_overrides(profile, &ScoreOverrides::new(), "override")
    }

    /// Suggestions where some `(field, column)` pairs carry a score from
    /// another source. Overridden scores still face the confidence floor.
    pub fn suggest_with_overrides(
        &self,
        profile: &TableProfile,
        overrides: &ScoreOverrides,
        override_source: &str,
    ) -> MappingResult {
        let scorer = ScoringEngine::new(self.pack);
        let mut candidates = Vec::new();
        let mut best_below_floor: BTreeMap<usize, (f32, usize)> = BTreeMap::new();

        for (field_idx, field) in self.pack.fields.iter().enumerate() {
            for (column_idx, column) in profile.columns.iter().enumerate() {
                let mut score = scorer.compute_score(column, field);
                if let Some(&value) = overrides.get(&(field.name.clone(), column.name.clone())) {
                    score = score.overridden(value, override_source);
                }
                if score.score >= self.thresholds.low {
                    candidates.push(Candidate {
                        field_idx,
                        column_idx,
                        score,
                    });
                } else {
                    let entry = best_below_floor.entry(field_idx).or_insert((0.0, column_idx));
                    if score.score > entry.0 {
                        *entry = (score.score, column_idx);
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .score
                .partial_cmp(&a.score.score)
                .unwrap_or(Ordering::Equal)
                .then(a.field_idx.cmp(&b.field_idx))
                .then(a.column_idx.cmp(&b.column_idx))
        });

        let mut assigned: BTreeMap<usize, Vec<&Candidate>> = BTreeMap::new();
        let mut used_columns = BTreeSet::new();
        for candidate in &candidates {
            if assigned.contains_key(&candidate.field_idx)
                || used_columns.contains(&candidate.column_idx)
            {
                continue;
            }
            used_columns.insert(candidate.column_idx);
            assigned.insert(candidate.field_idx, vec![candidate]);
        }

        // Multi-source fields absorb the remaining columns above the floor.
        for candidate in &candidates {
            if used_columns.contains(&candidate.column_idx) {
                continue;
            }
            let field = &self.pack.fields[candidate.field_idx];
            if !field.multi_source {
                continue;
            }
            if let Some(group) = assigned.get_mut(&candidate.field_idx) {
                used_columns.insert(candidate.column_idx);
                group.push(candidate);
            }
        }

        let mut mappings = Vec::new();
        let mut gaps = Vec::new();
        for (field_idx, field) in self.pack.fields.iter().enumerate() {
            match assigned.get(&field_idx) {
                Some(group) => {
                    let confidence = group
                        .iter()
                        .map(|candidate| candidate.score.score)
                        .fold(f32::INFINITY, f32::min);
                    let columns: Vec<String> = group
                        .iter()
                        .map(|candidate| profile.columns[candidate.column_idx].name.clone())
                        .collect();
                    let rationale = group
                        .iter()
                        .map(|candidate| candidate.score.explain())
                        .collect::<Vec<_>>()
                        .join(" | ");
                    let mut mapping = FieldMapping::new(
                        field.name.clone(),
                        columns,
                        field.field_type.default_transform(),
                        confidence,
                    )
                    .with_merge(field.merge)
                    .with_rationale(rationale);
                    mapping.confirmed = self.thresholds.is_auto_confirmed(confidence);
                    mappings.push(mapping);
                }
                None => {
                    let reason = gap_reason(
                        &candidates,
                        field_idx,
                        best_below_floor.get(&field_idx).copied(),
                        profile,
                        self.thresholds.low,
                    );
                    gaps.push(MappingGap {
                        canonical_field: field.name.clone(),
                        required: field.required,
                        reason,
                    });
                }
            }
        }

        let unmapped_columns = profile
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| !used_columns.contains(idx))
            .map(|(_, column)| column.name.clone())
            .collect();

        let result = MappingResult {
            pack: self.pack.pack_type,
            mappings,
            gaps,
            unmapped_columns,
        };
        debug!(
            pack = %self.pack.pack_type,
            mapped = result.mapped_count(),
            gaps = result.gaps.len(),
            pending = result.pending_confirmation().count(),
            "mapping suggested"
        );
        result
    }
}

fn gap_reason(
    candidates: &[Candidate],
    field_idx: usize,
    below_floor: Option<(f32, usize)>,
    profile: &TableProfile,
    floor: f32,
) -> String {
    if profile.columns.is_empty() {
        return "upload has no columns".to_string();
    }
    if let Some(taken) = candidates.iter().find(|c| c.field_idx == field_idx) {
        return format!(
            "best column '{}' was assigned to another field",
            profile.columns[taken.column_idx].name
        );
    }
    match below_floor {
        Some((score, column_idx)) if score > 0.0 => format!(
            "best column '{}' scored {:.2}, below the {:.2} floor",
            profile.columns[column_idx].name, score, floor
        ),
        _ => "no candidate column".to_string(),
    }
}
