//! Fuzzy matching and scoring for column-to-field mapping.
//!
//! Jaro-Winkler similarity over normalized names is the base, adjusted by
//! token overlap, type compatibility and the column's null fraction. Every
//! adjustment is recorded so a suggestion can explain itself.

use std::collections::BTreeSet;

use bizdiag_config::{CanonicalField, DataPackSpec, FieldType};
use bizdiag_model::{ColumnProfile, InferredType};
use rapidfuzz::distance::jaro_winkler;

const TOKEN_OVERLAP_BOOST: f32 = 1.05;
const TYPE_MISMATCH_PENALTY: f32 = 0.6;
const TYPE_SOFT_MISMATCH_PENALTY: f32 = 0.85;
const NULL_PENALTY_WEIGHT: f32 = 0.5;

/// Score for a single column-field pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScore {
    /// Final confidence score, clamped to `[0, 1]`.
    pub score: f32,
    /// Breakdown of score components for explainability.
    pub explanation: Vec<ScoreComponent>,
}

impl ColumnScore {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        self.explanation
            .iter()
            .map(|c| format!("{}: {:.0}% ({})", c.name, c.value * 100.0, c.description))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Replace the heuristic score with an externally supplied one.
    pub(crate) fn overridden(mut self, score: f32, source: &str) -> Self {
        self.explanation.push(ScoreComponent {
            name: "Override",
            value: score,
            description: format!("score set by {source}"),
        });
        self.score = score.clamp(0.0, 1.0);
        self
    }
}

/// A component contributing to the final score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreComponent {
    pub name: &'static str,
    /// Base value for similarity, relative adjustment for boosts and penalties.
    pub value: f32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeFit {
    Compatible,
    Soft,
    Mismatch,
}

/// Scores columns of one uploaded table against the canonical fields of a pack.
#[derive(Debug, Clone, Copy)]
pub struct ScoringEngine<'a> {
    pack: &'a DataPackSpec,
}

impl<'a> ScoringEngine<'a> {
    pub fn new(pack: &'a DataPackSpec) -> Self {
        Self { pack }
    }

    pub fn pack(&self) -> &'a DataPackSpec {
        self.pack
    }

    /// Score a column against a field by name.
    ///
    /// Returns `None` if the field is not declared for the pack.
    pub fn score(&self, column: &ColumnProfile, field_name: &str) -> Option<ColumnScore> {
        let field = self.pack.field(field_name)?;
        Some(self.compute_score(column, field))
    }

    pub(crate) fn compute_score(&self, column: &ColumnProfile, field: &CanonicalField) -> ColumnScore {
        let mut components = Vec::new();
        let normalized_col = normalize(&column.name);

        let mut score = match exact_match(&normalized_col, field) {
            Some(kind) => {
                components.push(ScoreComponent {
                    name: kind,
                    value: 1.0,
                    description: format!("'{}' matches '{}'", column.name, field.name),
                });
                1.0
            }
            None => {
                let (base, against) = best_similarity(&normalized_col, field);
                components.push(ScoreComponent {
                    name: "Name similarity",
                    value: base,
                    description: format!("'{}' vs '{}'", column.name, against),
                });
                let mut score = base;
                if has_token_overlap(&normalized_col, field) {
                    score *= TOKEN_OVERLAP_BOOST;
                    components.push(ScoreComponent {
                        name: "Token overlap",
                        value: TOKEN_OVERLAP_BOOST - 1.0,
                        description: "shares a word with the field or a synonym".into(),
                    });
                }
                score
            }
        };

        match type_fit(field.field_type, column.inferred_type) {
            TypeFit::Compatible => {}
            TypeFit::Soft => {
                score *= TYPE_SOFT_MISMATCH_PENALTY;
                components.push(ScoreComponent {
                    name: "Type uncertain",
                    value: TYPE_SOFT_MISMATCH_PENALTY - 1.0,
                    description: format!(
                        "field expects {}, column looks {}",
                        field_type_name(field.field_type),
                        column.inferred_type.as_str()
                    ),
                });
            }
            TypeFit::Mismatch => {
                score *= TYPE_MISMATCH_PENALTY;
                components.push(ScoreComponent {
                    name: "Type mismatch",
                    value: TYPE_MISMATCH_PENALTY - 1.0,
                    description: format!(
                        "field expects {}, column is {}",
                        field_type_name(field.field_type),
                        column.inferred_type.as_str()
                    ),
                });
            }
        }

        if column.null_fraction > 0.0 {
            let factor = 1.0 - NULL_PENALTY_WEIGHT * column.null_fraction as f32;
            score *= factor;
            components.push(ScoreComponent {
                name: "Null penalty",
                value: factor - 1.0,
                description: format!("{:.0}% of cells are empty", column.null_fraction * 100.0),
            });
        }

        ColumnScore {
            score: score.clamp(0.0, 1.0),
            explanation: components,
        }
    }
}

fn exact_match(normalized_col: &str, field: &CanonicalField) -> Option<&'static str> {
    if normalize(&field.name) == normalized_col {
        return Some("Exact match");
    }
    field
        .synonyms
        .iter()
        .any(|synonym| normalize(synonym) == normalized_col)
        .then_some("Synonym match")
}

fn best_similarity<'f>(normalized_col: &str, field: &'f CanonicalField) -> (f32, &'f str) {
    let mut best = (0.0_f32, field.name.as_str());
    for candidate in std::iter::once(&field.name).chain(field.synonyms.iter()) {
        let similarity =
            jaro_winkler::similarity(normalized_col.chars(), normalize(candidate).chars()) as f32;
        if similarity > best.0 {
            best = (similarity, candidate.as_str());
        }
    }
    best
}

fn has_token_overlap(normalized_col: &str, field: &CanonicalField) -> bool {
    let column_tokens = token_set(normalized_col);
    std::iter::once(&field.name)
        .chain(field.synonyms.iter())
        .any(|candidate| {
            token_set(&normalize(candidate))
                .intersection(&column_tokens)
                .any(|token| !is_generic_token(token))
        })
}

fn type_fit(expected: FieldType, inferred: InferredType) -> TypeFit {
    match (expected, inferred) {
        (_, InferredType::Empty) | (FieldType::Text, _) => TypeFit::Compatible,
        (FieldType::Numeric, InferredType::Numeric) => TypeFit::Compatible,
        (FieldType::Numeric, _) => TypeFit::Mismatch,
        (FieldType::Date, InferredType::Date) => TypeFit::Compatible,
        (FieldType::Date, InferredType::Categorical | InferredType::Text) => TypeFit::Soft,
        (FieldType::Date, InferredType::Numeric) => TypeFit::Mismatch,
        (FieldType::Month, InferredType::Numeric) => TypeFit::Soft,
        (FieldType::Month, _) => TypeFit::Compatible,
    }
}

fn field_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Numeric => "numeric",
        FieldType::Date => "date",
        FieldType::Month => "month",
        FieldType::Text => "text",
    }
}

fn token_set(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

fn is_generic_token(token: &str) -> bool {
    matches!(
        token,
        "total" | "amount" | "amt" | "net" | "gross" | "date" | "number" | "num" | "no" | "of"
            | "and" | "the"
    )
}

/// Normalize a name for comparison.
///
/// Lowercases, treats every non-alphanumeric character as a separator and
/// collapses whitespace.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
