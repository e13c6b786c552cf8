use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pack::PackType;

/// How raw cells of a mapped column are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    None,
    ToNumber,
    ParseDate,
    ParseMonth,
}

impl Transform {
    pub fn as_str(self) -> &'static str {
        match self {
            Transform::None => "none",
            Transform::ToNumber => "to_number",
            Transform::ParseDate => "parse_date",
            Transform::ParseMonth => "parse_month",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How several source columns collapse into one canonical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// First non-null value in source column order.
    #[default]
    Coalesce,
    /// Sum of the non-null values; null when every source is null.
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub canonical_field: String,
    pub source_columns: Vec<String>,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub merge: MergePolicy,
    pub confidence: f32,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl FieldMapping {
    pub fn new(
        canonical_field: impl Into<String>,
        source_columns: Vec<String>,
        transform: Transform,
        confidence: f32,
    ) -> Self {
        Self {
            canonical_field: canonical_field.into(),
            source_columns,
            transform,
            merge: MergePolicy::default(),
            confidence,
            confirmed: false,
            rationale: None,
        }
    }

    /// A mapping supplied by a person; always full confidence.
    pub fn confirmed(
        canonical_field: impl Into<String>,
        source_columns: Vec<String>,
        transform: Transform,
    ) -> Self {
        Self {
            confirmed: true,
            ..Self::new(canonical_field, source_columns, transform, 1.0)
        }
    }

    #[must_use]
    pub fn with_merge(mut self, merge: MergePolicy) -> Self {
        self.merge = merge;
        self
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}

/// A canonical field the mapper could not fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingGap {
    pub canonical_field: String,
    pub required: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    pub pack: PackType,
    pub mappings: Vec<FieldMapping>,
    pub gaps: Vec<MappingGap>,
    pub unmapped_columns: Vec<String>,
}

impl MappingResult {
    pub fn mapping_for(&self, canonical_field: &str) -> Option<&FieldMapping> {
        self.mappings
            .iter()
            .find(|mapping| mapping.canonical_field == canonical_field)
    }

    pub fn mapped_count(&self) -> usize {
        self.mappings.len()
    }

    pub fn required_gaps(&self) -> impl Iterator<Item = &MappingGap> {
        self.gaps.iter().filter(|gap| gap.required)
    }

    /// Suggestions still waiting for a person to confirm them.
    pub fn pending_confirmation(&self) -> impl Iterator<Item = &FieldMapping> {
        self.mappings.iter().filter(|mapping| !mapping.confirmed)
    }

    pub fn mean_confidence(&self) -> Option<f32> {
        if self.mappings.is_empty() {
            return None;
        }
        let total: f32 = self.mappings.iter().map(|mapping| mapping.confidence).sum();
        Some(total / self.mappings.len() as f32)
    }
}
