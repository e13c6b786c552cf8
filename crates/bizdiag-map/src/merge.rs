//! Merging human-confirmed mappings into suggestions.

use std::collections::{BTreeMap, BTreeSet};

use bizdiag_config::DataPackSpec;
use bizdiag_model::{FieldMapping, MappingGap, MappingResult, Transform};

use crate::error::MappingError;

/// Replace suggestions with confirmed mappings.
///
/// A confirmed mapping wins over the suggestion for the same field. A
/// suggestion that uses a column claimed by a confirmed mapping is dropped
/// and its field becomes a gap. Confirmed mappings must name declared fields
/// and existing columns, may not share a column, and must use a transform
/// that can read the field's type.
pub fn apply_confirmed(
    suggested: MappingResult,
    confirmed: &[FieldMapping],
    pack: &DataPackSpec,
    columns: &[String],
) -> Result<MappingResult, MappingError> {
    let known_columns: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
    let mut claimed: BTreeMap<&str, &str> = BTreeMap::new();
    let mut by_field: BTreeMap<&str, FieldMapping> = BTreeMap::new();

    for mapping in confirmed {
        let Some(field) = pack.field(&mapping.canonical_field) else {
            return Err(MappingError::FieldNotFound(mapping.canonical_field.clone()));
        };
        for column in &mapping.source_columns {
            if !known_columns.contains(column.as_str()) {
                return Err(MappingError::ColumnNotFound(column.clone()));
            }
            if let Some(owner) = claimed.insert(column.as_str(), field.name.as_str()) {
                return Err(MappingError::ColumnAlreadyUsed {
                    column: column.clone(),
                    field: owner.to_string(),
                });
            }
        }
        let mut accepted = mapping.clone();
        accepted.confirmed = true;
        accepted.confidence = 1.0;
        if accepted.transform == Transform::None {
            accepted.transform = field.field_type.default_transform();
        }
        if !field.field_type.accepts(accepted.transform) {
            return Err(MappingError::TransformMismatch {
                field: field.name.clone(),
                transform: accepted.transform,
            });
        }
        by_field.insert(field.name.as_str(), accepted);
    }

    let mut suggestions: BTreeMap<String, FieldMapping> = suggested
        .mappings
        .into_iter()
        .map(|mapping| (mapping.canonical_field.clone(), mapping))
        .collect();
    let previous_gaps: BTreeMap<String, MappingGap> = suggested
        .gaps
        .into_iter()
        .map(|gap| (gap.canonical_field.clone(), gap))
        .collect();

    let mut mappings = Vec::new();
    let mut gaps = Vec::new();
    for field in &pack.fields {
        if let Some(mapping) = by_field.remove(field.name.as_str()) {
            mappings.push(mapping);
            continue;
        }
        match suggestions.remove(&field.name) {
            Some(mapping)
                if mapping
                    .source_columns
                    .iter()
                    .any(|column| claimed.contains_key(column.as_str())) =>
            {
                gaps.push(MappingGap {
                    canonical_field: field.name.clone(),
                    required: field.required,
                    reason: "suggested column was claimed by a confirmed mapping".to_string(),
                });
            }
            Some(mapping) => mappings.push(mapping),
            None => gaps.push(previous_gaps.get(&field.name).cloned().unwrap_or_else(|| {
                MappingGap {
                    canonical_field: field.name.clone(),
                    required: field.required,
                    reason: "no candidate column".to_string(),
                }
            })),
        }
    }

    let used: BTreeSet<&str> = mappings
        .iter()
        .flat_map(|mapping| mapping.source_columns.iter().map(String::as_str))
        .collect();
    let unmapped_columns = columns
        .iter()
        .filter(|column| !used.contains(column.as_str()))
        .cloned()
        .collect();

    Ok(MappingResult {
        pack: suggested.pack,
        mappings,
        gaps,
        unmapped_columns,
    })
}
