//! Entry point: structural checks and dispatch to the pack normalizers.

use std::time::Instant;

use bizdiag_config::{DataPackSpec, keys};
use bizdiag_model::{
    FieldMapping, MappingResult, MergePolicy, PackPanel, PackType, RawRow, RawTable, Transform,
};
use tracing::{info, info_span};

use crate::builder::PanelBuilder;
use crate::error::{NormalizeError, Result};
use crate::transform::{TransformIssue, read_number};
use crate::{labor, pnl, revenue};

/// A numeric canonical field and the columns feeding it.
#[derive(Debug, Clone)]
pub(crate) struct Measure<'a> {
    pub name: &'a str,
    pub columns: &'a [String],
    pub transform: Transform,
    pub merge: MergePolicy,
}

impl Measure<'_> {
    pub(crate) fn read(&self, row: &RawRow, issues: &mut Vec<TransformIssue>) -> Option<f64> {
        read_number(row, self.columns, self.transform, self.merge, issues)
    }
}

/// Validated view of one pack's upload and mapping.
pub(crate) struct MappedPack<'a> {
    pub spec: &'a DataPackSpec,
    pub table: &'a RawTable,
    pub mapping: &'a MappingResult,
    pub measures: Vec<Measure<'a>>,
}

impl<'a> MappedPack<'a> {
    pub(crate) fn columns_for(&self, field: &str) -> Option<&'a [String]> {
        self.mapping
            .mapping_for(field)
            .map(|mapping: &'a FieldMapping| mapping.source_columns.as_slice())
            .filter(|columns| !columns.is_empty())
    }

    pub(crate) fn measure_names(&self) -> Vec<String> {
        self.measures.iter().map(|m| m.name.to_string()).collect()
    }

    /// Required numeric fields; month completeness is measured over these.
    pub(crate) fn completeness_basis(&self) -> Vec<String> {
        let required: Vec<String> = self
            .spec
            .measure_fields()
            .filter(|field| field.required)
            .map(|field| field.name.clone())
            .collect();
        if required.is_empty() {
            self.measure_names()
        } else {
            required
        }
    }

    pub(crate) fn builder(&self, extra_fields: &[&str]) -> PanelBuilder {
        let mut fields = self.measure_names();
        for extra in extra_fields {
            if !fields.iter().any(|field| field.as_str() == *extra) {
                fields.push((*extra).to_string());
            }
        }
        PanelBuilder::new(self.spec.pack_type, fields, self.table.row_count())
    }
}

/// The field that places a row in time for each pack.
pub fn primary_key_field(pack: PackType) -> &'static str {
    match pack {
        PackType::Pnl => keys::MONTH,
        PackType::Revenue => keys::TRANSACTION_DATE,
        PackType::Labor => keys::PAY_PERIOD_START,
    }
}

fn check_structure(spec: &DataPackSpec, table: &RawTable, mapping: &MappingResult) -> Result<()> {
    let pack = spec.pack_type;
    if table.columns.is_empty() {
        return Err(NormalizeError::NoColumns { pack });
    }
    let key = primary_key_field(pack);
    let required = spec
        .required_fields()
        .map(|field| field.name.as_str())
        .chain(std::iter::once(key));
    for field in required {
        let mapped = mapping
            .mapping_for(field)
            .is_some_and(|mapping| !mapping.source_columns.is_empty());
        if !mapped {
            return Err(NormalizeError::MissingRequiredField {
                pack,
                field: field.to_string(),
            });
        }
    }
    for field_mapping in &mapping.mappings {
        for column in &field_mapping.source_columns {
            if !table.has_column(column) {
                return Err(NormalizeError::ColumnNotFound {
                    pack,
                    column: column.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Normalize one pack's upload into monthly panel rows.
///
/// Fails only on structural problems: no columns, a required field with no
/// mapped column, or a mapping naming a column the upload lacks. Row-level
/// problems degrade completeness and add warnings.
pub fn normalize_pack(
    spec: &DataPackSpec,
    table: &RawTable,
    mapping: &MappingResult,
) -> Result<PackPanel> {
    let pack = spec.pack_type;
    let span = info_span!("normalize", pack = %pack);
    let _guard = span.enter();
    let started = Instant::now();

    check_structure(spec, table, mapping)?;

    let measures = spec
        .measure_fields()
        .filter_map(|field| {
            let field_mapping = mapping.mapping_for(&field.name)?;
            (!field_mapping.source_columns.is_empty()).then_some(Measure {
                name: field.name.as_str(),
                columns: field_mapping.source_columns.as_slice(),
                transform: field_mapping.transform,
                merge: field_mapping.merge,
            })
        })
        .collect();
    let mapped = MappedPack {
        spec,
        table,
        mapping,
        measures,
    };

    let panel = match pack {
        PackType::Pnl => pnl::normalize(&mapped),
        PackType::Revenue => revenue::normalize(&mapped),
        PackType::Labor => labor::normalize(&mapped),
    };

    info!(
        pack = %pack,
        input_rows = panel.input_rows,
        usable_rows = panel.usable_rows,
        months = panel.month_count(),
        completeness = panel.completeness_score,
        warnings = panel.warnings.len(),
        duration_ms = started.elapsed().as_millis() as u64,
        "pack normalized"
    );
    Ok(panel)
}
