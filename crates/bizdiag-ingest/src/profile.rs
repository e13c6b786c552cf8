//! Column profiling.
//!
//! Builds one [`ColumnProfile`] per column: inferred semantic type, null
//! fraction, distinct counts, a handful of sample values and, for numeric
//! columns, min/max/mean/median. Profiling never fails; an empty upload yields
//! an empty profile.

use std::collections::BTreeSet;

use bizdiag_model::{
    CellValue, ColumnProfile, InferredType, NumericStats, RawTable, TableProfile,
};
use tracing::debug;

use crate::cell::{cell_number, parse_period_text};

const CATEGORICAL_MAX_UNIQUE: usize = 20;
const CATEGORICAL_MAX_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct ProfileOptions {
    pub sample_size: usize,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self { sample_size: 5 }
    }
}

impl ProfileOptions {
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }
}

pub fn profile_table(table: &RawTable) -> TableProfile {
    profile_table_with_options(table, ProfileOptions::default())
}

pub fn profile_table_with_options(table: &RawTable, options: ProfileOptions) -> TableProfile {
    let columns: Vec<ColumnProfile> = table
        .columns
        .iter()
        .map(|name| profile_column(name, table.column_values(name), options))
        .collect();
    debug!(
        source = %table.source,
        columns = columns.len(),
        rows = table.row_count(),
        "profiled table"
    );
    TableProfile {
        source: table.source.clone(),
        row_count: table.row_count(),
        columns,
    }
}

fn profile_column<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a CellValue>,
    options: ProfileOptions,
) -> ColumnProfile {
    let mut row_count = 0usize;
    let mut null_count = 0usize;
    let mut numeric_values = Vec::new();
    let mut date_like = 0usize;
    let mut uniques = BTreeSet::new();
    let mut samples = Vec::new();

    for cell in cells {
        row_count += 1;
        if cell.is_missing() {
            null_count += 1;
            continue;
        }
        let display = cell.to_string();
        if uniques.insert(display.clone()) && samples.len() < options.sample_size {
            samples.push(display);
        }
        if let Some(value) = cell_number(cell) {
            numeric_values.push(value);
        }
        let is_date = match cell {
            CellValue::Date(_) => true,
            CellValue::Text(text) => parse_period_text(text).is_some(),
            CellValue::Number(_) | CellValue::Missing => false,
        };
        if is_date {
            date_like += 1;
        }
    }

    let non_null = row_count - null_count;
    let unique_count = uniques.len();
    let unique_ratio = if non_null == 0 {
        0.0
    } else {
        unique_count as f64 / non_null as f64
    };
    let inferred_type = infer_type(non_null, numeric_values.len(), date_like, unique_count, unique_ratio);
    let stats = if inferred_type == InferredType::Numeric {
        numeric_stats(&mut numeric_values)
    } else {
        None
    };

    ColumnProfile {
        name: name.to_string(),
        inferred_type,
        row_count,
        null_count,
        null_fraction: if row_count == 0 {
            1.0
        } else {
            null_count as f64 / row_count as f64
        },
        unique_count,
        unique_ratio,
        sample_values: samples,
        stats,
    }
}

fn infer_type(
    non_null: usize,
    numeric: usize,
    date_like: usize,
    unique_count: usize,
    unique_ratio: f64,
) -> InferredType {
    if non_null == 0 {
        return InferredType::Empty;
    }
    // A single stray cell keeps a column textual.
    if date_like == non_null && date_like >= numeric {
        InferredType::Date
    } else if numeric == non_null {
        InferredType::Numeric
    } else if unique_count <= CATEGORICAL_MAX_UNIQUE && unique_ratio <= CATEGORICAL_MAX_RATIO {
        InferredType::Categorical
    } else {
        InferredType::Text
    }
}

fn numeric_stats(values: &mut [f64]) -> Option<NumericStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 1 {
        values[count / 2]
    } else {
        (values[count / 2 - 1] + values[count / 2]) / 2.0
    };
    Some(NumericStats {
        min: values[0],
        max: values[count - 1],
        mean,
        median,
    })
}
