//! Accumulates per-month values and warnings into a [`PackPanel`].

use std::collections::BTreeMap;

use bizdiag_model::{MonthKey, MonthlyPanelRow, PackPanel, PackType};
use tracing::debug;

#[derive(Debug, Default)]
struct MonthAccumulator {
    values: BTreeMap<String, Option<f64>>,
    warnings: Vec<String>,
    source_rows: usize,
}

#[derive(Debug)]
pub(crate) struct PanelBuilder {
    pack: PackType,
    fields: Vec<String>,
    months: BTreeMap<MonthKey, MonthAccumulator>,
    warnings: Vec<String>,
    input_rows: usize,
    usable_rows: usize,
}

impl PanelBuilder {
    pub(crate) fn new(pack: PackType, fields: Vec<String>, input_rows: usize) -> Self {
        Self {
            pack,
            fields,
            months: BTreeMap::new(),
            warnings: Vec::new(),
            input_rows,
            usable_rows: 0,
        }
    }

    /// Pack-level warning that belongs to no month.
    pub(crate) fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// A row that contributes nothing.
    pub(crate) fn reject(&mut self, row_index: usize, message: String) {
        debug!(pack = %self.pack, row = row_index, "row rejected");
        self.warnings.push(message);
    }

    /// Warning attached to a month and to the pack.
    pub(crate) fn flag(&mut self, month: MonthKey, message: String) {
        self.month_mut(month).warnings.push(message.clone());
        self.warnings.push(message);
    }

    /// Register a usable row contributing to `month`.
    pub(crate) fn touch(&mut self, month: MonthKey) {
        self.month_mut(month).source_rows += 1;
    }

    pub(crate) fn mark_usable(&mut self) {
        self.usable_rows += 1;
    }

    pub(crate) fn contains(&self, month: MonthKey) -> bool {
        self.months.contains_key(&month)
    }

    /// Set a field, replacing any previous value.
    pub(crate) fn set(&mut self, month: MonthKey, field: &str, value: Option<f64>) {
        self.month_mut(month).values.insert(field.to_string(), value);
    }

    /// Add to a field; a null field becomes the value.
    pub(crate) fn add(&mut self, month: MonthKey, field: &str, value: f64) {
        let slot = self
            .month_mut(month)
            .values
            .entry(field.to_string())
            .or_insert(None);
        *slot = Some(slot.unwrap_or(0.0) + value);
    }

    fn month_mut(&mut self, month: MonthKey) -> &mut MonthAccumulator {
        let fields = &self.fields;
        self.months.entry(month).or_insert_with(|| MonthAccumulator {
            values: fields.iter().map(|field| (field.clone(), None)).collect(),
            ..MonthAccumulator::default()
        })
    }

    /// Close the panel. Month completeness is the fraction of `basis` fields
    /// with a value; pack completeness is the month mean scaled by the
    /// fraction of input rows that were usable.
    pub(crate) fn finish(self, basis: &[String]) -> PackPanel {
        let mut rows = Vec::with_capacity(self.months.len());
        for (month, accumulator) in self.months {
            let completeness_score = if basis.is_empty() {
                1.0
            } else {
                let present = basis
                    .iter()
                    .filter(|field| accumulator.values.get(*field).copied().flatten().is_some())
                    .count();
                present as f64 / basis.len() as f64
            };
            rows.push(MonthlyPanelRow {
                month,
                pack: self.pack,
                values: accumulator.values,
                completeness_score,
                warnings: accumulator.warnings,
                source_rows: accumulator.source_rows,
            });
        }

        let completeness_score = if rows.is_empty() || self.input_rows == 0 {
            0.0
        } else {
            let mean = rows.iter().map(|row| row.completeness_score).sum::<f64>() / rows.len() as f64;
            mean * self.usable_rows as f64 / self.input_rows as f64
        };

        PackPanel {
            pack: self.pack,
            fields: self.fields,
            rows,
            completeness_score,
            warnings: self.warnings,
            input_rows: self.input_rows,
            usable_rows: self.usable_rows,
        }
    }
}
