use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::month::MonthKey;
use crate::pack::PackType;

/// One month of one pack after normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPanelRow {
    pub month: MonthKey,
    pub pack: PackType,
    pub values: BTreeMap<String, Option<f64>>,
    pub completeness_score: f64,
    pub warnings: Vec<String>,
    /// Raw rows that contributed to this month.
    pub source_rows: usize,
}

impl MonthlyPanelRow {
    pub fn new(month: MonthKey, pack: PackType) -> Self {
        Self {
            month,
            pack,
            values: BTreeMap::new(),
            completeness_score: 0.0,
            warnings: Vec::new(),
            source_rows: 0,
        }
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}

/// Normalized output of one pack, rows ordered by month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackPanel {
    pub pack: PackType,
    pub fields: Vec<String>,
    pub rows: Vec<MonthlyPanelRow>,
    pub completeness_score: f64,
    pub warnings: Vec<String>,
    pub input_rows: usize,
    pub usable_rows: usize,
}

impl PackPanel {
    pub fn empty(pack: PackType) -> Self {
        Self {
            pack,
            fields: Vec::new(),
            rows: Vec::new(),
            completeness_score: 0.0,
            warnings: Vec::new(),
            input_rows: 0,
            usable_rows: 0,
        }
    }

    pub fn months(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.rows.iter().map(|row| row.month)
    }

    pub fn month_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, month: MonthKey) -> Option<&MonthlyPanelRow> {
        self.rows.iter().find(|row| row.month == month)
    }
}
