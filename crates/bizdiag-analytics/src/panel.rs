//! Outer join of the per-pack panels on month.

use std::collections::{BTreeMap, BTreeSet};

use bizdiag_model::{MonthKey, PackPanel, PackType};
use serde::Serialize;

/// Months covered by one pack and how complete its data was.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackCoverage {
    pub pack: PackType,
    pub months: BTreeSet<MonthKey>,
    pub completeness: f64,
}

impl PackCoverage {
    pub fn from_panel(panel: &PackPanel) -> Self {
        Self {
            pack: panel.pack,
            months: panel.months().collect(),
            completeness: panel.completeness_score,
        }
    }
}

/// Every field of every pack, keyed by month.
///
/// When two packs supply the same field for the same month, the pack that
/// sorts first in [`PackType`] order wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyPanel {
    months: BTreeSet<MonthKey>,
    values: BTreeMap<String, BTreeMap<MonthKey, f64>>,
    sources: BTreeMap<String, BTreeSet<PackType>>,
    coverage: Vec<PackCoverage>,
}

impl MonthlyPanel {
    pub fn assemble(panels: &[PackPanel]) -> Self {
        let mut ordered: Vec<&PackPanel> = panels.iter().filter(|panel| !panel.is_empty()).collect();
        ordered.sort_by_key(|panel| panel.pack);

        let mut assembled = MonthlyPanel::default();
        for panel in ordered {
            assembled.coverage.push(PackCoverage::from_panel(panel));
            for row in &panel.rows {
                assembled.months.insert(row.month);
                for (field, value) in &row.values {
                    let Some(value) = value else {
                        continue;
                    };
                    let series = assembled.values.entry(field.clone()).or_default();
                    if !series.contains_key(&row.month) {
                        series.insert(row.month, *value);
                        assembled
                            .sources
                            .entry(field.clone())
                            .or_default()
                            .insert(panel.pack);
                    }
                }
            }
        }
        assembled
    }

    pub fn months(&self) -> impl Iterator<Item = MonthKey> + '_ {
        self.months.iter().copied()
    }

    pub fn month_count(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn first_month(&self) -> Option<MonthKey> {
        self.months.first().copied()
    }

    pub fn last_month(&self) -> Option<MonthKey> {
        self.months.last().copied()
    }

    /// Fields with at least one value, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn value(&self, field: &str, month: MonthKey) -> Option<f64> {
        self.values.get(field).and_then(|series| series.get(&month)).copied()
    }

    /// Non-null values of `field` in month order.
    pub fn series(&self, field: &str) -> Vec<(MonthKey, f64)> {
        self.values
            .get(field)
            .map(|series| series.iter().map(|(month, value)| (*month, *value)).collect())
            .unwrap_or_default()
    }

    /// Packs that supplied at least one value of `field`, joined as `PNL/LABOR`.
    pub fn source_label(&self, field: &str) -> String {
        self.sources
            .get(field)
            .map(|packs| {
                packs
                    .iter()
                    .map(|pack| pack.as_str())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// Packs with at least one month, in precedence order.
    pub fn coverage(&self) -> &[PackCoverage] {
        &self.coverage
    }

    pub fn packs_present(&self) -> Vec<PackType> {
        self.coverage.iter().map(|coverage| coverage.pack).collect()
    }

    /// Mean completeness of the packs present; zero without any.
    pub fn completeness(&self) -> f64 {
        if self.coverage.is_empty() {
            return 0.0;
        }
        let total: f64 = self.coverage.iter().map(|coverage| coverage.completeness).sum();
        total / self.coverage.len() as f64
    }

    /// `2024-01..2024-12`, or a single month, or empty.
    pub fn window_label(&self) -> String {
        match (self.first_month(), self.last_month()) {
            (Some(first), Some(last)) if first == last => first.to_string(),
            (Some(first), Some(last)) => format!("{first}..{last}"),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bizdiag_model::MonthlyPanelRow;

    use super::*;

    fn month(m: u32) -> MonthKey {
        MonthKey::new(2024, m).unwrap()
    }

    fn panel(pack: PackType, rows: Vec<(u32, Vec<(&str, Option<f64>)>)>) -> PackPanel {
        let mut panel = PackPanel::empty(pack);
        panel.completeness_score = 1.0;
        for (m, values) in rows {
            let mut row = MonthlyPanelRow::new(month(m), pack);
            for (field, value) in values {
                row.values.insert(field.to_string(), value);
            }
            panel.rows.push(row);
        }
        panel
    }

    #[test]
    fn outer_join_keeps_months_from_every_pack() {
        let pnl = panel(
            PackType::Pnl,
            vec![(1, vec![("revenue", Some(100.0))]), (2, vec![("revenue", Some(110.0))])],
        );
        let labor = panel(PackType::Labor, vec![(3, vec![("labor", Some(40.0))])]);

        let assembled = MonthlyPanel::assemble(&[labor, pnl]);

        assert_eq!(assembled.months().collect::<Vec<_>>(), vec![month(1), month(2), month(3)]);
        assert_eq!(assembled.value("revenue", month(3)), None);
        assert_eq!(assembled.value("labor", month(3)), Some(40.0));
        assert_eq!(assembled.packs_present(), vec![PackType::Pnl, PackType::Labor]);
        assert_eq!(assembled.window_label(), "2024-01..2024-03");
    }

    #[test]
    fn pnl_wins_field_collisions() {
        let pnl = panel(
            PackType::Pnl,
            vec![(1, vec![("labor", Some(30.0))]), (2, vec![("labor", None)])],
        );
        let labor = panel(
            PackType::Labor,
            vec![(1, vec![("labor", Some(35.0))]), (2, vec![("labor", Some(36.0))])],
        );

        let assembled = MonthlyPanel::assemble(&[labor, pnl]);

        assert_eq!(assembled.value("labor", month(1)), Some(30.0));
        assert_eq!(assembled.value("labor", month(2)), Some(36.0));
        assert_eq!(assembled.source_label("labor"), "PNL/LABOR");
    }

    #[test]
    fn empty_panels_are_not_present() {
        let assembled = MonthlyPanel::assemble(&[PackPanel::empty(PackType::Revenue)]);
        assert!(assembled.is_empty());
        assert!(assembled.packs_present().is_empty());
        assert_eq!(assembled.completeness(), 0.0);
        assert_eq!(assembled.window_label(), "");
    }
}
