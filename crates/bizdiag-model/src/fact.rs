//! Evidence-keyed analytics facts.
//!
//! A [`FactSet`] is the only data a narrative layer may cite. Keys are unique
//! within a set and facts keep their insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactUnit {
    Currency,
    Percent,
    Ratio,
    Count,
    Hours,
    Months,
    Score,
    Flag,
    Number,
}

impl FactUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            FactUnit::Currency => "currency",
            FactUnit::Percent => "percent",
            FactUnit::Ratio => "ratio",
            FactUnit::Count => "count",
            FactUnit::Hours => "hours",
            FactUnit::Months => "months",
            FactUnit::Score => "score",
            FactUnit::Flag => "flag",
            FactUnit::Number => "number",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsFact {
    pub evidence_key: String,
    pub label: String,
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_text: Option<String>,
    pub unit: FactUnit,
    pub period: String,
    pub source: String,
}

impl AnalyticsFact {
    pub fn numeric(
        evidence_key: impl Into<String>,
        label: impl Into<String>,
        value: f64,
        unit: FactUnit,
    ) -> Self {
        Self {
            evidence_key: evidence_key.into(),
            label: label.into(),
            value: Some(value),
            value_text: None,
            unit,
            period: String::new(),
            source: String::new(),
        }
    }

    pub fn text(
        evidence_key: impl Into<String>,
        label: impl Into<String>,
        value_text: impl Into<String>,
        unit: FactUnit,
    ) -> Self {
        Self {
            evidence_key: evidence_key.into(),
            label: label.into(),
            value: None,
            value_text: Some(value_text.into()),
            unit,
            period: String::new(),
            source: String::new(),
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: impl Into<String>) -> Self {
        self.period = period.into();
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Ordered facts with unique evidence keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AnalyticsFact>", into = "Vec<AnalyticsFact>")]
pub struct FactSet {
    facts: Vec<AnalyticsFact>,
    index: BTreeMap<String, usize>,
}

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fact; an existing key is never overwritten.
    pub fn insert(&mut self, fact: AnalyticsFact) -> Result<()> {
        if self.index.contains_key(&fact.evidence_key) {
            return Err(ModelError::DuplicateEvidenceKey(fact.evidence_key));
        }
        self.index
            .insert(fact.evidence_key.clone(), self.facts.len());
        self.facts.push(fact);
        Ok(())
    }

    pub fn get(&self, evidence_key: &str) -> Option<&AnalyticsFact> {
        self.index
            .get(evidence_key)
            .and_then(|position| self.facts.get(*position))
    }

    /// Numeric value of a fact, if present and numeric.
    pub fn value(&self, evidence_key: &str) -> Option<f64> {
        self.get(evidence_key).and_then(|fact| fact.value)
    }

    pub fn contains(&self, evidence_key: &str) -> bool {
        self.index.contains_key(evidence_key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnalyticsFact> {
        self.facts.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.facts.iter().map(|fact| fact.evidence_key.as_str())
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn as_slice(&self) -> &[AnalyticsFact] {
        &self.facts
    }
}

impl TryFrom<Vec<AnalyticsFact>> for FactSet {
    type Error = ModelError;

    fn try_from(facts: Vec<AnalyticsFact>) -> Result<Self> {
        let mut set = FactSet::new();
        for fact in facts {
            set.insert(fact)?;
        }
        Ok(set)
    }
}

impl From<FactSet> for Vec<AnalyticsFact> {
    fn from(set: FactSet) -> Self {
        set.facts
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a AnalyticsFact;
    type IntoIter = std::slice::Iter<'a, AnalyticsFact>;

    fn into_iter(self) -> Self::IntoIter {
        self.facts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_keys_without_overwriting() {
        let mut facts = FactSet::new();
        facts
            .insert(AnalyticsFact::numeric("revenue_avg", "Average revenue", 100.0, FactUnit::Currency))
            .unwrap();
        let error = facts
            .insert(AnalyticsFact::numeric("revenue_avg", "Other", 1.0, FactUnit::Currency))
            .unwrap_err();
        assert_eq!(error, ModelError::DuplicateEvidenceKey("revenue_avg".into()));
        assert_eq!(facts.len(), 1);
        assert_eq!(facts.value("revenue_avg"), Some(100.0));
    }

    #[test]
    fn keeps_insertion_order() {
        let mut facts = FactSet::new();
        for key in ["b", "a", "c"] {
            facts
                .insert(AnalyticsFact::numeric(key, key, 1.0, FactUnit::Number))
                .unwrap();
        }
        assert_eq!(facts.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
    }

    #[test]
    fn deserializing_duplicates_fails() {
        let json = r#"[
            {"evidence_key":"x","label":"x","value":1.0,"unit":"number","period":"","source":""},
            {"evidence_key":"x","label":"x","value":2.0,"unit":"number","period":"","source":""}
        ]"#;
        assert!(serde_json::from_str::<FactSet>(json).is_err());
    }

    #[test]
    fn text_facts_have_no_numeric_value() {
        let fact = AnalyticsFact::text("questionnaire_flag_late_payroll", "Flag", "late_payroll", FactUnit::Flag);
        assert_eq!(fact.value, None);
        assert_eq!(fact.value_text.as_deref(), Some("late_payroll"));
    }
}
