//! Loading and validating vertical playbooks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use bizdiag_model::{FactUnit, PackType};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::expr::Expr;
use crate::schema::{
    Assumptions, Benchmark, DataPackSpec, InitiativeSpec, ModeRule, ModeThresholds,
    QuestionnaireRule, Signal, VerticalConfig,
};

const VERTICALS_ENV_VAR: &str = "BIZDIAG_VERTICALS_DIR";

/// Directory holding `<vertical_id>.json` playbooks.
pub fn default_verticals_root() -> PathBuf {
    if let Ok(root) = std::env::var(VERTICALS_ENV_VAR) {
        return PathBuf::from(root);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../verticals")
}

pub fn load_vertical(vertical_id: &str) -> Result<VerticalConfig> {
    load_vertical_config(&default_verticals_root().join(format!("{vertical_id}.json")))
}

pub fn load_vertical_config(path: &Path) -> Result<VerticalConfig> {
    let text = std::fs::read_to_string(path).map_err(|error| ConfigError::io(path, error))?;
    let config = VerticalConfig::from_json_str(&text)?;
    debug!(
        path = %path.display(),
        vertical = %config.vertical_id,
        signals = config.signals.len(),
        initiatives = config.initiatives.len(),
        "loaded vertical config"
    );
    Ok(config)
}

/// The document as written; every section optional so absence can be reported.
#[derive(Debug, Deserialize)]
struct VerticalDocument {
    vertical_id: Option<String>,
    #[serde(default)]
    vertical_name: Option<String>,
    data_packs: Option<Vec<DataPackSpec>>,
    #[serde(default)]
    signals: Vec<SignalDocument>,
    initiatives: Option<Vec<InitiativeSpec>>,
    #[serde(default)]
    mode_thresholds: ModeThresholds,
    #[serde(default)]
    assumptions: Assumptions,
    #[serde(default)]
    benchmarks: Vec<Benchmark>,
    #[serde(default)]
    questionnaire: Vec<QuestionnaireRule>,
}

#[derive(Debug, Deserialize)]
struct SignalDocument {
    signal_id: String,
    #[serde(default)]
    label: Option<String>,
    formula: String,
    #[serde(default)]
    unit: Option<FactUnit>,
}

impl VerticalConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let document: VerticalDocument =
            serde_json::from_str(text).map_err(|source| ConfigError::Json { source })?;
        Self::from_document(document)
    }

    fn from_document(mut document: VerticalDocument) -> Result<Self> {
        let vertical_id = document
            .vertical_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingSection {
                section: "vertical_id",
            })?;
        let data_packs = document.data_packs.ok_or(ConfigError::MissingSection {
            section: "data_packs",
        })?;
        if data_packs.is_empty() {
            return Err(ConfigError::EmptySection {
                section: "data_packs",
            });
        }
        let initiatives = document.initiatives.ok_or(ConfigError::MissingSection {
            section: "initiatives",
        })?;
        if initiatives.is_empty() {
            return Err(ConfigError::EmptySection {
                section: "initiatives",
            });
        }

        validate_packs(&data_packs)?;
        let field_names: BTreeSet<&str> = data_packs
            .iter()
            .flat_map(|pack| pack.fields.iter().map(|field| field.name.as_str()))
            .collect();
        let signals = order_signals(document.signals, &field_names)?;
        validate_initiatives(&initiatives)?;
        validate_thresholds(&document.mode_thresholds, &document.assumptions)?;
        validate_questionnaire(&mut document.questionnaire)?;

        Ok(VerticalConfig {
            vertical_name: document
                .vertical_name
                .unwrap_or_else(|| vertical_id.clone()),
            vertical_id,
            data_packs,
            signals,
            initiatives,
            mode_thresholds: document.mode_thresholds,
            assumptions: document.assumptions,
            benchmarks: document.benchmarks,
            questionnaire: document.questionnaire,
        })
    }
}

impl FromStr for VerticalConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        VerticalConfig::from_json_str(s)
    }
}

fn validate_packs(packs: &[DataPackSpec]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for pack in packs {
        if !seen.insert(pack.pack_type) {
            return Err(ConfigError::DuplicateId {
                kind: "data pack",
                id: pack.pack_type.to_string(),
            });
        }
        let mut names = BTreeSet::new();
        for field in &pack.fields {
            if !names.insert(field.name.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "canonical field",
                    id: format!("{}.{}", pack.pack_type, field.name),
                });
            }
        }
        for &key in DataPackSpec::key_fields(pack.pack_type) {
            if pack.field(key).is_none() {
                return Err(ConfigError::MissingKeyField {
                    pack: pack.pack_type,
                    field: key,
                });
            }
        }
    }
    Ok(())
}

/// Parses every formula and sorts signals so dependencies come first.
///
/// Ties keep declaration order, so the result is stable for a given document.
fn order_signals(documents: Vec<SignalDocument>, field_names: &BTreeSet<&str>) -> Result<Vec<Signal>> {
    let mut parsed: Vec<Signal> = Vec::with_capacity(documents.len());
    let mut ids = BTreeSet::new();
    for document in documents {
        if !ids.insert(document.signal_id.clone()) {
            return Err(ConfigError::DuplicateId {
                kind: "signal",
                id: document.signal_id,
            });
        }
        if field_names.contains(document.signal_id.as_str()) {
            return Err(ConfigError::NameCollision {
                name: document.signal_id,
            });
        }
        let expr = Expr::parse(&document.formula).map_err(|source| ConfigError::InvalidFormula {
            signal: document.signal_id.clone(),
            source,
        })?;
        parsed.push(Signal {
            label: document
                .label
                .unwrap_or_else(|| document.signal_id.replace('_', " ")),
            id: document.signal_id,
            formula: document.formula,
            unit: document.unit.unwrap_or(FactUnit::Ratio),
            expr,
        });
    }

    let dependencies: BTreeMap<String, BTreeSet<String>> = parsed
        .iter()
        .map(|signal| {
            let deps = signal
                .expr
                .references()
                .into_iter()
                .filter(|name| ids.contains(name))
                .collect();
            (signal.id.clone(), deps)
        })
        .collect();

    let mut ordered = Vec::with_capacity(parsed.len());
    let mut placed: BTreeSet<String> = BTreeSet::new();
    let mut remaining = parsed;
    while !remaining.is_empty() {
        let before = remaining.len();
        let mut next_round = Vec::new();
        for signal in remaining {
            let ready = dependencies
                .get(&signal.id)
                .is_none_or(|deps| deps.iter().all(|dep| placed.contains(dep)));
            if ready {
                placed.insert(signal.id.clone());
                ordered.push(signal);
            } else {
                next_round.push(signal);
            }
        }
        if next_round.len() == before {
            let names: Vec<&str> = next_round.iter().map(|signal| signal.id.as_str()).collect();
            return Err(ConfigError::SignalCycle {
                signals: names.join(", "),
            });
        }
        remaining = next_round;
    }
    Ok(ordered)
}

fn validate_initiatives(initiatives: &[InitiativeSpec]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for initiative in initiatives {
        if !seen.insert(initiative.id.as_str()) {
            return Err(ConfigError::DuplicateId {
                kind: "initiative",
                id: initiative.id.clone(),
            });
        }
        let params = initiative.sizing_params;
        let invalid = |message: &str| ConfigError::InvalidSizing {
            initiative: initiative.id.clone(),
            message: message.to_string(),
        };
        if ![params.low, params.mid, params.high]
            .iter()
            .all(|value| value.is_finite() && *value >= 0.0)
        {
            return Err(invalid("sizing parameters must be finite and non-negative"));
        }
        if params.low > params.mid || params.mid > params.high {
            return Err(invalid("sizing parameters must satisfy low <= mid <= high"));
        }
        if !initiative.priority_weight.is_finite() || initiative.priority_weight < 0.0 {
            return Err(invalid("priority_weight must be finite and non-negative"));
        }
        if let Some(gap) = &initiative.benchmark_gap {
            let invalid_gap = |message: &str| ConfigError::InvalidBenchmarkGap {
                initiative: initiative.id.clone(),
                message: message.to_string(),
            };
            if !gap.key.ends_with("_vs_benchmark") {
                return Err(invalid_gap("key must name a `<metric>_vs_benchmark` fact"));
            }
            if !(gap.full_at.is_finite() && gap.full_at > 0.0) {
                return Err(invalid_gap("full_at must be positive"));
            }
        }
    }
    Ok(())
}

fn validate_thresholds(thresholds: &ModeThresholds, assumptions: &Assumptions) -> Result<()> {
    let check_rule = |name: &str, rule: &ModeRule| -> Result<()> {
        if !(0.0..=1.0).contains(&rule.min_completeness) {
            return Err(ConfigError::InvalidThreshold {
                message: format!("{name}.min_completeness must be within [0, 1]"),
            });
        }
        if !(0.0..=1.0).contains(&rule.base_confidence) {
            return Err(ConfigError::InvalidThreshold {
                message: format!("{name}.base_confidence must be within [0, 1]"),
            });
        }
        Ok(())
    };
    check_rule("pnl", &thresholds.pnl)?;
    check_rule("ops", &thresholds.ops)?;
    if !(0.0..=1.0).contains(&thresholds.directional_confidence) {
        return Err(ConfigError::InvalidThreshold {
            message: "directional_confidence must be within [0, 1]".to_string(),
        });
    }
    if !(assumptions.outlier_sigma.is_finite() && assumptions.outlier_sigma > 0.0) {
        return Err(ConfigError::InvalidThreshold {
            message: "outlier_sigma must be positive".to_string(),
        });
    }
    if !(assumptions.annualization_factor.is_finite() && assumptions.annualization_factor > 0.0) {
        return Err(ConfigError::InvalidThreshold {
            message: "annualization_factor must be positive".to_string(),
        });
    }
    Ok(())
}

/// Checks every rule and compiles its `regex` patterns.
fn validate_questionnaire(rules: &mut [QuestionnaireRule]) -> Result<()> {
    for (index, rule) in rules.iter_mut().enumerate() {
        let name = rule.id.clone().unwrap_or_else(|| format!("#{}", index + 1));
        if rule.then.add_flags.is_empty() && rule.then.set_score.is_none() {
            return Err(ConfigError::InvalidRule {
                message: format!("rule {name} has no action"),
            });
        }
        for condition in &mut rule.when {
            condition.compile().map_err(|error| ConfigError::InvalidRule {
                message: format!(
                    "rule {name}: invalid pattern `{}`: {error}",
                    condition.value.as_str().unwrap_or_default()
                ),
            })?;
        }
    }
    Ok(())
}
