//! Typed vertical playbook.

use bizdiag_model::{FactUnit, MergePolicy, OperatingMode, PackType, Transform};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// Canonical key fields each pack must declare.
pub mod keys {
    pub const MONTH: &str = "month";
    pub const PERIOD_START: &str = "period_start";
    pub const PERIOD_END: &str = "period_end";
    pub const TRANSACTION_DATE: &str = "transaction_date";
    pub const TRANSACTION_COUNT: &str = "transaction_count";
    pub const PAY_PERIOD_START: &str = "pay_period_start";
    pub const PAY_PERIOD_END: &str = "pay_period_end";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Numeric,
    Date,
    Month,
    #[default]
    Text,
}

impl FieldType {
    pub fn default_transform(self) -> Transform {
        match self {
            FieldType::Numeric => Transform::ToNumber,
            FieldType::Date => Transform::ParseDate,
            FieldType::Month => Transform::ParseMonth,
            FieldType::Text => Transform::None,
        }
    }

    /// Whether a mapping of this field may use `transform`. Date and month
    /// fields accept either calendar reading; numeric fields read numbers.
    pub fn accepts(self, transform: Transform) -> bool {
        match self {
            FieldType::Numeric => matches!(transform, Transform::ToNumber | Transform::None),
            FieldType::Date | FieldType::Month => {
                matches!(transform, Transform::ParseDate | Transform::ParseMonth)
            }
            FieldType::Text => transform == Transform::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalField {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub merge: MergePolicy,
    /// Accept every matching column instead of only the best one.
    #[serde(default)]
    pub multi_source: bool,
    #[serde(default)]
    pub unit: Option<FactUnit>,
}

impl CanonicalField {
    pub fn is_numeric(&self) -> bool {
        self.field_type == FieldType::Numeric
    }

    pub fn fact_unit(&self) -> FactUnit {
        self.unit.unwrap_or(FactUnit::Currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPackSpec {
    pub pack_type: PackType,
    #[serde(default)]
    pub description: String,
    pub fields: Vec<CanonicalField>,
}

impl DataPackSpec {
    pub fn field(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &CanonicalField> {
        self.fields.iter().filter(|field| field.required)
    }

    /// Numeric fields that become panel values.
    pub fn measure_fields(&self) -> impl Iterator<Item = &CanonicalField> {
        self.fields.iter().filter(|field| field.is_numeric())
    }

    /// Key fields that locate a row in time for this pack.
    pub fn key_fields(pack: PackType) -> &'static [&'static str] {
        match pack {
            PackType::Pnl => &[keys::MONTH],
            PackType::Revenue => &[keys::TRANSACTION_DATE],
            PackType::Labor => &[keys::PAY_PERIOD_START, keys::PAY_PERIOD_END],
        }
    }
}

/// A derived signal, already checked and placed in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub id: String,
    pub label: String,
    pub formula: String,
    pub unit: FactUnit,
    #[serde(skip)]
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeRule {
    /// Every listed pack must be present.
    #[serde(default)]
    pub required_packs: Vec<PackType>,
    /// At least one listed pack must be present (ignored when empty).
    #[serde(default)]
    pub any_of_packs: Vec<PackType>,
    pub min_months: usize,
    pub min_completeness: f64,
    pub base_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeThresholds {
    #[serde(default = "default_pnl_rule")]
    pub pnl: ModeRule,
    #[serde(default = "default_ops_rule")]
    pub ops: ModeRule,
    #[serde(default = "default_directional_confidence")]
    pub directional_confidence: f64,
}

impl ModeThresholds {
    pub fn rule(&self, mode: OperatingMode) -> Option<&ModeRule> {
        match mode {
            OperatingMode::Pnl => Some(&self.pnl),
            OperatingMode::Ops => Some(&self.ops),
            OperatingMode::Directional => None,
        }
    }
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self {
            pnl: default_pnl_rule(),
            ops: default_ops_rule(),
            directional_confidence: default_directional_confidence(),
        }
    }
}

fn default_pnl_rule() -> ModeRule {
    ModeRule {
        required_packs: vec![PackType::Pnl],
        any_of_packs: Vec::new(),
        min_months: 3,
        min_completeness: 0.6,
        base_confidence: 0.8,
    }
}

fn default_ops_rule() -> ModeRule {
    ModeRule {
        required_packs: Vec::new(),
        any_of_packs: vec![PackType::Pnl, PackType::Revenue, PackType::Labor],
        min_months: 2,
        min_completeness: 0.5,
        base_confidence: 0.6,
    }
}

fn default_directional_confidence() -> f64 {
    0.4
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiativeCaps {
    pub pnl: usize,
    pub ops: usize,
    pub directional: usize,
}

impl InitiativeCaps {
    pub fn for_mode(&self, mode: OperatingMode) -> usize {
        match mode {
            OperatingMode::Pnl => self.pnl,
            OperatingMode::Ops => self.ops,
            OperatingMode::Directional => self.directional,
        }
    }
}

impl Default for InitiativeCaps {
    fn default() -> Self {
        Self {
            pnl: 7,
            ops: 5,
            directional: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assumptions {
    #[serde(default = "default_outlier_sigma")]
    pub outlier_sigma: f64,
    /// Months of impact counted when sizing from a monthly average.
    #[serde(default = "default_annualization_factor")]
    pub annualization_factor: f64,
    #[serde(default)]
    pub max_initiatives: InitiativeCaps,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            outlier_sigma: default_outlier_sigma(),
            annualization_factor: default_annualization_factor(),
            max_initiatives: InitiativeCaps::default(),
        }
    }
}

fn default_outlier_sigma() -> f64 {
    2.0
}

fn default_annualization_factor() -> f64 {
    12.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    /// Evidence key of the fact being compared.
    pub metric: String,
    pub value: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub unit: Option<FactUnit>,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    Exists,
    Equals,
    Contains,
    In,
    Lte,
    Gte,
    Regex,
    ArrayFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub q: String,
    pub op: ConditionOp,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(skip)]
    pattern: Option<CompiledPattern>,
}

impl Condition {
    /// A condition ready to evaluate; `regex` patterns are compiled here.
    pub fn new(
        q: impl Into<String>,
        op: ConditionOp,
        value: serde_json::Value,
    ) -> Result<Self, regex::Error> {
        let mut condition = Self {
            q: q.into(),
            op,
            value,
            pattern: None,
        };
        condition.compile()?;
        Ok(condition)
    }

    pub(crate) fn compile(&mut self) -> Result<(), regex::Error> {
        if self.op == ConditionOp::Regex {
            let pattern = self.value.as_str().unwrap_or_default();
            self.pattern = Some(CompiledPattern(Regex::new(pattern)?));
        }
        Ok(())
    }

    /// Compiled pattern of a `regex` condition.
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref().map(|compiled| &compiled.0)
    }
}

/// Equal when the source patterns are equal.
#[derive(Debug, Clone)]
struct CompiledPattern(Regex);

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScoreMap {
    #[default]
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "likert_1_5_to_0_1")]
    Likert1To5,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAction {
    pub key: String,
    /// Question whose answer supplies the score.
    pub from: String,
    #[serde(default)]
    pub map: ScoreMap,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(default)]
    pub add_flags: Vec<String>,
    #[serde(default)]
    pub set_score: Option<ScoreAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireRule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub when: Vec<Condition>,
    #[serde(default)]
    pub then: RuleAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EligibilityRules {
    #[serde(default)]
    pub min_months: usize,
    #[serde(default)]
    pub requires_data: Vec<PackType>,
    #[serde(default)]
    pub min_mode: Option<OperatingMode>,
    #[serde(default)]
    pub requires_facts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    PercentageOfRevenue,
    PercentageOfLabor,
    PercentageOfCogs,
    FixedValue,
}

impl SizingMethod {
    /// Average fact a percentage method multiplies; `None` for fixed values.
    pub fn default_basis_key(self) -> Option<&'static str> {
        match self {
            SizingMethod::PercentageOfRevenue => Some("revenue_avg"),
            SizingMethod::PercentageOfLabor => Some("labor_avg"),
            SizingMethod::PercentageOfCogs => Some("cogs_avg"),
            SizingMethod::FixedValue => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizingMethod::PercentageOfRevenue => "percentage_of_revenue",
            SizingMethod::PercentageOfLabor => "percentage_of_labor",
            SizingMethod::PercentageOfCogs => "percentage_of_cogs",
            SizingMethod::FixedValue => "fixed_value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SizingParams {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativeSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub eligibility_rules: EligibilityRules,
    pub sizing_method: SizingMethod,
    #[serde(default)]
    pub sizing_params: SizingParams,
    /// Overrides the method's default basis fact.
    #[serde(default)]
    pub basis_key: Option<String>,
    #[serde(default = "default_priority_weight")]
    pub priority_weight: f64,
    #[serde(default)]
    pub evidence_keys: Vec<String>,
    #[serde(default)]
    pub benchmark_gap: Option<BenchmarkGap>,
}

/// Which side of a benchmark is the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapDirection {
    /// Actual above benchmark is adverse (costs).
    Above,
    /// Actual below benchmark is adverse (margins).
    Below,
}

/// How far an initiative's metric sits from its benchmark.
///
/// `key` names a `<metric>_vs_benchmark` fact (actual minus benchmark). The
/// adverse part of that gap, divided by `full_at`, gives a magnitude in
/// `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkGap {
    pub key: String,
    pub adverse: GapDirection,
    pub full_at: f64,
}

impl BenchmarkGap {
    /// Magnitude for a gap fact value; zero when the metric is on the good
    /// side of its benchmark.
    pub fn magnitude(&self, gap: f64) -> f64 {
        let adverse = match self.adverse {
            GapDirection::Above => gap,
            GapDirection::Below => -gap,
        };
        if adverse.is_finite() {
            (adverse / self.full_at).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

impl InitiativeSpec {
    pub fn basis_key(&self) -> Option<&str> {
        self.basis_key
            .as_deref()
            .or_else(|| self.sizing_method.default_basis_key())
    }
}

fn default_priority_weight() -> f64 {
    1.0
}

/// A validated vertical playbook. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerticalConfig {
    pub vertical_id: String,
    pub vertical_name: String,
    pub data_packs: Vec<DataPackSpec>,
    /// In evaluation order: every signal follows the signals it references.
    pub signals: Vec<Signal>,
    pub initiatives: Vec<InitiativeSpec>,
    pub mode_thresholds: ModeThresholds,
    pub assumptions: Assumptions,
    pub benchmarks: Vec<Benchmark>,
    pub questionnaire: Vec<QuestionnaireRule>,
}

impl VerticalConfig {
    pub fn pack(&self, pack: PackType) -> Option<&DataPackSpec> {
        self.data_packs.iter().find(|spec| spec.pack_type == pack)
    }

    pub fn signal(&self, id: &str) -> Option<&Signal> {
        self.signals.iter().find(|signal| signal.id == id)
    }

    pub fn initiative(&self, id: &str) -> Option<&InitiativeSpec> {
        self.initiatives.iter().find(|initiative| initiative.id == id)
    }

    /// Unit declared for a canonical numeric field in any pack.
    pub fn field_unit(&self, name: &str) -> Option<FactUnit> {
        self.data_packs
            .iter()
            .find_map(|spec| spec.field(name))
            .map(CanonicalField::fact_unit)
    }
}
