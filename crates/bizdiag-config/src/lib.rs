//! Vertical playbooks: canonical field schemas, signal formulas, mode
//! thresholds and the initiative playbook, loaded once and passed explicitly
//! to every stage.

pub mod error;
pub mod expr;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, Result};
pub use expr::{EvalError, Expr, FormulaError};
pub use loader::{default_verticals_root, load_vertical, load_vertical_config};
pub use schema::{
    Assumptions, Benchmark, BenchmarkGap, CanonicalField, Condition, ConditionOp, DataPackSpec,
    EligibilityRules, FieldType, GapDirection, InitiativeCaps, InitiativeSpec, ModeRule, ModeThresholds,
    QuestionnaireRule, RuleAction, ScoreAction, ScoreMap, Signal, SizingMethod, SizingParams,
    VerticalConfig, keys,
};
