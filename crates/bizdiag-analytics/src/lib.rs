//! Analytics over normalized monthly panels.
//!
//! The pack panels are joined on month, an operating mode is chosen from a
//! per-vertical decision table, and every computed number is emitted as an
//! [`AnalyticsFact`](bizdiag_model::AnalyticsFact) under a stable evidence
//! key such as `revenue_avg`, `labor_pct_avg` or `revenue_outlier_2024_04`.
//! Identical input yields identical keys, values and order.

#![deny(unsafe_code)]

mod benchmarks;
mod collector;
mod metrics;
mod signals;

pub mod engine;
pub mod mode;
pub mod panel;
pub mod questionnaire;
pub mod stats;

pub use engine::{AnalyticsEngine, AnalyticsOutput};
pub use mode::detect_mode;
pub use panel::{MonthlyPanel, PackCoverage};
pub use questionnaire::{Answers, QuestionnaireOutcome};
