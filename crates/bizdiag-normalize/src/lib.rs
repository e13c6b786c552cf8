#![deny(unsafe_code)]

//! Normalization of mapped uploads into monthly panels.
//!
//! Each pack has its own rules: P&L rows must each cover one month, revenue
//! transactions are summed per month, and labor pay periods are prorated by
//! calendar day across the months they touch. Row problems become warnings
//! and lower completeness; only structural problems fail a pack.

mod builder;
mod labor;
mod pnl;
mod revenue;

pub mod engine;
pub mod error;
pub mod proration;
pub mod transform;

pub use engine::{normalize_pack, primary_key_field};
pub use error::{NormalizeError, Result};
pub use proration::{overlap_days, prorate_period};
pub use transform::{Transformed, TransformIssue, apply_transform, merge_numbers};
