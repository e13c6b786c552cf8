//! Run orchestration.
//!
//! [`DiagnosticPipeline`] takes a validated vertical playbook and a
//! [`RunInput`] (one upload per data pack, optional confirmed mappings and
//! questionnaire answers) through profiling, mapping, normalization,
//! analytics and initiative selection, and returns a
//! [`DiagnosticReport`](bizdiag_model::DiagnosticReport).

#![deny(unsafe_code)]

pub mod digest;
pub mod error;
pub mod input;
pub mod pipeline;

pub use digest::input_digest;
pub use error::{PipelineError, Result};
pub use input::{PackUpload, RunInput, RunOptions};
pub use pipeline::{DiagnosticPipeline, run_from_json};
