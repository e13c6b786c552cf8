//! Optional language-model collaborator.
//!
//! Pipeline stages talk to a [`Collaborator`] through a synchronous call with
//! a bounded timeout and always have a deterministic fallback. Nothing here
//! decides anything: answers are decoded and validated by
//! [`request_structured`] and the caller chooses whether to use them.

pub mod collaborator;
pub mod error;
pub mod guard;
pub mod http;
pub mod settings;

pub use collaborator::{
    Collaborator, CollaboratorRequest, DisabledCollaborator, ScriptedCollaborator,
};
pub use error::{CollaboratorError, Result};
pub use guard::{extract_json, request_structured, strip_code_fences};
pub use http::HttpCollaborator;
pub use settings::LlmSettings;
