//! Structured output guard: pull a JSON object out of free text, decode it
//! and run caller validation before anything downstream sees it.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::collaborator::{Collaborator, CollaboratorRequest};
use crate::error::{CollaboratorError, Result};

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return "",
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Extract the first JSON object from a collaborator answer.
///
/// Tries the whole (unfenced) text first, then every `{` in turn.
pub fn extract_json(raw: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(CollaboratorError::EmptyResponse);
    }
    let first_error = match serde_json::from_str::<Value>(cleaned) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };
    for (idx, ch) in cleaned.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut deserializer = serde_json::Deserializer::from_str(&cleaned[idx..]);
        if let Ok(value) = <Value as serde::Deserialize>::deserialize(&mut deserializer) {
            return Ok(value);
        }
    }
    Err(CollaboratorError::from(first_error))
}

/// Call a collaborator and decode its answer into `T`, rejecting anything
/// that `validate` reports problems for.
pub fn request_structured<T, V>(
    collaborator: &dyn Collaborator,
    request: &CollaboratorRequest,
    validate: V,
) -> Result<T>
where
    T: DeserializeOwned,
    V: FnOnce(&T) -> Vec<String>,
{
    let raw = collaborator.complete(request)?;
    let value = extract_json(&raw)?;
    let decoded: T = serde_json::from_value(value).map_err(|err| {
        CollaboratorError::SchemaViolation {
            problems: vec![err.to_string()],
        }
    })?;
    let problems = validate(&decoded);
    if !problems.is_empty() {
        debug!(
            task = %request.task,
            problems = problems.len(),
            "collaborator output failed validation"
        );
        return Err(CollaboratorError::SchemaViolation { problems });
    }
    Ok(decoded)
}
