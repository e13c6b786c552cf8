//! The collaborator seam and its offline implementations.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::error::{CollaboratorError, Result};

/// A single request to a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaboratorRequest {
    /// Which pipeline step is asking (`mapping`, `narrative`).
    pub task: String,
    /// Instructions describing the output contract.
    pub system: String,
    /// The data the collaborator may look at.
    pub prompt: String,
}

impl CollaboratorRequest {
    pub fn new(
        task: impl Into<String>,
        system: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            task: task.into(),
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Something that can turn a prompt into text, synchronously and within a
/// bounded time.
pub trait Collaborator: Send + Sync {
    /// Name used in logs and run issues.
    fn name(&self) -> &str;

    /// Complete a request, returning the raw text answer.
    fn complete(&self, request: &CollaboratorRequest) -> Result<String>;
}

/// Collaborator used when no language model is configured. Every call fails
/// with [`CollaboratorError::Disabled`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCollaborator;

impl Collaborator for DisabledCollaborator {
    fn name(&self) -> &str {
        "disabled"
    }

    fn complete(&self, _request: &CollaboratorRequest) -> Result<String> {
        Err(CollaboratorError::Disabled)
    }
}

/// Collaborator answering from canned responses keyed by task.
///
/// Tasks without a response fail with [`CollaboratorError::EmptyResponse`].
/// Every request is recorded so callers can check what was sent.
#[derive(Debug, Default)]
pub struct ScriptedCollaborator {
    responses: BTreeMap<String, Result<String>>,
    requests: Mutex<Vec<CollaboratorRequest>>,
}

impl ScriptedCollaborator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `task` with `response`.
    #[must_use]
    pub fn with_response(mut self, task: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(task.into(), Ok(response.into()));
        self
    }

    /// Fail `task` with `error`.
    #[must_use]
    pub fn with_failure(mut self, task: impl Into<String>, error: CollaboratorError) -> Self {
        self.responses.insert(task.into(), Err(error));
        self
    }

    /// Requests received so far, in call order.
    pub fn requests(&self) -> Vec<CollaboratorRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Collaborator for ScriptedCollaborator {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: &CollaboratorRequest) -> Result<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        match self.responses.get(&request.task) {
            Some(response) => response.clone(),
            None => Err(CollaboratorError::EmptyResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_always_fails() {
        let request = CollaboratorRequest::new("narrative", "sys", "prompt");
        assert_eq!(
            DisabledCollaborator.complete(&request),
            Err(CollaboratorError::Disabled)
        );
    }

    #[test]
    fn scripted_answers_by_task_and_records() {
        let collaborator = ScriptedCollaborator::new()
            .with_response("mapping", "{\"mappings\": []}")
            .with_failure("narrative", CollaboratorError::Timeout(5));

        let mapping = CollaboratorRequest::new("mapping", "sys", "columns");
        let narrative = CollaboratorRequest::new("narrative", "sys", "facts");
        let other = CollaboratorRequest::new("other", "sys", "x");

        assert_eq!(
            collaborator.complete(&mapping).as_deref(),
            Ok("{\"mappings\": []}")
        );
        assert_eq!(
            collaborator.complete(&narrative),
            Err(CollaboratorError::Timeout(5))
        );
        assert_eq!(
            collaborator.complete(&other),
            Err(CollaboratorError::EmptyResponse)
        );

        let seen = collaborator.requests();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].prompt, "columns");
        assert_eq!(seen[2].task, "other");
    }
}
