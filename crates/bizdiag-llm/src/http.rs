//! OpenAI-compatible chat completions over blocking HTTP.

use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborator::{Collaborator, CollaboratorRequest};
use crate::error::{CollaboratorError, Result};
use crate::settings::LlmSettings;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    temperature: f64,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Collaborator backed by a chat completions endpoint.
///
/// Every call is bounded by the configured timeout; a slow endpoint surfaces
/// as [`CollaboratorError::Timeout`] instead of blocking the run.
pub struct HttpCollaborator {
    client: Client,
    settings: LlmSettings,
}

impl HttpCollaborator {
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| CollaboratorError::Transport(err.to_string()))?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    fn map_transport(&self, err: &reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout(self.settings.timeout.as_secs())
        } else {
            CollaboratorError::Transport(err.to_string())
        }
    }
}

impl Collaborator for HttpCollaborator {
    fn name(&self) -> &str {
        &self.settings.model
    }

    fn complete(&self, request: &CollaboratorRequest) -> Result<String> {
        let started = Instant::now();
        let body = ChatBody {
            model: &self.settings.model,
            temperature: self.settings.temperature(),
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
        };

        let mut builder = self
            .client
            .post(&self.settings.url)
            .header(USER_AGENT, concat!("bizdiag/", env!("CARGO_PKG_VERSION")))
            .header(ACCEPT, "application/json")
            .json(&body);
        if let Some(key) = &self.settings.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().map_err(|err| {
            let mapped = self.map_transport(&err);
            warn!(task = %request.task, kind = mapped.kind(), "collaborator request failed");
            mapped
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            warn!(task = %request.task, status, "collaborator returned error status");
            return Err(CollaboratorError::Status { status });
        }

        let parsed: ChatResponse = response.json().map_err(|err| {
            if err.is_timeout() {
                self.map_transport(&err)
            } else {
                CollaboratorError::InvalidJson(err.to_string())
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CollaboratorError::EmptyResponse)?;

        debug!(
            task = %request.task,
            chars = content.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "collaborator answered"
        );
        Ok(content)
    }
}
