//! Collaborator settings read from the environment.

use std::time::Duration;

/// Environment variable holding the chat completions endpoint.
pub const ENV_URL: &str = "BIZDIAG_LLM_URL";
/// Environment variable holding the model name.
pub const ENV_MODEL: &str = "BIZDIAG_LLM_MODEL";
/// Environment variable holding the bearer token.
pub const ENV_API_KEY: &str = "BIZDIAG_LLM_API_KEY";
/// Environment variable holding the timeout in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "BIZDIAG_LLM_TIMEOUT_SECS";

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default model name sent when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connection settings for [`crate::HttpCollaborator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature_milli: u16,
}

impl LlmSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
            temperature_milli: 0,
        }
    }

    /// Read settings from `BIZDIAG_LLM_*`. Returns `None` when no endpoint is
    /// configured, which means the run stays offline.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`LlmSettings::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let url = lookup(ENV_URL).filter(|value| !value.trim().is_empty())?;
        let mut settings = Self::new(url.trim());
        if let Some(model) = lookup(ENV_MODEL).filter(|value| !value.trim().is_empty()) {
            settings.model = model.trim().to_string();
        }
        settings.api_key = lookup(ENV_API_KEY).filter(|value| !value.trim().is_empty());
        match lookup(ENV_TIMEOUT_SECS).map(|value| value.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => settings.timeout = Duration::from_secs(secs),
            Some(_) => tracing::warn!(
                variable = ENV_TIMEOUT_SECS,
                "ignoring invalid timeout, using default"
            ),
            None => {}
        }
        Some(settings)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sampling temperature in thousandths (0 keeps answers stable).
    #[must_use]
    pub fn with_temperature_milli(mut self, temperature_milli: u16) -> Self {
        self.temperature_milli = temperature_milli;
        self
    }

    pub(crate) fn temperature(&self) -> f64 {
        f64::from(self.temperature_milli) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn no_url_means_offline() {
        assert_eq!(LlmSettings::from_lookup(lookup(&[])), None);
        assert_eq!(LlmSettings::from_lookup(lookup(&[(ENV_URL, "  ")])), None);
    }

    #[test]
    fn reads_all_variables() {
        let settings = LlmSettings::from_lookup(lookup(&[
            (ENV_URL, "http://localhost:8080/v1/chat/completions"),
            (ENV_MODEL, "local"),
            (ENV_API_KEY, "secret"),
            (ENV_TIMEOUT_SECS, "7"),
        ]))
        .unwrap();
        assert_eq!(settings.model, "local");
        assert_eq!(settings.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.timeout, Duration::from_secs(7));
    }

    #[test]
    fn bad_timeout_keeps_default() {
        let settings = LlmSettings::from_lookup(lookup(&[
            (ENV_URL, "http://localhost"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap();
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert_eq!(settings.model, DEFAULT_MODEL);
    }
}
