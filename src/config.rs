use std::time::Duration;

use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_CHATGPT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    ChatGpt,
}

impl Provider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "chatgpt" | "openai" => Some(Provider::ChatGpt),
            _ => None,
        }
    }

    fn key_variable(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::ChatGpt => "OPENAI_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => DEFAULT_GEMINI_MODEL,
            Provider::ChatGpt => DEFAULT_CHATGPT_MODEL,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Unknown analysis provider: {0}")]
    UnknownProvider(String),

    #[error("ANALYSIS_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

/// Settings for the analysis service, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    /// `None` leaves the transport's own default in place.
    pub timeout: Option<Duration>,
}

// Keep the key out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    /// Reads the process environment. Load any `.env` file before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match non_blank("ANALYSIS_PROVIDER") {
            Some(value) => Provider::parse(&value).ok_or(ConfigError::UnknownProvider(value))?,
            None => Provider::Gemini,
        };

        let api_key = non_blank("API_KEY")
            .or_else(|| non_blank(provider.key_variable()))
            .ok_or(ConfigError::MissingApiKey)?;

        let model = non_blank("ANALYSIS_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let timeout = match non_blank("ANALYSIS_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => return Err(ConfigError::InvalidTimeout(value)),
            },
            None => None,
        };

        Ok(Self {
            provider,
            api_key: api_key.trim().to_string(),
            model,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);

        let err = Config::from_lookup(lookup_from(&[("API_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
    }

    #[test]
    fn defaults_to_gemini_without_timeout() {
        let config = Config::from_lookup(lookup_from(&[("API_KEY", "secret")])).unwrap();
        assert_eq!(config.provider, Provider::Gemini);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn provider_specific_key_and_model() {
        let config = Config::from_lookup(lookup_from(&[
            ("ANALYSIS_PROVIDER", "OpenAI"),
            ("OPENAI_API_KEY", "sk-test"),
            ("ANALYSIS_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.provider, Provider::ChatGpt);
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.model, DEFAULT_CHATGPT_MODEL);
        assert_eq!(config.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn rejects_bad_provider_and_timeout() {
        let err = Config::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("ANALYSIS_PROVIDER", "llama"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("llama".to_string()));

        let err = Config::from_lookup(lookup_from(&[
            ("API_KEY", "k"),
            ("ANALYSIS_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".to_string()));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = Config::from_lookup(lookup_from(&[("API_KEY", "top-secret")])).unwrap();
        assert!(!format!("{:?}", config).contains("top-secret"));
    }
}
