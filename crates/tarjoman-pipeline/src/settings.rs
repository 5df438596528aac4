//! Environment-driven configuration.
//!
//! Read once at bootstrap and passed down; nothing below the pipeline
//! reads the environment.

use std::time::Duration;

use tarjoman_core::lang::Lang;

/// Default translation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default per-request token budget.
pub const DEFAULT_MAX_CHUNK_TOKENS: usize = 3000;
/// Default translation request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// API credential; absent means translation degrades to placeholder.
    pub api_key: Option<String>,
    /// Model name passed to the translation backend.
    pub model: String,
    /// Token budget per translation request.
    pub max_chunk_tokens: usize,
    /// Deadline for one translation request.
    pub translate_timeout: Duration,
    /// Default target language.
    pub target_lang: Lang,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_chunk_tokens: DEFAULT_MAX_CHUNK_TOKENS,
            translate_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            target_lang: Lang::Fa,
        }
    }
}

impl Settings {
    /// Reads settings from `OPENAI_API_KEY` and the `TARJOMAN_*`
    /// variables, falling back to defaults for anything unset or
    /// unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("TARJOMAN_MODEL").unwrap_or(defaults.model),
            max_chunk_tokens: std::env::var("TARJOMAN_MAX_CHUNK_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_chunk_tokens),
            translate_timeout: std::env::var("TARJOMAN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.translate_timeout, Duration::from_secs),
            target_lang: std::env::var("TARJOMAN_TARGET_LANG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.target_lang),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.max_chunk_tokens, 3000);
        assert_eq!(settings.target_lang, Lang::Fa);
        assert!(settings.api_key.is_none());
    }
}
