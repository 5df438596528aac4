//! The translation capability seam and its HTTP implementation.

use std::time::Duration;

use log::debug;
use serde_json::{json, Value};

use crate::error::TranslationError;

/// A text-to-text translation capability.
///
/// Implementations must preserve the bracket tags of
/// `tarjoman_core::tagged` verbatim; the dispatch layer repairs minor
/// reordering but cannot reinvent dropped content.
pub trait TranslationBackend {
    /// Translates `text` under the given system `instructions`.
    fn translate(&self, instructions: &str, text: &str) -> Result<String, TranslationError>;
}

/// Blocking OpenAI Responses API client.
#[derive(Debug)]
pub struct OpenAiBackend {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiBackend {
    /// Default API endpoint.
    pub const DEFAULT_ENDPOINT: &'static str = "https://api.openai.com/v1/responses";

    /// Builds a backend with an explicit request timeout.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranslationError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(TranslationError::MissingCredential);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TranslationError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        })
    }

    /// Overrides the API endpoint (proxies, test servers).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn extract_output_text(body: &Value) -> Option<String> {
        // Prefer the convenience field when present.
        if let Some(text) = body.get("output_text").and_then(Value::as_str) {
            return Some(text.to_string());
        }
        let items = body.get("output")?.as_array()?;
        let mut out = String::new();
        for item in items {
            let Some(contents) = item.get("content").and_then(Value::as_array) else {
                continue;
            };
            for content in contents {
                if content.get("type").and_then(Value::as_str) == Some("output_text") {
                    if let Some(text) = content.get("text").and_then(Value::as_str) {
                        out.push_str(text);
                    }
                }
            }
        }
        (!out.is_empty()).then_some(out)
    }
}

impl TranslationBackend for OpenAiBackend {
    fn translate(&self, instructions: &str, text: &str) -> Result<String, TranslationError> {
        debug!("translation request: {} chars, model {}", text.len(), self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "instructions": instructions,
                "input": text,
            }))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::Timeout
                } else {
                    TranslationError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| TranslationError::Api(format!("unreadable response body: {e}")))?;
        if !status.is_success() {
            let detail = body
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("no detail");
            return Err(TranslationError::Api(format!("{status}: {detail}")));
        }
        Self::extract_output_text(&body)
            .ok_or_else(|| TranslationError::Api("response carried no output text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_missing_credential() {
        let err = OpenAiBackend::new("", "gpt-4o-mini", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, TranslationError::MissingCredential));
    }

    #[test]
    fn test_extract_output_text_from_items() {
        let body = serde_json::json!({
            "output": [
                {"content": [{"type": "output_text", "text": "سلام"}]},
                {"content": [{"type": "output_text", "text": " دنیا"}]}
            ]
        });
        assert_eq!(
            OpenAiBackend::extract_output_text(&body).as_deref(),
            Some("سلام دنیا")
        );
    }

    #[test]
    fn test_extract_output_text_prefers_convenience_field() {
        let body = serde_json::json!({"output_text": "direct"});
        assert_eq!(
            OpenAiBackend::extract_output_text(&body).as_deref(),
            Some("direct")
        );
    }

    #[test]
    fn test_extract_output_text_empty_is_none() {
        let body = serde_json::json!({"output": []});
        assert!(OpenAiBackend::extract_output_text(&body).is_none());
    }
}
