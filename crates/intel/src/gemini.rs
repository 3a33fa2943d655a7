//! Google Gemini adapter.
//!
//! Implements the `generateContent` API. Auth is an API key passed as a
//! query parameter (`key={api_key}`), read once from the environment
//! variable the config names; the key never leaves this module and is
//! redacted from logs.

use std::time::Instant;

use serde_json::Value;

use sg_domain::config::IntelConfig;
use sg_domain::trace::TraceEvent;
use sg_domain::{Error, Result};

use crate::traits::{ChatTurn, LanguageModel, Role};

/// Configured LLM timeouts are clamped to this floor.
const MIN_TIMEOUT_SECS: u64 = 30;

/// An adapter for the Google Gemini HTTP API.
#[derive(Debug)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    model: String,
    max_output_tokens: Option<u32>,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Build a client from config. Fails with `ConfigMissing` when the
    /// named environment variable is unset or empty.
    pub fn from_config(cfg: &IntelConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::ConfigMissing(cfg.api_key_env.clone()))?;

        let timeout = cfg.request_timeout_secs.max(MIN_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            max_output_tokens: cfg.max_output_tokens,
            client,
        })
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_body(&self, system: &str, history: &[ChatTurn], prompt: &str) -> Value {
        let mut contents: Vec<Value> = history.iter().map(turn_to_gemini).collect();
        contents.push(serde_json::json!({
            "role": "user",
            "parts": [{"text": prompt}],
        }));

        let mut body = serde_json::json!({
            "contents": contents,
        });
        if !system.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{"text": system}]
            });
        }
        if let Some(max) = self.max_output_tokens {
            body["generationConfig"] = serde_json::json!({
                "maxOutputTokens": max,
            });
        }
        body
    }
}

fn turn_to_gemini(turn: &ChatTurn) -> Value {
    let role = match turn.role {
        Role::User => "user",
        Role::Model => "model",
    };
    serde_json::json!({
        "role": role,
        "parts": [{"text": turn.text}],
    })
}

fn parse_response(body: &Value) -> Result<String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| Error::LlmUnavailable("no candidates in response".into()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.is_empty() {
        return Err(Error::LlmUnavailable("empty response".into()));
    }
    Ok(text)
}

/// Redact the API key from a URL for safe logging.
fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

#[async_trait::async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, system: &str, history: &[ChatTurn], prompt: &str) -> Result<String> {
        let url = self.generate_url();
        let body = self.build_body(system, history, prompt);
        let started = Instant::now();

        tracing::debug!(
            model = %self.model,
            url = %redact_url_key(&url),
            turns = history.len(),
            "gemini request"
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::LlmUnavailable(format!("request timed out: {e}"))
                } else {
                    Error::LlmUnavailable(format!("request failed: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::LlmUnavailable(format!("reading response: {e}")))?;
        if !status.is_success() {
            return Err(Error::LlmUnavailable(format!(
                "HTTP {} - {}",
                status.as_u16(),
                text
            )));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| Error::LlmUnavailable(format!("malformed response: {e}")))?;
        let answer = parse_response(&json)?;

        TraceEvent::LlmRequest {
            model: self.model.clone(),
            mode: "generate".into(),
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(answer)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_key(var: &str) -> GeminiClient {
        std::env::set_var(var, "test-key-123");
        let cfg = IntelConfig {
            api_key_env: var.into(),
            ..Default::default()
        };
        GeminiClient::from_config(&cfg).unwrap()
    }

    #[test]
    fn missing_key_is_config_missing() {
        let cfg = IntelConfig {
            api_key_env: "SG_TEST_NO_SUCH_KEY".into(),
            ..Default::default()
        };
        std::env::remove_var("SG_TEST_NO_SUCH_KEY");
        let err = GeminiClient::from_config(&cfg).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(name) if name == "SG_TEST_NO_SUCH_KEY"));
    }

    #[test]
    fn empty_key_is_config_missing() {
        std::env::set_var("SG_TEST_EMPTY_KEY", "  ");
        let cfg = IntelConfig {
            api_key_env: "SG_TEST_EMPTY_KEY".into(),
            ..Default::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&cfg),
            Err(Error::ConfigMissing(_))
        ));
    }

    #[test]
    fn body_carries_system_history_and_prompt() {
        let client = client_with_key("SG_TEST_KEY_BODY");
        let history = vec![ChatTurn::user("first"), ChatTurn::model("answer")];
        let body = client.build_body("instruct", &history, "second");

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "second");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "instruct");
    }

    #[test]
    fn url_key_is_redacted_for_logs() {
        let client = client_with_key("SG_TEST_KEY_REDACT");
        let url = client.generate_url();
        assert!(url.contains("key=test-key-123"));
        let redacted = redact_url_key(&url);
        assert!(!redacted.contains("test-key-123"));
        assert!(redacted.contains("key=[REDACTED]"));
    }

    #[test]
    fn response_text_concatenates_parts() {
        let body: Value = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parse_response(&body).unwrap(), "Hello world");
    }

    #[test]
    fn malformed_response_is_llm_unavailable() {
        let body: Value = serde_json::from_str(r#"{"error":{"code":500}}"#).unwrap();
        assert!(matches!(
            parse_response(&body),
            Err(Error::LlmUnavailable(_))
        ));
    }
}
