//! Gemini-backed implementation of the code-assist seam.
//!
//! Talks to the `generateContent` REST endpoint. Each capability wraps the
//! transcript or code in a purpose-built prompt and returns the first text
//! candidate from the response.

use super::CodeAssist;
use crate::code_buffer::Language;
use crate::config::AssistConfig;
use crate::error::{EchoError, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

/// Default Gemini REST base URL.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// A [`CodeAssist`] backed by the Gemini `generateContent` API.
pub struct GeminiAssist {
    client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl GeminiAssist {
    /// Builds a client from config, resolving the API key from the
    /// configured environment variable.
    pub fn from_config(config: &AssistConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EchoError::Config(format!(
                "assist API key env var is missing: {}",
                config.api_key_env
            ))
        })?;
        if api_key.trim().is_empty() {
            return Err(EchoError::Config(format!(
                "assist API key env var is empty: {}",
                config.api_key_env
            )));
        }
        Ok(Self::new(
            config.api_url.clone(),
            config.api_model.clone(),
            api_key,
        ))
    }

    #[must_use]
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        }
    }

    async fn complete(&self, prompt: String) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        debug!(model = %self.model, "assist request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{"parts": [{"text": prompt}]}],
            }))
            .send()
            .await
            .map_err(|e| EchoError::Assist(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EchoError::Assist(format!(
                "assist API returned {status}: {body}"
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| EchoError::Assist(e.to_string()))?;
        extract_text(&value)
            .ok_or_else(|| EchoError::Assist("assist API response had no text candidates".into()))
    }
}

#[async_trait]
impl CodeAssist for GeminiAssist {
    async fn generate_code(&self, request: &str, language: Language) -> Result<String> {
        self.complete(generate_prompt(request, language)).await
    }

    async fn debug_code(&self, code: &str, report: &str, language: Language) -> Result<String> {
        self.complete(debug_prompt(code, report, language)).await
    }

    async fn explain_code(&self, code: &str, language: Language) -> Result<String> {
        self.complete(explain_prompt(code, language)).await
    }
}

/// `candidates[0].content.parts[0].text`
fn extract_text(value: &Value) -> Option<String> {
    value
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
        .map(str::to_owned)
}

fn generate_prompt(request: &str, language: Language) -> String {
    format!(
        "You are an expert pair programming assistant. \n\
         The user wants to: {request}\n\n\
         Generate clean, well-commented {language} code that:\n\
         1. Follows best practices\n\
         2. Includes error handling\n\
         3. Is production-ready\n\
         4. Has helpful comments\n\n\
         Provide ONLY the code, no explanations before or after."
    )
}

fn debug_prompt(code: &str, report: &str, language: Language) -> String {
    format!(
        "You are debugging {language} code.\n\n\
         CODE:\n{code}\n\n\
         ERROR:\n{report}\n\n\
         Provide:\n\
         1. What's wrong\n\
         2. How to fix it\n\
         3. The corrected code\n\n\
         Format your response clearly."
    )
}

fn explain_prompt(code: &str, language: Language) -> String {
    format!(
        "Explain this {language} code in simple terms:\n\n\
         {code}\n\n\
         Provide:\n\
         1. What it does overall\n\
         2. Key parts explained\n\
         3. Any potential issues"
    )
}
