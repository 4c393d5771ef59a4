//! Blocking chat-completions client.
//!
//! Endpoint shape is Azure OpenAI: the model is a deployment in the URL
//! path and the key travels in the `api-key` header. Transport, HTTP and
//! payload failures map to the distinct [`GenerationError`] variants so
//! the orchestrator's abort-without-commit policy sees one error kind.

use casgen_core::{Error, GenerationError, Generator};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::prompts;

pub struct LlmClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model.as_str(),
            self.config.api_version,
        )
    }

    /// One blocking chat completion; returns the assistant message content.
    fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError> {
        let url = self.completions_url();
        let body = json!({
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "temperature": 0.2,
        });

        tracing::debug!(model = self.config.model.as_str(), "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| GenerationError::Network(format!("failed to reach {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(GenerationError::Api(format!("http error {status}: {text}")));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::InvalidResponse(format!("invalid JSON: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GenerationError::InvalidResponse("empty choices array".to_string()))
    }
}

/// Split a completion into discrete items: one per non-blank line, with
/// leading list markers (`-`, `*`, `•`, `►`, `1.`, `2)`) stripped.
pub fn parse_item_list(content: &str) -> Vec<String> {
    let marker = regex::Regex::new(r"^(?:[-*•►]|\d+[.)])\s*").unwrap();

    content
        .lines()
        .map(|line| marker.replace(line.trim(), "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

impl Generator for LlmClient {
    fn generate_rules(&self, chunk: &str) -> Result<Vec<String>, GenerationError> {
        let content = self.complete(
            prompts::RULES_SYSTEM_PROMPT,
            &prompts::rules_user_prompt(chunk),
        )?;
        Ok(parse_item_list(&content))
    }

    fn generate_checkpoints(&self, items: &[String]) -> Result<Vec<String>, GenerationError> {
        let content = self.complete(
            prompts::CHECKPOINTS_SYSTEM_PROMPT,
            &prompts::checkpoints_user_prompt(items),
        )?;
        Ok(parse_item_list(&content))
    }

    fn generate_test_cases(&self, items: &[String]) -> Result<Vec<String>, GenerationError> {
        let content = self.complete(
            prompts::TEST_CASES_SYSTEM_PROMPT,
            &prompts::test_cases_user_prompt(items),
        )?;
        // One markdown document per call; no line splitting.
        let trimmed = content.trim();
        if trimmed.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![trimmed.to_string()])
        }
    }
}
