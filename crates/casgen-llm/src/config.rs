//! Provider configuration.
//!
//! Credentials are passed through to the endpoint without validation
//! beyond presence of the key; a wrong key surfaces as an API error on the
//! first generation call, not here.

use std::fmt;
use std::str::FromStr;

use casgen_core::Error;

pub const CASGEN_OPENAI_KEY_ENV: &str = "CASGEN_OPENAI_KEY";
pub const CASGEN_OPENAI_ENDPOINT_ENV: &str = "CASGEN_OPENAI_ENDPOINT";
pub const CASGEN_MODEL_ENV: &str = "CASGEN_MODEL";

pub const DEFAULT_ENDPOINT: &str = "https://chat-genai.openai.azure.com/";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Supported deployment names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelName {
    #[default]
    Gpt4o,
    Gpt35Turbo,
}

impl ModelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt4o => "gpt-4o",
            ModelName::Gpt35Turbo => "gpt-35-turbo",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "gpt-4o" => Ok(ModelName::Gpt4o),
            "gpt-35-turbo" => Ok(ModelName::Gpt35Turbo),
            other => Err(Error::Configuration(format!(
                "unknown model {other:?} (expected gpt-4o or gpt-35-turbo)"
            ))),
        }
    }
}

/// Credentials and endpoint for the generation backend.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: ModelName,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, model: ModelName) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model,
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load from the environment.
    ///
    /// Precedence per field:
    /// 1) env var (`CASGEN_OPENAI_KEY`, `CASGEN_OPENAI_ENDPOINT`, `CASGEN_MODEL`)
    /// 2) default endpoint/model (the key has no default)
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(CASGEN_OPENAI_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "missing API key: set {CASGEN_OPENAI_KEY_ENV} (do not hardcode secrets in scripts)"
                ))
            })?;

        let endpoint = std::env::var(CASGEN_OPENAI_ENDPOINT_ENV)
            .ok()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let model = match std::env::var(CASGEN_MODEL_ENV) {
            Ok(v) if !v.trim().is_empty() => v.parse()?,
            _ => ModelName::default(),
        };

        Ok(Self::new(api_key, endpoint, model))
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
