//! Per-model endpoint configuration consumed by the completion client.

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_API_PATH: &str = "/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 256;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_TOP_P: f64 = 0.95;
pub const DEFAULT_CANDIDATE_COUNT: u32 = 1;
pub const DEFAULT_LOGPROBS: u32 = 3;

/// One configured inference endpoint. Read-only from the coordinator's
/// perspective; sampling parameters fall back to documented defaults when
/// absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub endpoint: String,
    #[serde(default = "default_api_path")]
    pub api_path: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Number of candidates to request (`n` in the wire body).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
}

impl ModelConfig {
    /// Base URL for API calls: `{endpoint}{api_path}`.
    pub fn base_url(&self) -> String {
        format!("{}{}", self.endpoint, self.api_path)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn top_p(&self) -> f64 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }

    pub fn candidate_count(&self) -> u32 {
        self.n.unwrap_or(DEFAULT_CANDIDATE_COUNT)
    }

    pub fn logprobs(&self) -> u32 {
        self.logprobs.unwrap_or(DEFAULT_LOGPROBS)
    }
}

fn default_api_path() -> String {
    DEFAULT_API_PATH.to_string()
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn sampling_parameters_fall_back_to_defaults() {
        let config: ModelConfig = serde_json::from_value(serde_json::json!({
            "name": "StarCoder2 7B",
            "endpoint": "http://localhost:8000",
        }))
        .expect("deserialize");

        assert_eq!(config.base_url(), "http://localhost:8000/v1");
        assert!(config.enabled);
        assert_eq!(config.max_tokens(), 256);
        assert_eq!(config.temperature(), 0.2);
        assert_eq!(config.top_p(), 0.95);
        assert_eq!(config.candidate_count(), 1);
        assert_eq!(config.logprobs(), 3);
    }

    #[test]
    fn explicit_parameters_win_over_defaults() {
        let config: ModelConfig = serde_json::from_value(serde_json::json!({
            "name": "Alternative Model",
            "endpoint": "http://localhost:8001",
            "api_path": "/openai/v1",
            "enabled": false,
            "max_tokens": 64,
            "n": 2,
        }))
        .expect("deserialize");

        assert_eq!(config.base_url(), "http://localhost:8001/openai/v1");
        assert!(!config.enabled);
        assert_eq!(config.max_tokens(), 64);
        assert_eq!(config.candidate_count(), 2);
    }
}
