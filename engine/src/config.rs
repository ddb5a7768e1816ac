//! Read-only configuration for the coordinator.
//!
//! Loaded from `~/.fimpad/config.toml`. A missing file or unparseable
//! content falls back to defaults with a warning — configuration problems
//! never prevent the editor from starting.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use fimpad_protocol::ModelConfig;
use serde::Deserialize;

pub const DEFAULT_MODEL_KEY: &str = "starcoder";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_DEBUG_ENTRIES: usize = 10;
pub const DEFAULT_KEY_PREFIX: &str = "fim_completions_";
pub const DEFAULT_FILE_PREFIX: &str = "fim_completions_";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Configured endpoints, keyed by short model key (`[models.<key>]`).
    /// When the table is present it replaces the defaults wholesale.
    #[serde(default = "default_models")]
    pub models: BTreeMap<String, ModelConfig>,
    #[serde(default = "default_model_key")]
    pub default_model: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_debug_entries")]
    pub max_debug_entries: usize,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Where day partitions live; defaults to `~/.fimpad/completions`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            default_model: default_model_key(),
            request_timeout_ms: default_request_timeout_ms(),
            max_debug_entries: default_max_debug_entries(),
            key_prefix: default_key_prefix(),
            file_prefix: default_file_prefix(),
            data_dir: None,
        }
    }
}

impl AppConfig {
    /// The model the session talks to: the configured default key when that
    /// model is enabled, otherwise the first enabled model.
    pub fn active_model(&self) -> anyhow::Result<&ModelConfig> {
        if let Some(model) = self.models.get(&self.default_model)
            && model.enabled
        {
            return Ok(model);
        }
        self.models
            .values()
            .find(|model| model.enabled)
            .ok_or_else(|| anyhow::anyhow!("no enabled model configured"))
    }

    /// Look up a model by key, for explicit `--model` overrides.
    pub fn model(&self, key: &str) -> anyhow::Result<&ModelConfig> {
        self.models
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("unknown model key: {key}"))
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for completion data dir");
        };
        Ok(home.join(".fimpad").join("completions"))
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn new_default() -> anyhow::Result<Self> {
        let Some(home) = dirs::home_dir() else {
            anyhow::bail!("cannot determine home directory for config path");
        };
        Ok(Self::new(default_config_path(&home)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults on a missing or
    /// unparseable file.
    pub fn load(&self) -> AppConfig {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return AppConfig::default(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "unreadable config, using defaults"
                );
                return AppConfig::default();
            }
        };
        match toml_edit::de::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %err,
                    "unparseable config, using defaults"
                );
                AppConfig::default()
            }
        }
    }
}

fn default_config_path(home: &Path) -> PathBuf {
    home.join(".fimpad").join("config.toml")
}

fn default_models() -> BTreeMap<String, ModelConfig> {
    BTreeMap::from([
        (
            "starcoder".to_string(),
            ModelConfig {
                name: "StarCoder2 7B".to_string(),
                endpoint: "http://localhost:8000".to_string(),
                api_path: "/v1".to_string(),
                enabled: true,
                max_tokens: Some(256),
                temperature: Some(0.2),
                top_p: Some(0.95),
                n: Some(2),
                logprobs: Some(3),
            },
        ),
        (
            "alternative".to_string(),
            ModelConfig {
                name: "Alternative Model".to_string(),
                endpoint: "http://localhost:8001".to_string(),
                api_path: "/v1".to_string(),
                enabled: true,
                max_tokens: Some(256),
                temperature: Some(0.2),
                top_p: Some(0.95),
                n: Some(2),
                logprobs: Some(3),
            },
        ),
    ])
}

fn default_model_key() -> String {
    DEFAULT_MODEL_KEY.to_string()
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_max_debug_entries() -> usize {
    DEFAULT_MAX_DEBUG_ENTRIES
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_file_prefix() -> String {
    DEFAULT_FILE_PREFIX.to_string()
}
