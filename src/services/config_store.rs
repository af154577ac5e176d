// Configuration Storage Service
// Handles config file read/write, environment overrides and version backup

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::services::classifier::ModelSource;
use crate::services::detection::ProviderFailurePolicy;
use crate::services::providers::ProviderFormat;

pub const TITAN_DEFAULT_URL: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";
pub const TITAN_DEFAULT_MODEL: &str = "amazon.titan-text-express-v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelSource,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            server: ServerConfig::default(),
            model: ModelSource::default(),
            llm: LlmSettings::default(),
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

/// Explanation provider settings, fixed per deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmSettings {
    #[serde(default)]
    pub format: ProviderFormat,
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model_id: String,
    #[serde(default = "default_max_tokens")]
    pub max_token_count: i32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            format: ProviderFormat::default(),
            base_url: default_llm_url(),
            model_id: default_llm_model(),
            max_token_count: default_max_tokens(),
            temperature: default_temperature(),
            stop_sequences: Vec::new(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_explain_concurrency")]
    pub explain_concurrency: usize,
    #[serde(default)]
    pub on_provider_error: ProviderFailurePolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            explain_concurrency: default_explain_concurrency(),
            on_provider_error: ProviderFailurePolicy::default(),
        }
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_bind_addr() -> String { "0.0.0.0:8080".to_string() }
fn default_llm_url() -> String { TITAN_DEFAULT_URL.to_string() }
fn default_llm_model() -> String { TITAN_DEFAULT_MODEL.to_string() }
fn default_max_tokens() -> i32 { 150 }
fn default_temperature() -> f64 { 0.7 }
fn default_timeout_secs() -> u64 { 60 }
fn default_explain_concurrency() -> usize { 4 }

impl AppConfig {
    /// Apply REVIEWTRUST_* environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(addr) = get("REVIEWTRUST_BIND") {
            self.server.bind_addr = addr;
        }
        if let Some(path) = get("REVIEWTRUST_MODEL_PATH") {
            self.model = ModelSource::Local {
                path: PathBuf::from(path),
            };
        }
        if let Some(url) = get("REVIEWTRUST_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("REVIEWTRUST_LLM_MODEL") {
            self.llm.model_id = model;
        }
    }
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Store backed by an explicit file path
    pub fn with_file(config_file: PathBuf) -> Self {
        let config_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("reviewtrust"))
    }

    /// Store selected by REVIEWTRUST_CONFIG, falling back to the user config dir
    pub fn from_env() -> Self {
        match std::env::var("REVIEWTRUST_CONFIG") {
            Ok(p) if !p.trim().is_empty() => Self::with_file(PathBuf::from(p.trim())),
            _ => Self::new(Self::default_config_dir().unwrap_or_else(|| PathBuf::from("."))),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), String> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| format!("Failed to create config dir: {}", e))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, String> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| format!("Failed to read config: {}", e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Load the file and apply environment overrides
    pub fn resolve(&self) -> Result<AppConfig, String> {
        let mut config = self.load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), String> {
        self.ensure_dir()?;

        // Create backup if file exists
        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(&self.config_file, content)
            .map_err(|e| format!("Failed to write config: {}", e))
    }

    fn create_backup(&self) -> Result<(), String> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| format!("Failed to create backup dir: {}", e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| format!("Failed to create backup: {}", e))?;

        self.cleanup_old_backups(&backup_dir, 10)?;

        Ok(())
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), String> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(|e| format!("Failed to read backup dir: {}", e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // Oldest first
        entries.sort_by_key(|e| {
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
        });

        for entry in entries.iter().take(entries.len() - keep) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Provider API key stored in the config file
    pub fn get_api_key(&self) -> Result<Option<String>, String> {
        let config = self.load()?;
        Ok(config.llm.api_key)
    }
}
