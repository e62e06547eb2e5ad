//! Configuration management for Scout
//!
//! Handles loading and saving the tool configuration, including API keys for
//! the search backends and sub-agent model settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Shell execution settings
    #[serde(default)]
    pub exec: ExecConfig,
    /// Brave Search API settings
    #[serde(default)]
    pub brave: BraveConfig,
    /// SerpAPI (Google/Bing) settings
    #[serde(default)]
    pub serpapi: SerpApiConfig,
    /// PDF text extraction settings
    #[serde(default)]
    pub pdf: PdfConfig,
    /// Research sub-agent settings
    #[serde(default)]
    pub agents: AgentsConfig,
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

/// Shell execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub enabled: bool,
    /// Maximum execution time in seconds
    pub timeout_seconds: u64,
    /// Combined output is truncated beyond this many characters
    pub max_output_chars: usize,
    /// Commands that are always blocked
    pub blocked_commands: Vec<String>,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_seconds: 120,
            max_output_chars: 5000,
            blocked_commands: vec![
                "rm -rf /".to_string(),
                "mkfs".to_string(),
                "dd if=/dev".to_string(),
                ":(){:|:&};:".to_string(), // Fork bomb
            ],
        }
    }
}

/// Brave Search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BraveConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable name for API key
    pub api_key_env: String,
    pub max_results: u32,
}

impl Default for BraveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            api_key_env: "BRAVE_API_KEY".to_string(),
            max_results: 6,
        }
    }
}

impl BraveConfig {
    /// Get the API key, checking environment variable if not set directly
    pub fn get_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// SerpAPI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerpApiConfig {
    /// One key or a comma-separated list of keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub google_web_enabled: bool,
    pub bing_web_enabled: bool,
    pub max_results: u32,
}

impl Default for SerpApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "SERPAPI_API_KEY".to_string(),
            google_web_enabled: true,
            bing_web_enabled: true,
            max_results: 6,
        }
    }
}

impl SerpApiConfig {
    pub fn get_api_key(&self) -> Option<String> {
        resolve_key(self.api_key.as_deref(), &self.api_key_env)
    }
}

/// PDF extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    pub enabled: bool,
    pub max_chars: usize,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_chars: 12000,
        }
    }
}

/// Settings for one research sub-agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubAgentConfig {
    pub enabled: bool,
    /// Explicit model; overrides the model environment variable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub max_turns: u32,
}

impl Default for SubAgentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: None,
            max_turns: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub websearcher: SubAgentConfig,
    pub scientific: SubAgentConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Which tool set to expose: "all", "telegram", or "minimal"
    pub tool_profile: String,
    /// Default model when neither config nor environment names one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    /// Log filter used when verbose logging is off
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            tool_profile: "all".to_string(),
            default_model: None,
            log_level: "warn".to_string(),
        }
    }
}

impl GeneralConfig {
    /// `EnvFilter` directive for the CLI subscriber
    pub fn log_filter(&self, verbose: bool) -> String {
        if verbose {
            return "info,scout_core=debug".to_string();
        }
        match self.log_level.trim() {
            "" => "warn".to_string(),
            level => level.to_string(),
        }
    }
}

fn resolve_key(direct: Option<&str>, env_name: &str) -> Option<String> {
    if let Some(key) = direct {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    if env_name.is_empty() {
        return None;
    }
    std::env::var(env_name)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Configuration manager for loading and saving config
pub struct ConfigManager {
    config_path: PathBuf,
    config: ToolsConfig,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::with_path(config_path)
    }

    /// Create a config manager with a specific path
    pub fn with_path(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            ToolsConfig::default()
        };

        Ok(Self { config_path, config })
    }

    /// Get the default config path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not find config directory".to_string()))?;

        Ok(config_dir.join("scout").join("config.toml"))
    }

    fn load_from_path(path: &Path) -> Result<ToolsConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ToolsConfig {
        &mut self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }
}
