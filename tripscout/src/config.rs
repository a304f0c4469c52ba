//! Tripscout configuration types and loading

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::GuestCounts;
use crate::rpc::WorkerSpec;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text-generation provider
    pub llm: LlmConfig,

    /// Accommodation worker
    pub accommodation: WorkerConfig,

    /// Points-of-interest worker
    pub poi: PoiConfig,

    /// Search defaults
    pub search: SearchConfig,

    /// Terminal output limits
    pub display: DisplayConfig,
}

impl Config {
    /// Fail fast when the LLM credential is missing
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).is_err() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".tripscout.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("tripscout").join("tripscout.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (only "openai" chat completions supported)
    pub provider: String,

    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4.1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 3000,
            timeout_ms: 120_000,
            temperature: 0.0,
        }
    }
}

/// How to launch a worker subprocess
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Program and arguments
    pub command: Vec<String>,

    /// Extra environment for the child
    pub env: BTreeMap<String, String>,

    /// Send the MCP `initialize` request after start
    pub initialize: bool,

    /// Time allowed between SIGTERM and kill
    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "npx".to_string(),
                "-y".to_string(),
                "@openbnb/mcp-server-airbnb".to_string(),
                "--ignore-robots-txt".to_string(),
            ],
            env: BTreeMap::new(),
            initialize: false,
            shutdown_grace_ms: 3000,
        }
    }
}

impl WorkerConfig {
    /// Launch spec for the worker named `name`
    pub fn spec(&self, name: &str) -> Result<WorkerSpec> {
        let spec = WorkerSpec::from_command(name, &self.command)
            .context(format!("Invalid command for the {} worker", name))?
            .with_shutdown_grace(Duration::from_millis(self.shutdown_grace_ms));
        Ok(self
            .env
            .iter()
            .fold(spec, |spec, (key, value)| spec.with_env(key, value)))
    }
}

/// Name of the variable the POI worker reads its credential from
pub const POI_CHILD_KEY_VAR: &str = "TRIPADVISOR_API_KEY";

/// Points-of-interest worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoiConfig {
    pub command: Vec<String>,

    pub env: BTreeMap<String, String>,

    pub initialize: bool,

    #[serde(rename = "shutdown-grace-ms")]
    pub shutdown_grace_ms: u64,

    /// Environment variable holding the POI API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// Language requested from every POI tool
    pub language: String,
}

impl Default for PoiConfig {
    fn default() -> Self {
        Self {
            command: vec!["npx".to_string(), "-y".to_string(), "tripadvisor-mcp-node".to_string()],
            env: BTreeMap::new(),
            initialize: true,
            shutdown_grace_ms: 3000,
            api_key_env: POI_CHILD_KEY_VAR.to_string(),
            language: "en".to_string(),
        }
    }
}

impl PoiConfig {
    pub fn worker(&self) -> WorkerConfig {
        WorkerConfig {
            command: self.command.clone(),
            env: self.env.clone(),
            initialize: self.initialize,
            shutdown_grace_ms: self.shutdown_grace_ms,
        }
    }

    /// Launch spec with the API key handed to the child
    pub fn spec(&self, name: &str) -> Result<WorkerSpec> {
        let spec = self.worker().spec(name)?;
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(spec.with_env(POI_CHILD_KEY_VAR, key)),
            _ => {
                tracing::warn!(
                    "POI API key not found in {}; place lookups will likely fail",
                    self.api_key_env
                );
                Ok(spec)
            }
        }
    }
}

/// Search defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Location searched when the request cannot be understood
    #[serde(rename = "default-location")]
    pub default_location: String,

    /// City used for place lookups when the location names none
    #[serde(rename = "default-city")]
    pub default_city: String,

    pub adults: u32,
    pub children: u32,
    pub infants: u32,
    pub pets: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let guests = GuestCounts::default();
        Self {
            default_location: "Kiev, Ukraine".to_string(),
            default_city: "Kiev".to_string(),
            adults: guests.adults,
            children: guests.children,
            infants: guests.infants,
            pets: guests.pets,
        }
    }
}

impl SearchConfig {
    /// Guest counts merged under the extracted values
    pub fn guests(&self) -> GuestCounts {
        GuestCounts {
            adults: self.adults,
            children: self.children,
            infants: self.infants,
            pets: self.pets,
        }
    }
}

/// Terminal output limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Listings offered for selection
    #[serde(rename = "max-listings")]
    pub max_listings: usize,

    #[serde(rename = "max-amenities")]
    pub max_amenities: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_listings: 10,
            max_amenities: 10,
        }
    }
}
