//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/grants.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [llm]
//! provider = "gemini"          # gemini | openai | disabled
//! model = "gemini-1.5-flash"
//! api_key_env = "GEMINI_API_KEY"
//! timeout_secs = 30
//! ```
//!
//! The API key itself never lives in the file: it is read from the
//! environment variable named by `llm.api_key_env`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Override for the provider's API root (proxies, compatible servers).
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Model name, falling back to the provider's default.
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider.as_str()) {
            (Some(m), _) => m,
            (None, "openai") => "gpt-4o-mini",
            (None, _) => "gemini-1.5-flash",
        }
    }

    /// Environment variable holding the API key.
    pub fn key_env(&self) -> &str {
        match (&self.api_key_env, self.provider.as_str()) {
            (Some(v), _) => v,
            (None, "openai") => "OPENAI_API_KEY",
            (None, _) => "GEMINI_API_KEY",
        }
    }

    /// The configured credential, if the variable is set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.key_env())
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/grants.sqlite"),
            },
            server: ServerConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    match config.llm.provider.as_str() {
        "disabled" | "gemini" | "openai" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled, gemini, or openai.",
            other
        ),
    }

    if config.llm.is_enabled() && config.llm.timeout_secs == 0 {
        anyhow::bail!("llm.timeout_secs must be > 0");
    }

    if let Some(ref base) = config.llm.base_url {
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("llm.base_url must start with http:// or https://");
        }
    }

    Ok(config)
}
