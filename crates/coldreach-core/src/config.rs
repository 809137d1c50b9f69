//! Coldreach configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub rewrite: RewriteConfig,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            smtp: SmtpConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            rewrite: RewriteConfig::default(),
        }
    }
}

impl OutreachConfig {
    /// Load config from the default path (~/.coldreach/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::OutreachError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::OutreachError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::OutreachError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Coldreach home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".coldreach")
    }
}

/// SMTP relay configuration. The relay account is the envelope sender
/// for every outgoing email; `from_name` is only the fallback display
/// name when a record carries none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".into()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_from_name() -> String {
    "Outreach".into()
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            email: String::new(),
            password: String::new(),
            from_name: default_from_name(),
        }
    }
}

/// Gateway configuration. `cron_secret` is the pre-shared bearer token
/// the dispatcher trigger endpoint requires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cron_secret: String,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cron_secret: String::new(),
        }
    }
}

/// Storage paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_resume_dir")]
    pub resume_dir: String,
}

fn default_db_path() -> String {
    "~/.coldreach/outreach.db".into()
}
fn default_resume_dir() -> String {
    "~/.coldreach/resumes".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            resume_dir: default_resume_dir(),
        }
    }
}

/// AI rephrasing configuration. Disabled unless an API key is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_rewrite_model")]
    pub model: String,
    #[serde(default = "default_rewrite_endpoint")]
    pub endpoint: String,
}

fn default_rewrite_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_rewrite_endpoint() -> String {
    "https://generativelanguage.googleapis.com".into()
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: default_rewrite_model(),
            endpoint: default_rewrite_endpoint(),
        }
    }
}
