//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! {
//!   "import": { "batchSize": 1000, "skipDuplicatesDefault": true },
//!   "server": { "host": "127.0.0.1", "port": 8080 }
//! }
//! ```
//! Keys this crate doesn't manage are kept when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Data directory: FRONTDESK_DIR if set, otherwise ~/.frontdesk
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FRONTDESK_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".frontdesk")
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSection,
    #[serde(default)]
    server: ServerSection,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    skip_duplicates_default: Option<bool>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Front-desk configuration (resolved view of settings)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Records per insert chunk
    pub batch_size: usize,
    /// Used when a request doesn't say whether to skip duplicates
    pub skip_duplicates_default: bool,
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_duplicates_default: true,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    /// Load config from the data directory.
    ///
    /// A missing or unreadable settings file yields the defaults. The
    /// environment variables FRONTDESK_BATCH_SIZE, FRONTDESK_HOST and
    /// FRONTDESK_PORT override the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let defaults = Config::default();

        let mut config = Self {
            batch_size: raw.import.batch_size.unwrap_or(defaults.batch_size),
            skip_duplicates_default: raw
                .import
                .skip_duplicates_default
                .unwrap_or(defaults.skip_duplicates_default),
            host: raw.server.host.unwrap_or(defaults.host),
            port: raw.server.port.unwrap_or(defaults.port),
        };

        if let Ok(value) = std::env::var("FRONTDESK_BATCH_SIZE") {
            config.batch_size = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid FRONTDESK_BATCH_SIZE: {}", value)))?;
        }
        if let Ok(host) = std::env::var("FRONTDESK_HOST") {
            if !host.trim().is_empty() {
                config.host = host.trim().to_string();
            }
        }
        if let Ok(value) = std::env::var("FRONTDESK_PORT") {
            config.port = value
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid FRONTDESK_PORT: {}", value)))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batchSize must be at least 1".to_string()).into());
        }
        Ok(())
    }

    /// Save config to the data directory, preserving settings we don't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        self.validate()?;
        let mut settings = read_settings(data_dir)?;

        settings.import.batch_size = Some(self.batch_size);
        settings.import.skip_duplicates_default = Some(self.skip_duplicates_default);
        settings.server.host = Some(self.host.clone());
        settings.server.port = Some(self.port);

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(data_dir.join("settings.json"), content)?;
        Ok(())
    }

    /// `host:port` the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    match serde_json::from_str(&content) {
        Ok(settings) => Ok(settings),
        Err(e) => {
            tracing::warn!(path = %settings_path.display(), error = %e, "ignoring malformed settings file");
            Ok(SettingsFile::default())
        }
    }
}
