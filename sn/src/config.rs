//! SeatSniper configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::SchedulerConfig;

/// Main SeatSniper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Pacing and retry policy
    pub scheduler: SchedulerConfig,

    /// Where targets and statuses are kept
    pub storage: StorageConfig,

    /// Selection system endpoint and session
    pub client: ClientConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .seatsniper.yml
        let local_config = PathBuf::from(".seatsniper.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/seatsniper/seatsniper.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("seatsniper").join("seatsniper.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Any failure yields `None`; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding target_courses.json and course_status.json
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/seatsniper on Linux)
        let dir = dirs::data_local_dir()
            .map(|d| d.join("seatsniper"))
            .unwrap_or_else(|| PathBuf::from("data"));
        Self { dir }
    }
}

/// Selection system client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the academic affairs system
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Student number the selection is made for
    #[serde(rename = "student-id")]
    pub student_id: String,

    /// Environment variable holding the authenticated session cookie
    #[serde(rename = "cookie-env")]
    pub cookie_env: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Term and enrollment parameters sent with each selection
    pub selection: SelectionParams,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            student_id: String::new(),
            cookie_env: "SEATSNIPER_COOKIE".to_string(),
            timeout_ms: 10_000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
            selection: SelectionParams::default(),
        }
    }
}

impl ClientConfig {
    /// Check the fields a run cannot start without
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(eyre::eyre!("client.base-url is not set"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(eyre::eyre!("client.base-url must start with http:// or https://"));
        }
        if self.student_id.trim().is_empty() {
            return Err(eyre::eyre!("client.student-id is not set"));
        }
        Ok(())
    }
}

/// Term and enrollment parameters for the selection form
///
/// A target attribute with the same form name overrides the value here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionParams {
    /// Selection control id
    #[serde(rename = "xkkz-id")]
    pub xkkz_id: String,

    /// Grade code
    #[serde(rename = "njdm-id")]
    pub njdm_id: String,

    /// Grade code (student view)
    #[serde(rename = "njdm-id-xs")]
    pub njdm_id_xs: String,

    /// Major id
    #[serde(rename = "zyh-id")]
    pub zyh_id: String,

    /// Major id (student view)
    #[serde(rename = "zyh-id-xs")]
    pub zyh_id_xs: String,

    /// Academic year
    pub xkxnm: String,

    /// Term code
    pub xkxqm: String,
}
