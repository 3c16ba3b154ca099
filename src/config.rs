//! Configuration and settings management
//!
//! Loads settings from environment variables and defines domain constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Yandex Translate API key
    pub yandex_api_key: String,

    /// Yandex Cloud folder identifier billed for translation calls
    pub yandex_folder_id: String,

    /// Comma-separated list of admin user IDs
    #[serde(rename = "admin_ids")]
    pub admin_ids_str: Option<String>,

    /// Directory holding the persisted allow-list (and, in the webhook
    /// deployment, sessions and usage counters)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether a failed upstream call still consumes a quota unit
    #[serde(default = "default_charge_failed_attempts")]
    pub charge_failed_attempts: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

const fn default_charge_failed_attempts() -> bool {
    true
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required credential
    /// (bot token, translation API key, folder id) is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Returns the set of Telegram IDs with admin rights
    #[must_use]
    pub fn admin_ids(&self) -> HashSet<i64> {
        self.admin_ids_str
            .as_ref()
            .map(|s| {
                s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                    .filter(|token| !token.is_empty())
                    .filter_map(|id| id.parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Daily translation quota per user
pub const DAILY_TRANSLATION_LIMIT: u32 = 20;

/// Maximum accepted source text length, in characters
pub const MAX_TEXT_CHARS: usize = 1000;

/// Timeout for translation API calls, in seconds
pub const TRANSLATE_TIMEOUT_SECS: u64 = 10;

/// Timeout for raw Bot API calls in the webhook deployment, in seconds
pub const TRANSPORT_TIMEOUT_SECS: u64 = 10;

/// Get the translation API timeout from env or default.
///
/// Environment variable: `TRANSLATE_TIMEOUT_SECS`.
#[must_use]
pub fn get_translate_timeout_secs() -> u64 {
    std::env::var("TRANSLATE_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(TRANSLATE_TIMEOUT_SECS)
}

/// Get the Bot API timeout from env or default.
///
/// Environment variable: `TRANSPORT_TIMEOUT_SECS`.
#[must_use]
pub fn get_transport_timeout_secs() -> u64 {
    std::env::var("TRANSPORT_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(TRANSPORT_TIMEOUT_SECS)
}
