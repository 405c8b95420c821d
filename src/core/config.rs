//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.slash/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::recorder::StopPolicy;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SlashConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PollConfig {
    pub conversations_secs: Option<u64>,
    pub messages_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ThreadConfig {
    pub history_limit: Option<u32>,
    pub conversation_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct VoiceConfig {
    pub stop_policy: Option<StopPolicy>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CONVERSATION_POLL_SECS: u64 = 5;
pub const DEFAULT_MESSAGE_POLL_SECS: u64 = 3;
pub const DEFAULT_HISTORY_LIMIT: u32 = 200;
pub const DEFAULT_CONVERSATION_LIMIT: u32 = 50;

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub api_base: String,
    pub conversation_poll: Duration,
    pub message_poll: Duration,
    pub history_limit: u32,
    pub conversation_limit: u32,
    pub stop_policy: StopPolicy,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        resolve_with(&SlashConfig::default(), None, |_| None)
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.slash/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".slash").join("config.toml"))
}

/// Load config from `path`, or `~/.slash/config.toml` when none is given.
///
/// If the default file doesn't exist, generates a commented-out default and
/// returns `SlashConfig::default()`. An explicit path that doesn't exist is
/// an error. A malformed file returns `ConfigError::Parse`.
pub fn load_config(path: Option<&Path>) -> Result<SlashConfig, ConfigError> {
    let path = match path {
        Some(explicit) => explicit.to_path_buf(),
        None => match config_path() {
            Some(p) => {
                if !p.exists() {
                    info!("No config file found, generating default at {}", p.display());
                    generate_default_config(&p);
                    return Ok(SlashConfig::default());
                }
                p
            }
            None => {
                warn!("Could not determine home directory, using default config");
                return Ok(SlashConfig::default());
            }
        },
    };

    let contents = fs::read_to_string(&path)?;
    let config: SlashConfig = toml::from_str(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Slash Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [api]
# base_url = "http://localhost:8000"   # Or set SLASH_API_BASE
# host = "localhost"                   # Used when base_url is unset (or SLASH_HOST)
# port = 8000

# [poll]
# conversations_secs = 5
# messages_secs = 3

# [thread]
# history_limit = 200
# conversation_limit = 50

# [voice]
# stop_policy = "stage"                # "stage" or "auto_send"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &SlashConfig, cli_api_base: Option<&str>) -> ResolvedConfig {
    resolve_with(config, cli_api_base, |key| std::env::var(key).ok())
}

/// Resolution with an injectable environment lookup.
pub fn resolve_with<F>(config: &SlashConfig, cli_api_base: Option<&str>, env: F) -> ResolvedConfig
where
    F: Fn(&str) -> Option<String>,
{
    // API base: CLI → env → config → derived from host + port
    let api_base = cli_api_base
        .map(str::to_string)
        .or_else(|| env("SLASH_API_BASE"))
        .or_else(|| config.api.base_url.clone())
        .filter(|base| !base.trim().is_empty())
        .unwrap_or_else(|| {
            let host = env("SLASH_HOST")
                .or_else(|| config.api.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string());
            derive_api_base(&host, config.api.port.unwrap_or(DEFAULT_PORT))
        });

    ResolvedConfig {
        api_base: api_base.trim_end_matches('/').to_string(),
        conversation_poll: poll_interval(
            config.poll.conversations_secs,
            DEFAULT_CONVERSATION_POLL_SECS,
        ),
        message_poll: poll_interval(config.poll.messages_secs, DEFAULT_MESSAGE_POLL_SECS),
        history_limit: config
            .thread
            .history_limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .max(1),
        conversation_limit: config
            .thread
            .conversation_limit
            .unwrap_or(DEFAULT_CONVERSATION_LIMIT)
            .max(1),
        stop_policy: config.voice.stop_policy.unwrap_or_default(),
    }
}

/// `http://<host>:<port>`; a host that already carries a scheme keeps it.
pub fn derive_api_base(host: &str, port: u16) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{host}:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// Polling faster than once per second only floods the server.
fn poll_interval(secs: Option<u64>, default: u64) -> Duration {
    Duration::from_secs(secs.unwrap_or(default).max(1))
}
