//! Configuration module - settings file and environment parsing

use std::env;
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::util::rate_limit::MOVE_RATE_LIMIT;

/// Settings file used when `ARENA_CONFIG` is not set
pub const DEFAULT_CONFIG_FILE: &str = "conf.json";

/// Largest per-player outbound queue accepted from the settings file
pub const MAX_OUTBOUND_CAPACITY: usize = 1 << 16;

/// Tunables for the game engine
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSettings {
    /// Time between round-driver ticks
    pub tick_interval: Duration,
    /// Messages buffered per player before the oldest are dropped
    pub outbound_capacity: usize,
    /// Connections admitted at once
    pub max_players: usize,
    /// Inbound messages accepted per connection per second
    pub move_rate_limit: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1000),
            outbound_capacity: 64,
            max_players: 64,
            move_rate_limit: MOVE_RATE_LIMIT,
        }
    }
}

/// Where the configuration came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The settings file did not exist
    Defaults(PathBuf),
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Public host name, informational
    pub host: String,
    /// Certificate handed to the TLS terminator in front of this server
    pub certificate_path: PathBuf,
    /// Private key handed to the TLS terminator in front of this server
    pub private_key_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub game: GameSettings,
    pub source: ConfigSource,
}

/// On-disk settings file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
struct SettingsFile {
    address: String,
    host: String,
    certificate: PathBuf,
    private_key: PathBuf,
    tick_interval_ms: u64,
    outbound_capacity: usize,
    max_players: usize,
    move_rate_limit: u32,
}

impl Default for SettingsFile {
    fn default() -> Self {
        let game = GameSettings::default();
        Self {
            address: ":4445".to_string(),
            host: String::new(),
            certificate: PathBuf::from("cert.pem"),
            private_key: PathBuf::from("privkey.pem"),
            tick_interval_ms: game.tick_interval.as_millis() as u64,
            outbound_capacity: game.outbound_capacity,
            max_players: game.max_players,
            move_rate_limit: game.move_rate_limit,
        }
    }
}

impl Config {
    /// Load configuration from the settings file named by `ARENA_CONFIG`
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var("ARENA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        Self::load(Path::new(&path), log_level)
    }

    /// Load a settings file; a missing file yields the defaults
    pub fn load(path: &Path, log_level: String) -> Result<Self, ConfigError> {
        let (settings, source) = match fs::read_to_string(path) {
            Ok(text) => (
                serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?,
                ConfigSource::File(path.to_path_buf()),
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => (
                SettingsFile::default(),
                ConfigSource::Defaults(path.to_path_buf()),
            ),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_settings(settings, log_level, source)
    }

    fn from_settings(
        settings: SettingsFile,
        log_level: String,
        source: ConfigSource,
    ) -> Result<Self, ConfigError> {
        if settings.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick-interval-ms must be positive"));
        }
        if settings.outbound_capacity == 0 {
            return Err(ConfigError::Invalid("outbound-capacity must be positive"));
        }
        if settings.outbound_capacity > MAX_OUTBOUND_CAPACITY {
            return Err(ConfigError::Invalid("outbound-capacity must be at most 65536"));
        }

        Ok(Self {
            server_addr: parse_address(&settings.address)?,
            host: settings.host,
            certificate_path: settings.certificate,
            private_key_path: settings.private_key,
            log_level,
            game: GameSettings {
                tick_interval: Duration::from_millis(settings.tick_interval_ms),
                outbound_capacity: settings.outbound_capacity,
                max_players: settings.max_players,
                move_rate_limit: settings.move_rate_limit,
            },
            source,
        })
    }
}

/// Parse a listen address; `:port` binds every interface
fn parse_address(address: &str) -> Result<SocketAddr, ConfigError> {
    let full = if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    };
    full.parse()
        .map_err(|_| ConfigError::InvalidAddress(address.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),

    #[error("Invalid setting: {0}")]
    Invalid(&'static str),
}
