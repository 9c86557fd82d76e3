use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "WAKEGATED_CONFIG";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub detector: DetectorConfig,
    pub buffer: BufferConfig,
    pub action: ActionConfig,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_block_size")]
    pub block_size: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            channels: default_channels(),
        }
    }
}

fn default_device() -> String {
    "default".to_string()
}
fn default_sample_rate() -> u32 {
    16000
}
fn default_block_size() -> u32 {
    512
}
fn default_channels() -> u16 {
    1
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DetectorConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    #[serde(default = "default_required")]
    pub required: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            required: default_required(),
        }
    }
}

fn default_threshold() -> u32 {
    shared::DEFAULT_THRESHOLD
}
fn default_required() -> u32 {
    shared::DEFAULT_REQUIRED
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BufferConfig {
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_broadcast_capacity() -> usize {
    100
}

/// Shell command run on every trigger. Unset means log only.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionConfig {
    #[serde(default)]
    pub command: Option<String>,
    /// Triggers waiting behind a running command; further ones are dropped.
    #[serde(default = "default_action_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            command: None,
            queue_capacity: default_action_queue_capacity(),
        }
    }
}

fn default_action_queue_capacity() -> usize {
    4
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl ServerConfig {
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(shared::default_socket_path)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RateLimitConfig {
    #[serde(default = "default_commands_per_second")]
    pub commands_per_second: u32,
    #[serde(default = "default_burst_capacity")]
    pub burst_capacity: u32,
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            commands_per_second: default_commands_per_second(),
            burst_capacity: default_burst_capacity(),
            enabled: default_rate_limit_enabled(),
        }
    }
}

fn default_commands_per_second() -> u32 {
    10
}

fn default_burst_capacity() -> u32 {
    20
}

fn default_rate_limit_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimeoutsConfig {
    #[serde(default = "default_action_timeout")]
    pub action_timeout_seconds: u64,
    #[serde(default = "default_socket_operation_timeout")]
    pub socket_operation_timeout_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            action_timeout_seconds: default_action_timeout(),
            socket_operation_timeout_seconds: default_socket_operation_timeout(),
        }
    }
}

fn default_action_timeout() -> u64 {
    5
}

fn default_socket_operation_timeout() -> u64 {
    10
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than 0")]
    Zero(&'static str),
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 7] = [
            ("audio.sample_rate", self.audio.sample_rate == 0),
            ("audio.block_size", self.audio.block_size == 0),
            ("audio.channels", self.audio.channels == 0),
            ("buffer.broadcast_capacity", self.buffer.broadcast_capacity == 0),
            ("action.queue_capacity", self.action.queue_capacity == 0),
            (
                "timeouts.action_timeout_seconds",
                self.timeouts.action_timeout_seconds == 0,
            ),
            (
                "timeouts.socket_operation_timeout_seconds",
                self.timeouts.socket_operation_timeout_seconds == 0,
            ),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Zero(*name));
        }

        if self.rate_limit.enabled {
            if self.rate_limit.commands_per_second == 0 {
                return Err(ConfigError::Zero("rate_limit.commands_per_second"));
            }
            if self.rate_limit.burst_capacity == 0 {
                return Err(ConfigError::Zero("rate_limit.burst_capacity"));
            }
        }

        Ok(())
    }
}

pub fn load_config() -> Result<Config> {
    let Some(config_path) = get_config_path() else {
        tracing::info!("No config directory available, using defaults");
        return Ok(Config::default());
    };

    if !config_path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    load_config_from(&config_path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    tracing::info!("Loading config from {:?}", path);
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid config: {}", e))?;

    tracing::info!("Config loaded successfully");
    Ok(config)
}

fn get_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|dir| dir.join("wakegate").join("config.toml"))
}
