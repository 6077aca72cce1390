// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Layered configuration: defaults, then an optional TOML file, then
//! `SLIMSTREAMER_`-prefixed environment variables, merged via `figment`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

fn default_control_address() -> String {
    "0.0.0.0:3483".to_string()
}

fn default_http_address() -> String {
    "0.0.0.0:9000".to_string()
}

const fn default_pool_size() -> usize {
    8
}

const fn default_writer_queue_depth() -> usize {
    128
}

const fn default_chunk_duration_ms() -> u32 {
    20
}

const fn default_channels() -> u16 {
    2
}

const fn default_bits_per_sample() -> u16 {
    32
}

/// A single capture device bound to one sampling rate (§6).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct RateDeviceConfig {
    pub sampling_rate: u32,
    pub device_name: String,
}

/// Capture-side configuration: which rates are served and by which devices.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct CaptureConfig {
    /// One entry per supported sampling rate; exactly one Pipeline is
    /// created per entry at startup (§3).
    pub rates: Vec<RateDeviceConfig>,
    #[serde(default = "default_channels")]
    pub channels: u16,
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u16,
    #[serde(default = "default_chunk_duration_ms")]
    pub chunk_duration_ms: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            rates: vec![
                RateDeviceConfig { sampling_rate: 44_100, device_name: "hw:1,1,1".to_string() },
                RateDeviceConfig { sampling_rate: 48_000, device_name: "hw:1,1,2".to_string() },
            ],
            channels: default_channels(),
            bits_per_sample: default_bits_per_sample(),
            chunk_duration_ms: default_chunk_duration_ms(),
        }
    }
}

/// Buffer pool and writer queue sizing (§4.1, §4.3).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct BufferConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_writer_queue_depth")]
    pub writer_queue_depth: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { pool_size: default_pool_size(), writer_queue_depth: default_writer_queue_depth() }
    }
}

/// Network-facing addresses for the two client channels (§6).
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ServerConfig {
    /// SlimProto control connections (TCP).
    #[serde(default = "default_control_address")]
    pub control_address: String,
    /// `GET /stream?player=<clientID>` (HTTP).
    #[serde(default = "default_http_address")]
    pub http_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { control_address: default_control_address(), http_address: default_http_address() }
    }
}

/// Log level for filtering messages.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

/// Logging configuration for console and file output.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub console_enable: bool,
    #[serde(default)]
    pub file_enable: bool,
    #[serde(default)]
    pub console_level: LogLevel,
    #[serde(default)]
    pub file_level: LogLevel,
    #[serde(default)]
    pub file_path: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enable: true,
            file_enable: false,
            console_level: LogLevel::default(),
            file_level: LogLevel::Info,
            file_path: "./slimstreamer.log".to_string(),
        }
    }
}

/// Root configuration for the SlimStreamer server.
#[derive(Deserialize, Serialize, Default, Debug, Clone, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug)]
pub struct ConfigLoadResult {
    pub config: Config,
    pub file_missing: Option<String>,
}

/// Loads configuration from defaults, an optional TOML file, and
/// `SLIMSTREAMER_`-prefixed environment variables (double underscore nests).
///
/// # Errors
///
/// Returns an error if the config file contains invalid TOML, or an
/// environment variable carries a value that fails to parse for its field.
pub fn load(config_path: &str) -> Result<ConfigLoadResult, Box<figment::Error>> {
    let mut figment = Figment::new().merge(figment::providers::Serialized::defaults(Config::default()));

    let mut file_missing = None;
    if std::path::Path::new(config_path).exists() {
        figment = figment.merge(Toml::file(config_path));
    } else {
        file_missing = Some(config_path.to_string());
    }

    let config: Config =
        figment.merge(Env::prefixed("SLIMSTREAMER_").split("__")).extract().map_err(Box::new)?;

    Ok(ConfigLoadResult { config, file_missing })
}

/// Generates the default configuration as a pretty-printed TOML string.
///
/// # Errors
///
/// Returns an error if the default configuration cannot be serialized,
/// which would indicate a programming error in a field's `Serialize` impl.
pub fn generate_default() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let toml_string = generate_default().expect("serializes");
        let parsed: Config = toml::from_str(&toml_string).expect("deserializes");
        assert_eq!(parsed.server.control_address, default_control_address());
        assert_eq!(parsed.capture.rates.len(), 2);
    }

    #[test]
    fn missing_config_file_is_reported_but_not_fatal() {
        let result = load("/nonexistent/path/to/slimstreamer.toml").expect("falls back to defaults");
        assert!(result.file_missing.is_some());
        assert_eq!(result.config.server.http_address, default_http_address());
    }
}
