use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub method: AuthMethod,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Every request is the anonymous user of the default organization.
    #[default]
    None,
    /// Identity headers injected by a trusted upstream gateway.
    Gateway,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Upper bound for a single store operation, in milliseconds.
    #[serde(default = "default_db_timeout")]
    pub timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            timeout_ms: default_db_timeout(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("mrcontent.db")
}

fn default_db_timeout() -> u64 {
    5000
}

/// Message bus configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// NATS server URL, e.g. `nats://localhost:4222`. Without it the bus
    /// stays in-process.
    #[serde(default)]
    pub url: Option<String>,
    /// Buffered messages per topic before slow subscribers start lagging.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
    #[serde(default = "default_bus_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: None,
            capacity: default_bus_capacity(),
            connect_timeout_ms: default_bus_connect_timeout(),
        }
    }
}

fn default_bus_capacity() -> usize {
    256
}

fn default_bus_connect_timeout() -> u64 {
    5000
}

/// How original videos are turned into processing requests.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VideoDispatch {
    /// One `createexperience` request carrying the primary and mask URLs.
    #[default]
    Combined,
    /// Separate `transcodehlsdash`/`compressvideo` requests per original
    /// video, plus `stitchvideos` when a mask exists.
    PerTask,
}

/// Processing orchestration configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingConfig {
    #[serde(default)]
    pub video_dispatch: VideoDispatch,
    /// Register completions for requests that could not be published.
    #[serde(default = "default_true")]
    pub compensate_failed_publishes: bool,
    /// Ignore repeated results for the same output while a record is tracked.
    #[serde(default)]
    pub dedupe_results: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            video_dispatch: VideoDispatch::default(),
            compensate_failed_publishes: true,
            dedupe_results: false,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}
