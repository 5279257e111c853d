use std::io;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use log::LevelFilter;
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::app::HEALTH_PATH;

pub const DEFAULT_RELAY_PATH: &str = "/api/chat";
pub const DEFAULT_WEBHOOK_ENV: &str = "N8N_WEBHOOK_URL";
pub const DEFAULT_MANIFEST_FILE: &str = "webhook-relay.toml";

pub struct ManifestLoader {
    manifest: Arc<Manifest>,
}

impl ManifestLoader {
    pub fn load_from_str(contents: &str) -> Result<Self, io::Error> {
        let manifest: Manifest = toml::from_str(contents)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Self::finish(manifest)
    }

    pub fn from_path(path: &Path) -> Result<Self, io::Error> {
        let contents = std::fs::read_to_string(path)?;
        let manifest: Manifest = toml::from_str(&contents)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        Self::finish(manifest)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn into_manifest(self) -> Arc<Manifest> {
        self.manifest
    }

    fn finish(manifest: Manifest) -> Result<Self, io::Error> {
        manifest
            .validate()
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
        Ok(Self {
            manifest: Arc::new(manifest),
        })
    }
}

impl Default for ManifestLoader {
    fn default() -> Self {
        Self {
            manifest: Arc::new(Manifest::default()),
        }
    }
}

/// Contents of `webhook-relay.toml`. Every section is optional.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    #[validate(nested)]
    pub relay: ManifestRelay,
    #[serde(default)]
    pub server: ManifestServer,
    #[serde(default)]
    pub logging: ManifestLogging,
}

impl Manifest {
    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            path: self.relay.path.clone(),
            webhook_env: self.relay.webhook_env.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ManifestRelay {
    #[serde(default = "default_relay_path")]
    #[validate(length(min = 1), custom(function = "validate_route_path"))]
    pub path: String,
    #[serde(default = "default_webhook_env")]
    #[validate(length(min = 1))]
    pub webhook_env: String,
}

impl Default for ManifestRelay {
    fn default() -> Self {
        Self {
            path: default_relay_path(),
            webhook_env: default_webhook_env(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestServer {
    #[serde(default = "default_server_addr")]
    pub addr: SocketAddr,
}

impl Default for ManifestServer {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestLogging {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub echo_stdout: Option<bool>,
}

impl ManifestLogging {
    /// Effective filter: `echo_stdout = false` silences output regardless of level.
    pub fn level_filter(&self) -> LevelFilter {
        if self.echo_stdout.unwrap_or(true) {
            self.level.into()
        } else {
            LevelFilter::Off
        }
    }
}

/// Route and configuration key used to mount the relay handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelaySettings {
    pub path: String,
    pub webhook_env: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Manifest::default().relay_settings()
    }
}

fn default_relay_path() -> String {
    DEFAULT_RELAY_PATH.to_string()
}

fn default_webhook_env() -> String {
    DEFAULT_WEBHOOK_ENV.to_string()
}

fn default_server_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

fn validate_route_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') {
        return Err(ValidationError::new("route_path_must_start_with_slash"));
    }
    // The relay path is matched literally; route parameters and wildcards are not accepted.
    if path.contains(['{', '}', '*']) {
        return Err(ValidationError::new("route_path_must_be_literal"));
    }
    if path == HEALTH_PATH {
        return Err(ValidationError::new("route_path_reserved_for_health"));
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            other => Err(serde::de::Error::custom(format!(
                "logging level must be trace, debug, info, warn, error, or off (got `{}`)",
                other
            ))),
        }
    }
}
