use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "LANSHARE_CONFIG";

pub const DEFAULT_PORT: u16 = 8080;

/// Ports below this need an elevated process.
const FIRST_UNPRIVILEGED_PORT: u16 = 1024;

/// Server settings, built once at startup and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address to bind (all interfaces by default, for LAN sharing)
    pub host: IpAddr,
    pub port: u16,
    /// Directory to share
    pub root: PathBuf,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("port out of range: 1 - 65535")]
    PortOutOfRange,
    #[error("port {0} requires root privileges")]
    PrivilegedPort(u16),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads settings from `path`, or from the file named by `LANSHARE_CONFIG`,
    /// or falls back to the defaults when neither is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => Self::from_file(Path::new(&path)),
                None => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parses YAML; missing keys keep their defaults.
    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Checks the port against the privileges of the running process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_with(running_as_root())
    }

    pub fn validate_with(&self, is_root: bool) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::PortOutOfRange);
        }
        if self.port < FIRST_UNPRIVILEGED_PORT && !is_root {
            return Err(ConfigError::PrivilegedPort(self.port));
        }
        Ok(())
    }
}

#[cfg(unix)]
fn running_as_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

// No uid to check; let the bind itself fail if the port is off limits.
#[cfg(not(unix))]
fn running_as_root() -> bool {
    true
}
