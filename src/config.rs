use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::ip::DEFAULT_ECHO_URL;
use crate::provider::glesys::GLESYS_API_BASE;

/// Optional configuration file. Command line flags and environment variables
/// take precedence over anything set here.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub glesys: GlesysConfig,
    #[serde(default)]
    pub ip: IpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlesysConfig {
    #[serde(default)]
    pub api_user: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpConfig {
    #[serde(default = "default_echo_url")]
    pub echo_url: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_url() -> String {
    GLESYS_API_BASE.to_string()
}

fn default_echo_url() -> String {
    DEFAULT_ECHO_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            hosts: Vec::new(),
            glesys: GlesysConfig::default(),
            ip: IpConfig::default(),
        }
    }
}

impl Default for GlesysConfig {
    fn default() -> Self {
        Self {
            api_user: None,
            api_key: None,
            api_url: default_api_url(),
        }
    }
}

impl Default for IpConfig {
    fn default() -> Self {
        Self {
            echo_url: default_echo_url(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_user: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_user", &self.api_user)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Pick credentials from the command line (or its environment fallback),
    /// then from the file.
    pub fn credentials(
        &self,
        api_user: Option<String>,
        api_key: Option<String>,
    ) -> Result<Credentials, Error> {
        let api_user = api_user
            .or_else(|| self.glesys.api_user.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::config("no API user given; use --api-user or GLESYS_API_USER"))?;
        let api_key = api_key
            .or_else(|| self.glesys.api_key.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::config("no API key given; use --api-key or GLESYS_API_KEY"))?;

        Ok(Credentials { api_user, api_key })
    }

    /// Hosts from the command line, or the file's list when none were given.
    pub fn hosts(&self, cli_hosts: Vec<String>) -> Vec<String> {
        if cli_hosts.is_empty() {
            self.hosts.clone()
        } else {
            cli_hosts
        }
    }
}
