// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Static configuration for zone discovery and remote access.
//!
//! Two kinds of configuration reach the engine:
//!
//! - [`DiscoveryConfig`] is a YAML document (default `zones_config.yaml`) holding the
//!   fallback/test/system zone lists, the discovery tuning knobs and the remote command
//!   vocabulary. It is read once at startup and can be reloaded on demand. When the
//!   file does not exist a default document is written out.
//! - [`SshConfig`] holds the credentials for the remote nameserver. It is supplied by
//!   the caller per session and never persisted.
//!
//! # Example
//!
//! ```yaml
//! dns_server: 192.168.1.201
//! fallback_zones: [localhost]
//! test_zones: [localhost, 127.in-addr.arpa, local]
//! discovery:
//!   max_subdomains: 50
//!   dns_timeout: 5
//!   enable_subdomain_discovery: true
//!   enable_dns_walking: true
//! commands:
//!   check_zone: "named-checkzone {zone} {file}"
//!   reload: "rndc reload"
//!   backup_dir: /etc/bind/backup
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_CHECK_ZONE_COMMAND, DEFAULT_DNS_SERVER, DEFAULT_DNS_TIMEOUT_SECS,
    DEFAULT_MAX_SUBDOMAINS, DEFAULT_RELOAD_COMMAND, DNS_PORT, RECORD_QUERY_TIMEOUT_MILLIS,
    SSH_PORT, ZONE_ROOT_DIR,
};

/// Discovery tuning knobs (the `discovery:` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryTuning {
    /// Maximum number of common subdomain labels probed
    pub max_subdomains: usize,
    /// DNS timeout in seconds for discovery probes
    pub dns_timeout: f64,
    /// Probe common subdomain labels when listing all records
    pub enable_subdomain_discovery: bool,
    /// Interrogate the zone's nameservers when few records were found
    pub enable_dns_walking: bool,
}

impl Default for DiscoveryTuning {
    fn default() -> Self {
        Self {
            max_subdomains: DEFAULT_MAX_SUBDOMAINS,
            dns_timeout: DEFAULT_DNS_TIMEOUT_SECS as f64,
            enable_subdomain_discovery: true,
            enable_dns_walking: true,
        }
    }
}

/// Remote command vocabulary (the `commands:` section).
///
/// The zone checker and reload commands are environment specific, so they are
/// templates rather than hard-coded invocations. `{zone}` and `{file}` are replaced
/// with shell-quoted values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    /// Zone syntax checker, run against the temporary file
    pub check_zone: String,
    /// Reload command, run after the file is replaced
    pub reload: String,
    /// Directory receiving a backup copy before every mutation
    pub backup_dir: String,
    /// Directory for the temporary file; defaults to the zone file's own directory
    pub temp_dir: Option<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            check_zone: DEFAULT_CHECK_ZONE_COMMAND.to_string(),
            reload: DEFAULT_RELOAD_COMMAND.to_string(),
            backup_dir: DEFAULT_BACKUP_DIR.to_string(),
            temp_dir: None,
        }
    }
}

/// The zones configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Authoritative server used for queries and zone transfers (`ip` or `ip:port`)
    pub dns_server: String,
    /// Zones returned when nothing else can be discovered
    pub fallback_zones: Vec<String>,
    /// Zones probed with an SOA query when remote discovery finds nothing
    pub test_zones: Vec<String>,
    /// Zones never returned by discovery
    pub system_zones: Vec<String>,
    /// Discovery tuning knobs
    pub discovery: DiscoveryTuning,
    /// Remote command vocabulary
    pub commands: CommandSettings,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dns_server: DEFAULT_DNS_SERVER.to_string(),
            fallback_zones: vec!["localhost".to_string()],
            test_zones: vec![
                "localhost".to_string(),
                "127.in-addr.arpa".to_string(),
                "local".to_string(),
            ],
            system_zones: [
                "localhost",
                "127.in-addr.arpa",
                "0.in-addr.arpa",
                "255.in-addr.arpa",
                "root.hint",
                "hint",
                ".",
                "cache",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
            discovery: DiscoveryTuning::default(),
            commands: CommandSettings::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Parse a configuration document from YAML text.
    ///
    /// Keys missing from the document take their default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML for this schema.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse zones configuration YAML")
    }

    /// Load the configuration document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_yaml(&text)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load the document at `path`, creating it with defaults when it does not exist.
    ///
    /// A file that exists but cannot be parsed is reported and replaced in memory by the
    /// defaults; the file itself is left alone so an operator can fix it.
    #[must_use]
    pub fn load_or_init(path: &Path) -> Self {
        if !path.exists() {
            info!(
                "File {} not found, creating with default configuration",
                path.display()
            );
            let config = Self::default();
            if let Err(e) = config.write(path) {
                error!("Error creating configuration file: {e:#}");
            }
            return config;
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Error loading configuration, using defaults: {e:#}");
                Self::default()
            }
        }
    }

    /// Write this configuration to `path` as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = serde_yaml::to_string(self).context("Failed to serialize configuration")?;
        std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Configuration written to {}", path.display());
        Ok(())
    }

    /// Timeout used for discovery probes (subdomains, SOA test zones).
    #[must_use]
    pub fn dns_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.discovery.dns_timeout)
            .unwrap_or(Duration::from_secs(DEFAULT_DNS_TIMEOUT_SECS))
    }

    /// Timeout for the per-type queries issued after a refused transfer.
    ///
    /// The lesser of the discovery timeout and half a second, to keep interactive
    /// listing responsive.
    #[must_use]
    pub fn record_query_timeout(&self) -> Duration {
        self.dns_timeout()
            .min(Duration::from_millis(RECORD_QUERY_TIMEOUT_MILLIS))
    }

    /// Socket address of the configured authoritative server.
    ///
    /// Accepts `ip`, `ip:port` and `[v6]:port`; a bare address gets port 53. An
    /// unparseable value falls back to the default server.
    #[must_use]
    pub fn dns_server_addr(&self) -> SocketAddr {
        parse_server_addr(&self.dns_server).unwrap_or_else(|| {
            debug!(
                "Invalid dns_server '{}', using {DEFAULT_DNS_SERVER}",
                self.dns_server
            );
            SocketAddr::new(
                DEFAULT_DNS_SERVER
                    .parse()
                    .unwrap_or(IpAddr::from([127, 0, 0, 1])),
                DNS_PORT,
            )
        })
    }
}

/// Parse `ip`, `ip:port` or `[v6]:port` into a socket address, defaulting to port 53.
#[must_use]
pub fn parse_server_addr(server: &str) -> Option<SocketAddr> {
    let server = server.trim();
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Some(addr);
    }
    server
        .parse::<IpAddr>()
        .ok()
        .map(|ip| SocketAddr::new(ip, DNS_PORT))
}

/// Credentials for the remote nameserver.
///
/// Supplied by the caller before any discovery or mutation call, overwritten on
/// reconfiguration, never written to disk by the engine.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// Remote host name or address
    pub hostname: String,
    /// Login user
    pub username: String,
    /// Login password
    #[serde(skip_serializing)]
    pub password: String,
    /// SSH port
    pub port: u16,
    /// Directory holding zone files on the remote host
    pub zone_files_path: String,
    /// Whether the credentials were explicitly configured
    pub configured: bool,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            username: String::new(),
            password: String::new(),
            port: SSH_PORT,
            zone_files_path: ZONE_ROOT_DIR.to_string(),
            configured: false,
        }
    }
}

impl SshConfig {
    /// Build a configured set of credentials with the default port and zone path.
    #[must_use]
    pub fn new(hostname: &str, username: &str, password: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            configured: true,
            ..Self::default()
        }
    }

    /// True when credentials were configured and name a host and user.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured && !self.hostname.is_empty() && !self.username.is_empty()
    }
}

// The password never reaches logs.
impl fmt::Debug for SshConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshConfig")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("port", &self.port)
            .field("zone_files_path", &self.zone_files_path)
            .field("configured", &self.configured)
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
