// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone discovery.
//!
//! [`ZoneDiscovery::list_zones`] answers "which zones does this nameserver
//! serve?". With remote credentials it opens one session and unions two probes:
//!
//! - `zone "<name>" {` declarations found in the usual BIND configuration files
//! - zone-file names found in the zone directories
//!
//! The union is filtered (invalid and system zones dropped), deduplicated and
//! sorted. When the remote probes find nothing, or cannot run at all, the test
//! zones are probed with SOA queries and, failing that, the configured fallback
//! list is returned. The result is never empty.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::{DiscoveryConfig, SshConfig};
use crate::constants::{
    BIND_CONFIG_FILES, SSH_CONNECT_TIMEOUT_SECS, ZONE_DIRECT_DIR, ZONE_REVERSE_DIR, ZONE_ROOT_DIR,
};
use crate::dns_errors::SessionError;
use crate::metrics;
use crate::query::QueryEngine;
use crate::records::validation::{is_system_zone, is_valid_zone_name};
use crate::remote::{commands, RemoteConnector, RemoteSession};

/// Discovery method reported when the remote probes produced the listing.
pub const METHOD_SSH_AUTOMATIC: &str = "ssh_automatic";

/// Discovery method reported for SOA-probed or static listings.
pub const METHOD_FALLBACK: &str = "fallback";

/// Zone returned when every other source is empty.
const LAST_RESORT_ZONE: &str = "localhost";

/// Substrings that disqualify a file name from being a zone file.
const ZONE_FILE_DENYLIST: &[&str] = &[
    "readme",
    "backup",
    "tmp",
    "lock",
    "journal",
    "jnl",
    "named.conf",
    "rndc.key",
    "bind.keys",
    "root.hints",
    "managed-keys",
];

/// A zone listing and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneListing {
    /// Sorted, deduplicated zone names; never empty
    pub zones: Vec<String>,
    /// `ssh_automatic` or `fallback`
    pub discovery_method: String,
}

/// Discovers the zones served by the nameserver.
#[derive(Clone)]
pub struct ZoneDiscovery {
    connector: Arc<dyn RemoteConnector>,
    query: QueryEngine,
}

impl ZoneDiscovery {
    #[must_use]
    pub fn new(connector: Arc<dyn RemoteConnector>, query: QueryEngine) -> Self {
        Self { connector, query }
    }

    /// List the zones served by the nameserver.
    pub async fn list_zones(&self, config: &DiscoveryConfig, ssh: &SshConfig) -> Vec<String> {
        self.refresh_zones(config, ssh).await.zones
    }

    /// Run discovery and report which method produced the listing.
    pub async fn refresh_zones(&self, config: &DiscoveryConfig, ssh: &SshConfig) -> ZoneListing {
        if !ssh.is_configured() {
            info!("SSH not configured, using fallback zones");
            return self.finish(static_fallback(config), METHOD_FALLBACK);
        }

        match self.discover_remote(config, ssh).await {
            Ok(zones) if !zones.is_empty() => {
                info!(
                    "Total valid zones discovered: {} - {zones:?}",
                    zones.len()
                );
                self.finish(zones, METHOD_SSH_AUTOMATIC)
            }
            Ok(_) => {
                warn!("No valid zones found via SSH, using fallback zones");
                let zones = self.probe_fallback(config).await;
                self.finish(zones, METHOD_FALLBACK)
            }
            Err(e) => {
                error!("Error in automatic zone discovery: {e}");
                let zones = self.probe_fallback(config).await;
                self.finish(zones, METHOD_FALLBACK)
            }
        }
    }

    fn finish(&self, zones: Vec<String>, method: &str) -> ZoneListing {
        metrics::record_discovery(method);
        ZoneListing {
            zones,
            discovery_method: method.to_string(),
        }
    }

    /// Open a session and union the configuration scan with the directory scan.
    async fn discover_remote(
        &self,
        config: &DiscoveryConfig,
        ssh: &SshConfig,
    ) -> Result<Vec<String>, SessionError> {
        info!("Starting automatic zone discovery via SSH...");
        debug!(
            "SSH config: {}:{} as {}",
            ssh.hostname, ssh.port, ssh.username
        );

        let mut session = self
            .connector
            .connect(ssh, Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS))
            .await?;

        let mut zones = scan_bind_configs(session.as_mut()).await;
        if zones.is_empty() {
            debug!("No zones found in BIND configuration files");
        } else {
            info!("Zones found in BIND configuration: {zones:?}");
        }

        let file_zones = scan_zone_directories(session.as_mut(), ssh).await;
        session.close().await;

        let new_zones: Vec<String> = file_zones
            .into_iter()
            .filter(|zone| !zones.contains(zone))
            .collect();
        if !new_zones.is_empty() {
            info!("New zones found in zone files: {new_zones:?}");
        }
        zones.extend(new_zones);

        debug!("Raw zones discovered: {zones:?}");
        Ok(filter_zones(zones, &config.system_zones))
    }

    /// SOA-probe the test zones, then fall back to the static list.
    async fn probe_fallback(&self, config: &DiscoveryConfig) -> Vec<String> {
        let server = config.dns_server_addr();
        let timeout = config.dns_timeout();
        debug!(
            "Testing zones with DNS queries (timeout: {:?}): {:?}",
            timeout, config.test_zones
        );

        let mut found = Vec::new();
        for zone in &config.test_zones {
            if self.query.probe_soa(server, zone, timeout).await {
                debug!("Fallback zone detected via DNS: {zone}");
                found.push(zone.clone());
            }
        }

        if found.is_empty() {
            info!("No test zones detected via DNS, using configured fallback zones");
            return static_fallback(config);
        }
        info!("Zones detected via DNS queries: {found:?}");
        sorted_unique(found)
    }
}

/// The configured fallback list, or `["localhost"]` when it is empty.
fn static_fallback(config: &DiscoveryConfig) -> Vec<String> {
    let zones = sorted_unique(config.fallback_zones.clone());
    if zones.is_empty() {
        warn!("No zones found anywhere, defaulting to {LAST_RESORT_ZONE}");
        return vec![LAST_RESORT_ZONE.to_string()];
    }
    zones
}

fn sorted_unique(mut zones: Vec<String>) -> Vec<String> {
    zones.sort();
    zones.dedup();
    zones
}

/// Drop invalid and system zones, then deduplicate and sort.
#[must_use]
pub fn filter_zones(zones: Vec<String>, system_zones: &[String]) -> Vec<String> {
    let valid: Vec<String> = zones
        .into_iter()
        .filter(|zone| {
            if !is_valid_zone_name(zone) {
                debug!("Zone ignored (invalid name): {zone}");
                false
            } else if is_system_zone(zone, system_zones) {
                debug!("Zone ignored (system zone): {zone}");
                false
            } else {
                true
            }
        })
        .collect();
    sorted_unique(valid)
}

/// Read every BIND configuration file that exists and collect its zone names.
async fn scan_bind_configs(session: &mut dyn RemoteSession) -> Vec<String> {
    let mut zones: Vec<String> = Vec::new();
    for path in BIND_CONFIG_FILES {
        match read_if_exists(session, path).await {
            Ok(Some(content)) => {
                debug!("Analyzing configuration file: {path}");
                for zone in parse_bind_config_zones(&content) {
                    if !zones.contains(&zone) {
                        zones.push(zone);
                    }
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Error analyzing {path}: {e}"),
        }
    }
    zones
}

async fn read_if_exists(
    session: &mut dyn RemoteSession,
    path: &str,
) -> Result<Option<String>, SessionError> {
    let check = session.exec(&commands::file_exists(path)).await?;
    if !commands::reports_exists(&check.stdout) {
        return Ok(None);
    }
    let output = session.exec(&commands::read_file(path)).await?;
    if output.success() {
        Ok(Some(output.stdout))
    } else {
        debug!("Cannot read {path}: {}", output.diagnostics());
        Ok(None)
    }
}

/// Zone directories scanned for zone files.
///
/// The configured path is added when it is not one of the default locations.
#[must_use]
pub fn zone_directories(ssh: &SshConfig) -> Vec<String> {
    let mut dirs = vec![ZONE_DIRECT_DIR.to_string(), ZONE_REVERSE_DIR.to_string()];
    let configured = ssh.zone_files_path.trim();
    if !configured.is_empty()
        && ![ZONE_ROOT_DIR, ZONE_DIRECT_DIR, ZONE_REVERSE_DIR].contains(&configured)
    {
        dirs.push(configured.to_string());
    }
    dirs
}

async fn scan_zone_directories(session: &mut dyn RemoteSession, ssh: &SshConfig) -> Vec<String> {
    let mut zones: Vec<String> = Vec::new();
    for dir in zone_directories(ssh) {
        match list_zone_files(session, &dir).await {
            Ok(files) => {
                for file in files {
                    if let Some(zone) = zone_name_from_file(&file) {
                        if !zones.contains(&zone) {
                            debug!("Zone found in files: {zone} (file: {file} in {dir})");
                            zones.push(zone);
                        }
                    }
                }
            }
            Err(e) => debug!("Error analyzing {dir}: {e}"),
        }
    }
    zones
}

async fn list_zone_files(
    session: &mut dyn RemoteSession,
    dir: &str,
) -> Result<Vec<String>, SessionError> {
    let check = session.exec(&commands::dir_exists(dir)).await?;
    if !commands::reports_exists(&check.stdout) {
        return Ok(Vec::new());
    }
    debug!("Analyzing zone directory: {dir}");
    let output = session.exec(&commands::list_files(dir)).await?;
    Ok(output
        .stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// Extract zone names from `zone "<name>" {` declarations, case-insensitively.
#[must_use]
pub fn parse_bind_config_zones(content: &str) -> Vec<String> {
    let lower = content.to_ascii_lowercase();
    let mut zones = Vec::new();
    let mut from = 0;

    while let Some(offset) = lower[from..].find("zone") {
        let start = from + offset + "zone".len();
        from = start;

        let rest = &content[start..];
        let after_ws = rest.trim_start();
        if after_ws.len() == rest.len() {
            continue;
        }
        let Some(quoted) = after_ws.strip_prefix('"') else {
            continue;
        };
        let Some(end) = quoted.find('"') else {
            continue;
        };
        let name = &quoted[..end];
        if name.is_empty() || !quoted[end + 1..].trim_start().starts_with('{') {
            continue;
        }

        let name = name.trim().to_string();
        debug!("Zone found in config: {name}");
        zones.push(name);
    }
    zones
}

/// True for a bare domain-like name: alphanumeric-led labels of alphanumerics and
/// hyphens, one optional trailing dot.
fn looks_like_domain(name: &str) -> bool {
    let name = name.strip_suffix('.').unwrap_or(name);
    !name.is_empty()
        && name.split('.').all(|label| {
            label
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric())
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// True when `filename` follows a zone-file naming convention and is not on the
/// denylist.
#[must_use]
pub fn is_zone_file(filename: &str) -> bool {
    let name = filename.trim().to_ascii_lowercase();
    if name.is_empty() || name.starts_with('.') {
        return false;
    }
    if ZONE_FILE_DENYLIST.iter().any(|pattern| name.contains(pattern)) {
        return false;
    }
    name.starts_with("db.")
        || name.ends_with(".zone")
        || name.ends_with(".db")
        || looks_like_domain(&name)
}

/// Zone name derived from a zone-file name, `None` when the file is not a zone file
/// or the derived name is invalid.
#[must_use]
pub fn zone_name_from_file(filename: &str) -> Option<String> {
    let filename = filename.trim();
    if !is_zone_file(filename) {
        return None;
    }

    let zone = if let Some(zone) = filename.strip_prefix("db.") {
        zone
    } else if let Some(zone) = filename.strip_suffix(".db") {
        zone
    } else if let Some(zone) = filename.strip_suffix(".zone") {
        zone
    } else {
        filename
    };

    let zone = zone.trim_end_matches('.');
    if zone.is_empty() || !is_valid_zone_name(zone) {
        return None;
    }
    Some(zone.to_string())
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod discovery_tests;
