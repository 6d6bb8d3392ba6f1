// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resolver-based record listing.
//!
//! [`QueryEngine::get_records`] reads a zone's records when no authoritative API
//! is available, trying progressively weaker strategies:
//!
//! 1. A full zone transfer from the configured server. When it succeeds its
//!    (filtered) records are returned as-is.
//! 2. Direct queries on the apex for every type in the filter, with a short
//!    timeout. PTR is only asked for reverse (`.arpa`) zones.
//! 3. For unfiltered listings, probing a list of common subdomain labels.
//! 4. When fewer than three records were found, DNS walking: asking the zone's own
//!    nameservers for apex records and probing numbered host names.
//!
//! Results are deduplicated on (name, type, value) in first-seen order. Partial
//! results are accepted and the call never fails: resolver errors only skip the
//! query that produced them.

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DiscoveryConfig;
use crate::constants::{
    DNS_PORT, DNS_WALKING_MAX_NAMESERVERS, DNS_WALKING_THRESHOLD, ZONE_TRANSFER_TIMEOUT_SECS,
};
use crate::dns_errors::ResolveError;
use crate::metrics;
use crate::records::normalize::to_relative;
use crate::records::{Record, RecordType, TypeFilter};
use crate::resolver::DnsResolver;

/// Subdomain labels probed during discovery, most common first.
pub const COMMON_SUBDOMAINS: &[&str] = &[
    "www", "mail", "ftp", "ns1", "ns2", "ns3", "ns", "dns", "dns1", "dns2", "mx", "mx1", "mx2",
    "smtp", "pop", "pop3", "imap", "webmail", "admin", "cpanel", "whm", "panel", "control", "blog",
    "shop", "store", "api", "app", "mobile", "test", "dev", "staging", "prod", "demo", "vpn",
    "remote", "ssh", "sftp", "cloud", "cdn", "static", "media", "img", "images", "video", "stream",
    "live", "chat", "forum", "wiki", "docs", "help", "support",
];

/// Types asked for each probed subdomain.
const SUBDOMAIN_TYPES: [RecordType; 5] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::MX,
    RecordType::TXT,
];

/// Types asked of each of the zone's own nameservers while walking.
const WALKING_APEX_TYPES: [RecordType; 6] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CNAME,
    RecordType::MX,
    RecordType::TXT,
    RecordType::SRV,
];

/// Host name prefixes probed with numeric suffixes 1-5 while walking.
const WALKING_PATTERNS: [&str; 4] = ["host", "server", "pc", "workstation"];

/// Highest numeric suffix probed for each walking pattern.
const WALKING_PATTERN_MAX: u8 = 5;

/// Summary of a zone, as reported by [`QueryEngine::zone_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneInfo {
    /// Zone name
    pub zone: String,
    /// Whether the zone answered an SOA query
    pub exists: bool,
    /// SOA record data
    pub soa: Option<String>,
    /// Name servers of the zone
    pub ns_records: Vec<String>,
    /// Number of records a full listing returns
    pub record_count: usize,
}

/// Reads zone contents through a [`DnsResolver`].
#[derive(Clone)]
pub struct QueryEngine {
    resolver: Arc<dyn DnsResolver>,
}

impl QueryEngine {
    #[must_use]
    pub fn new(resolver: Arc<dyn DnsResolver>) -> Self {
        Self { resolver }
    }

    /// List the records of `zone` matching `filter`.
    pub async fn get_records(
        &self,
        config: &DiscoveryConfig,
        zone: &str,
        filter: TypeFilter,
    ) -> Vec<Record> {
        let zone = zone.trim().trim_end_matches('.');
        let server = config.dns_server_addr();

        if let Some(records) = self.try_zone_transfer(server, zone, filter).await {
            metrics::record_query_source("transfer");
            return dedupe(records);
        }

        info!("Zone transfer failed for {zone}, using individual queries");
        metrics::record_query_source("fallback");

        let short_timeout = config.record_query_timeout();
        let mut records = self.query_apex(server, zone, filter, short_timeout).await;

        if filter == TypeFilter::All && config.discovery.enable_subdomain_discovery {
            records.extend(
                self.discover_subdomains(
                    server,
                    zone,
                    config.discovery.max_subdomains,
                    config.dns_timeout(),
                )
                .await,
            );
        }

        if records.len() < DNS_WALKING_THRESHOLD && config.discovery.enable_dns_walking {
            info!(
                "Few records found ({}), trying DNS walking for {zone}",
                records.len()
            );
            records.extend(self.dns_walking(server, zone, short_timeout).await);
        }

        let unique = dedupe(records);
        info!("Total unique records found for {zone}: {}", unique.len());
        unique
    }

    /// Step 1: AXFR. `None` when the transfer failed or yielded nothing.
    async fn try_zone_transfer(
        &self,
        server: SocketAddr,
        zone: &str,
        filter: TypeFilter,
    ) -> Option<Vec<Record>> {
        info!("Attempting zone transfer for {zone} from {server}");
        let transferred = match self
            .resolver
            .transfer(
                server,
                zone,
                Duration::from_secs(ZONE_TRANSFER_TIMEOUT_SECS),
            )
            .await
        {
            Ok(transferred) => transferred,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        };

        let records: Vec<Record> = transferred
            .into_iter()
            .filter(|r| filter.includes(r.record_type.as_str()))
            .map(|r| Record {
                name: to_relative(&r.name, zone),
                record_type: r.record_type,
                value: r.value,
                ttl: Some(r.ttl),
            })
            .collect();

        if records.is_empty() {
            return None;
        }
        info!("Zone transfer successful: {} records found", records.len());
        Some(records)
    }

    /// Query `fqdn` for `record_type`, mapping answers to zone-relative records.
    ///
    /// Every resolver error skips the query.
    async fn lookup(
        &self,
        server: SocketAddr,
        fqdn: &str,
        zone: &str,
        record_type: RecordType,
        timeout: Duration,
    ) -> Vec<Record> {
        match self.resolver.query(server, fqdn, record_type, timeout).await {
            Ok(answers) => answers
                .into_iter()
                .map(|answer| Record {
                    name: to_relative(fqdn, zone),
                    record_type,
                    value: answer.value,
                    ttl: Some(answer.ttl),
                })
                .collect(),
            Err(ResolveError::Timeout { .. }) => {
                debug!("Timeout for {record_type} in {fqdn}");
                Vec::new()
            }
            Err(e) => {
                debug!("{e}");
                Vec::new()
            }
        }
    }

    /// Step 2: direct queries on the apex.
    async fn query_apex(
        &self,
        server: SocketAddr,
        zone: &str,
        filter: TypeFilter,
        timeout: Duration,
    ) -> Vec<Record> {
        let is_reverse = zone.ends_with(".arpa");
        let mut records = Vec::new();
        for record_type in filter.record_types() {
            if record_type == RecordType::PTR && !is_reverse {
                continue;
            }
            debug!("Query {record_type} for {zone}");
            records.extend(self.lookup(server, zone, zone, record_type, timeout).await);
        }
        records
    }

    /// Step 3: probe common subdomain labels.
    async fn discover_subdomains(
        &self,
        server: SocketAddr,
        zone: &str,
        max_subdomains: usize,
        timeout: Duration,
    ) -> Vec<Record> {
        let labels = &COMMON_SUBDOMAINS[..max_subdomains.min(COMMON_SUBDOMAINS.len())];
        let mut records = Vec::new();
        for label in labels {
            let fqdn = format!("{label}.{zone}");
            for record_type in SUBDOMAIN_TYPES {
                records.extend(self.lookup(server, &fqdn, zone, record_type, timeout).await);
            }
        }
        info!(
            "Subdomain discovery: {} records found (tested: {}/{})",
            records.len(),
            labels.len(),
            COMMON_SUBDOMAINS.len()
        );
        records
    }

    /// Step 4: interrogate the zone's nameservers and probe numbered hosts.
    async fn dns_walking(&self, server: SocketAddr, zone: &str, timeout: Duration) -> Vec<Record> {
        let mut records = Vec::new();

        let nameservers: Vec<String> = match self
            .resolver
            .query(server, zone, RecordType::NS, timeout)
            .await
        {
            Ok(answers) => answers.into_iter().map(|a| a.value).collect(),
            Err(e) => {
                debug!("No NS records for {zone}: {e}");
                Vec::new()
            }
        };
        if !nameservers.is_empty() {
            info!("NS servers found for {zone}: {nameservers:?}");
        }

        for nameserver in nameservers.iter().take(DNS_WALKING_MAX_NAMESERVERS) {
            let Some(ns_addr) = self.resolve_nameserver(server, nameserver, timeout).await else {
                continue;
            };
            info!("Interrogating NS server {nameserver} ({})", ns_addr.ip());
            for record_type in WALKING_APEX_TYPES {
                records.extend(self.lookup(ns_addr, zone, zone, record_type, timeout).await);
            }
        }

        for pattern in WALKING_PATTERNS {
            for i in 1..=WALKING_PATTERN_MAX {
                let fqdn = format!("{pattern}{i}.{zone}");
                records.extend(
                    self.lookup(server, &fqdn, zone, RecordType::A, timeout)
                        .await,
                );
            }
        }

        info!("DNS walking: {} additional records found", records.len());
        records
    }

    async fn resolve_nameserver(
        &self,
        server: SocketAddr,
        nameserver: &str,
        timeout: Duration,
    ) -> Option<SocketAddr> {
        let answers = match self
            .resolver
            .query(server, nameserver, RecordType::A, timeout)
            .await
        {
            Ok(answers) => answers,
            Err(e) => {
                debug!("Error with NS server {nameserver}: {e}");
                return None;
            }
        };
        let first = answers.first()?;
        match first.value.parse::<IpAddr>() {
            Ok(ip) => Some(SocketAddr::new(ip, DNS_PORT)),
            Err(e) => {
                debug!("NS server {nameserver} has unusable address '{}': {e}", first.value);
                None
            }
        }
    }

    /// True when `zone` answers an SOA query at `server` within `timeout`.
    pub async fn probe_soa(&self, server: SocketAddr, zone: &str, timeout: Duration) -> bool {
        match self.resolver.query(server, zone, RecordType::SOA, timeout).await {
            Ok(_) => true,
            Err(e) => {
                debug!("SOA probe for {zone} failed: {e}");
                false
            }
        }
    }

    /// True when `zone` exists on the configured server.
    pub async fn validate_zone(&self, config: &DiscoveryConfig, zone: &str) -> bool {
        self.probe_soa(config.dns_server_addr(), zone, config.dns_timeout())
            .await
    }

    /// SOA, name servers and record count of `zone`.
    ///
    /// A zone without an SOA answer is reported with `exists: false` and nothing
    /// else filled in.
    pub async fn zone_info(&self, config: &DiscoveryConfig, zone: &str) -> ZoneInfo {
        let server = config.dns_server_addr();
        let timeout = config.dns_timeout();
        let mut info = ZoneInfo {
            zone: zone.to_string(),
            exists: false,
            soa: None,
            ns_records: Vec::new(),
            record_count: 0,
        };

        let soa = match self.resolver.query(server, zone, RecordType::SOA, timeout).await {
            Ok(answers) => answers.into_iter().next(),
            Err(e) => {
                warn!("Error retrieving zone info for {zone}: {e}");
                return info;
            }
        };
        info.exists = true;
        info.soa = soa.map(|a| a.value);

        match self.resolver.query(server, zone, RecordType::NS, timeout).await {
            Ok(answers) => info.ns_records = answers.into_iter().map(|a| a.value).collect(),
            Err(e) => debug!("No NS records for {zone}: {e}"),
        }

        info.record_count = self.get_records(config, zone, TypeFilter::All).await.len();
        info
    }
}

/// Drop repeated (name, type, value) triples, keeping the first occurrence.
#[must_use]
pub fn dedupe(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let (name, record_type, value) = r.identity();
            seen.insert((name.to_string(), record_type, value.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod query_tests;
