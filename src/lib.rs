// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # zonekeeper - zone discovery and record mutation for BIND9
//!
//! zonekeeper manages the zones of a BIND9 nameserver that is reachable over SSH
//! and DNS. It discovers which zones the server hosts, lists their records, and
//! adds, updates or deletes records by editing zone files in place.
//!
//! ## Overview
//!
//! - Records are read through DNS: a zone transfer when the server allows it,
//!   otherwise direct queries, subdomain probing and DNS walking
//! - Zones are discovered by scanning the BIND configuration and zone
//!   directories over SSH, with SOA probes and a static list as fallbacks
//! - Mutations back up the zone file, edit it, bump the SOA serial, validate the
//!   result with the zone checker, atomically replace the file and reload
//!
//! ## Modules
//!
//! - [`manager`] - The [`manager::ZoneManager`] facade
//! - [`query`] - Resolver-based record listing
//! - [`discovery`] - Zone discovery
//! - [`mutation`] - Zone-file mutations
//! - [`records`] - Record model, normalization, validation and the zone-file line model
//! - [`remote`] - Remote session traits, shell vocabulary and the OpenSSH adapter
//! - [`resolver`] - Resolver trait and the hickory adapter
//! - [`config`] - Configuration document and credentials
//! - [`dns_errors`] - Error types
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zonekeeper::config::SshConfig;
//! use zonekeeper::manager::ZoneManager;
//!
//! # async fn example() {
//! let manager = ZoneManager::system(Path::new("zones_config.yaml"));
//! manager
//!     .update_ssh_config(SshConfig::new("192.168.1.201", "admin", "secret"))
//!     .await;
//!
//! let result = manager
//!     .add_record("example.com", "www", "A", "192.168.1.10", 3600)
//!     .await;
//! println!("{}", result.message);
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod discovery;
pub mod dns_errors;
pub mod manager;
pub mod metrics;
pub mod mutation;
pub mod query;
pub mod records;
pub mod remote;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;
