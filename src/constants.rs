// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for zonekeeper.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Protocol Constants
// ============================================================================

/// Standard DNS port for queries and zone transfers
pub const DNS_PORT: u16 = 53;

/// Default authoritative server queried when the configuration names none
pub const DEFAULT_DNS_SERVER: &str = "127.0.0.1";

/// Default discovery DNS timeout in seconds
pub const DEFAULT_DNS_TIMEOUT_SECS: u64 = 5;

/// Upper bound for per-type record queries issued after a refused transfer
pub const RECORD_QUERY_TIMEOUT_MILLIS: u64 = 500;

/// Timeout for a full zone transfer (AXFR over TCP)
pub const ZONE_TRANSFER_TIMEOUT_SECS: u64 = 10;

/// Default cap on the number of subdomain labels probed during discovery
pub const DEFAULT_MAX_SUBDOMAINS: usize = 50;

/// Below this many records the query engine falls back to DNS walking
pub const DNS_WALKING_THRESHOLD: usize = 3;

/// Maximum number of nameservers interrogated while walking
pub const DNS_WALKING_MAX_NAMESERVERS: usize = 2;

// ============================================================================
// Record Constants
// ============================================================================

/// Minimum TTL accepted on write
pub const MIN_RECORD_TTL_SECS: u32 = 60;

/// Maximum TTL accepted on write
pub const MAX_RECORD_TTL_SECS: u32 = 86_400;

/// Default TTL for records created without an explicit TTL (1 hour)
pub const DEFAULT_RECORD_TTL_SECS: u32 = 3600;

/// Column width of the owner name in generated zone-file lines
pub const ZONE_LINE_NAME_WIDTH: usize = 30;

/// Column width of the TTL in generated zone-file lines
pub const ZONE_LINE_TTL_WIDTH: usize = 8;

/// Column width of the record type in generated zone-file lines
pub const ZONE_LINE_TYPE_WIDTH: usize = 8;

// ============================================================================
// Remote Session Constants
// ============================================================================

/// Standard SSH port
pub const SSH_PORT: u16 = 22;

/// Connection timeout for remote sessions
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Root of the conventional zone-file layout
pub const ZONE_ROOT_DIR: &str = "/etc/bind/zone";

/// Directory holding forward zone files
pub const ZONE_DIRECT_DIR: &str = "/etc/bind/zone/direct";

/// Directory holding reverse zone files
pub const ZONE_REVERSE_DIR: &str = "/etc/bind/zone/reverse";

/// Default directory receiving zone-file backups before each mutation
pub const DEFAULT_BACKUP_DIR: &str = "/etc/bind/backup";

/// Default zone syntax checker; `{zone}` and `{file}` are substituted
pub const DEFAULT_CHECK_ZONE_COMMAND: &str = "named-checkzone {zone} {file}";

/// Default reload command; `{zone}` is substituted when present
pub const DEFAULT_RELOAD_COMMAND: &str = "rndc reload";

/// Candidate BIND configuration files scanned for zone declarations
pub const BIND_CONFIG_FILES: &[&str] = &[
    "/etc/bind/named.conf.local",
    "/etc/bind/named.conf",
    "/etc/named.conf",
    "/var/named/named.conf",
    "/usr/local/etc/named.conf",
];

/// Timestamp layout used in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default location of the zones configuration document
pub const DEFAULT_CONFIG_FILE: &str = "zones_config.yaml";

/// Reverse-lookup suffix for IPv4 zones
pub const IPV4_REVERSE_SUFFIX: &str = "in-addr.arpa";

/// Reverse-lookup suffix for IPv6 zones
pub const IPV6_REVERSE_SUFFIX: &str = "ip6.arpa";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
