// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Structural validation of zone names and record parameters.
//!
//! Every check here is pure. [`validate_record`] runs before a mutation opens a
//! remote session, so invalid input never touches the server.

use std::net::Ipv6Addr;

use crate::constants::{
    IPV4_REVERSE_SUFFIX, IPV6_REVERSE_SUFFIX, MAX_RECORD_TTL_SECS, MIN_RECORD_TTL_SECS,
};
use crate::dns_errors::ValidationError;

use super::RecordType;

const MAX_LABEL_LEN: usize = 63;

fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !label.starts_with('-')
        && !label.ends_with('-')
}

/// Check that `zone` is a syntactically valid zone name.
///
/// One trailing dot is allowed. Reverse zones (`*.in-addr.arpa`, `*.ip6.arpa`) are
/// always accepted; otherwise every label must be 1-63 alphanumerics with internal
/// hyphens only. Single-label names such as `localhost` are valid.
#[must_use]
pub fn is_valid_zone_name(zone: &str) -> bool {
    let zone = zone.trim();
    let zone = zone.strip_suffix('.').unwrap_or(zone);
    if zone.is_empty() {
        return false;
    }

    if zone.ends_with(&format!(".{IPV4_REVERSE_SUFFIX}"))
        || zone.ends_with(&format!(".{IPV6_REVERSE_SUFFIX}"))
    {
        return true;
    }

    zone.split('.').all(is_valid_label)
}

/// Case-insensitive membership test against the configured system zones.
#[must_use]
pub fn is_system_zone(zone: &str, system_zones: &[String]) -> bool {
    system_zones.iter().any(|z| z.eq_ignore_ascii_case(zone))
}

/// True for zones under `in-addr.arpa` or `ip6.arpa`.
#[must_use]
pub fn is_reverse_zone(zone: &str) -> bool {
    let zone = zone.trim().trim_end_matches('.').to_ascii_lowercase();
    zone.ends_with(IPV4_REVERSE_SUFFIX) || zone.ends_with(IPV6_REVERSE_SUFFIX)
}

/// Strict dotted-quad check: exactly four decimal octets, each 0-255.
///
/// Only ASCII digits are accepted, so signs, whitespace and empty octets fail.
#[must_use]
pub fn is_valid_ipv4(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.len() <= 3
                && octet.bytes().all(|b| b.is_ascii_digit())
                && octet.parse::<u16>().is_ok_and(|n| n <= 255)
        })
}

/// IPv6 literal check.
#[must_use]
pub fn is_valid_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

/// Validate the parameters of a record about to be written.
///
/// Rules are applied in order and the first failure is returned:
/// zone non-empty, type writable, value non-empty, TTL within 60-86400, then the
/// type-specific value checks (A, AAAA, MX, CNAME).
///
/// # Errors
///
/// Returns the [`ValidationError`] describing the first rule that failed.
pub fn validate_record(
    zone: &str,
    _name: &str,
    record_type: &str,
    value: &str,
    ttl: u32,
) -> Result<RecordType, ValidationError> {
    if zone.trim().is_empty() {
        return Err(ValidationError::EmptyZone);
    }

    let rtype = record_type
        .parse::<RecordType>()
        .ok()
        .filter(|t| t.is_writable())
        .ok_or_else(|| ValidationError::UnsupportedType {
            record_type: record_type.to_string(),
        })?;

    if value.trim().is_empty() {
        return Err(ValidationError::EmptyValue);
    }

    if !(MIN_RECORD_TTL_SECS..=MAX_RECORD_TTL_SECS).contains(&ttl) {
        return Err(ValidationError::TtlOutOfRange { ttl });
    }

    match rtype {
        RecordType::A if !is_valid_ipv4(value) => Err(ValidationError::InvalidIpv4 {
            value: value.to_string(),
        }),
        RecordType::AAAA if !is_valid_ipv6(value) => Err(ValidationError::InvalidIpv6 {
            value: value.to_string(),
        }),
        RecordType::MX if !is_valid_mx(value) => Err(ValidationError::InvalidMx {
            value: value.to_string(),
        }),
        RecordType::CNAME if !value.ends_with('.') => {
            Err(ValidationError::CnameMissingTrailingDot {
                value: value.to_string(),
            })
        }
        _ => Ok(rtype),
    }
}

fn is_valid_mx(value: &str) -> bool {
    let parts: Vec<&str> = value.split_whitespace().collect();
    parts.len() == 2 && parts[0].bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
#[path = "validation_tests.rs"]
mod validation_tests;
