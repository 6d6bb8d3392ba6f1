// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Name and record-line normalization.
//!
//! Pure conversions between fully-qualified and zone-relative names, and the
//! single-line record format the mutation engine writes. No I/O.

use crate::constants::{ZONE_LINE_NAME_WIDTH, ZONE_LINE_TTL_WIDTH, ZONE_LINE_TYPE_WIDTH};

use super::RecordType;

/// Fields recovered from a zone-file record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// First token of the line
    pub name: String,
    /// Token following `IN`, as written
    pub record_type: String,
    /// Remaining tokens joined by single spaces
    pub value: String,
}

fn strip_dot(s: &str) -> &str {
    s.strip_suffix('.').unwrap_or(s)
}

/// Convert an owner name returned by a query into its zone-relative form.
///
/// The apex becomes `@`; names outside the zone are returned unchanged (without
/// their trailing dot).
#[must_use]
pub fn to_relative(full_name: &str, zone: &str) -> String {
    if full_name.is_empty() || zone.is_empty() {
        return full_name.to_string();
    }
    let name = strip_dot(full_name.trim());
    let zone = strip_dot(zone.trim());

    if name == zone {
        return "@".to_string();
    }
    match name.strip_suffix(zone).and_then(|s| s.strip_suffix('.')) {
        Some("") => "@".to_string(),
        Some(relative) => relative.to_string(),
        None => name.to_string(),
    }
}

/// Normalize a caller-supplied name before it is written to a zone file.
///
/// Blank input stays blank (the line formatter turns it into `@`), `@` passes
/// through, and a name already qualified with the zone is collapsed.
#[must_use]
pub fn to_engine_relative(name: &str, zone: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        return String::new();
    }
    if name == "@" {
        return name.to_string();
    }
    let name = strip_dot(name);
    let zone = strip_dot(zone.trim());

    if name == zone {
        return "@".to_string();
    }
    match name.strip_suffix(zone).and_then(|s| s.strip_suffix('.')) {
        Some("") => "@".to_string(),
        Some(relative) => relative.to_string(),
        None => name.to_string(),
    }
}

/// Normalized form used when matching names: blank means the apex.
fn search_form(name: &str, zone: &str) -> String {
    let relative = to_engine_relative(name, zone);
    if relative.is_empty() {
        "@".to_string()
    } else {
        relative
    }
}

/// Format a record as a zone-file line.
///
/// `name(30) ttl(8) IN type(8) value`, left-aligned, blank name written as `@`.
#[must_use]
pub fn format_line(name: &str, record_type: RecordType, value: &str, ttl: u32) -> String {
    let name = match name.trim() {
        "" => "@",
        trimmed => trimmed,
    };
    format!(
        "{name:<nw$} {ttl:<tw$} IN {rtype:<yw$} {value}",
        rtype = record_type.as_str(),
        nw = ZONE_LINE_NAME_WIDTH,
        tw = ZONE_LINE_TTL_WIDTH,
        yw = ZONE_LINE_TYPE_WIDTH,
    )
}

/// Parse a zone-file line of the form `name [ttl] IN type value...`.
///
/// Returns `None` for lines with fewer than four tokens or without an `IN` class
/// token.
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }
    let in_index = parts.iter().position(|p| p.eq_ignore_ascii_case("IN"))?;

    Some(ParsedLine {
        name: parts[0].to_string(),
        record_type: parts.get(in_index + 1).copied().unwrap_or_default().to_string(),
        value: parts.get(in_index + 2..).unwrap_or_default().join(" "),
    })
}

/// Compare two record values of the given type.
///
/// Trailing dots and surrounding whitespace are ignored. MX values compare only
/// the exchange, so a preference change still matches.
#[must_use]
pub fn values_match(a: &str, b: &str, record_type: &str) -> bool {
    let a = a.trim().trim_end_matches('.');
    let b = b.trim().trim_end_matches('.');

    if record_type.eq_ignore_ascii_case("MX") {
        let a_parts: Vec<&str> = a.split_whitespace().collect();
        let b_parts: Vec<&str> = b.split_whitespace().collect();
        if a_parts.len() >= 2 && b_parts.len() >= 2 {
            return a_parts[1].trim_end_matches('.') == b_parts[1].trim_end_matches('.');
        }
    }
    a == b
}

/// Compare two owner names after normalizing both against `zone`.
#[must_use]
pub fn names_match(a: &str, b: &str, zone: &str) -> bool {
    search_form(a, zone) == search_form(b, zone)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod normalize_tests;
