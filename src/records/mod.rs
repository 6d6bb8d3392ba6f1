// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Record model shared by the query, discovery and mutation engines.
//!
//! - [`normalize`] converts between fully-qualified and zone-relative names and
//!   formats/parses single zone-file record lines
//! - [`validation`] checks zone names and record parameters before any remote work
//! - [`zonefile`] is the line model the mutation engine edits

pub mod normalize;
pub mod validation;
pub mod zonefile;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS record types known to the engine.
///
/// `SOA` and `SPF` are read-only: they are returned by queries but never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
    /// Canonical name
    #[allow(clippy::upper_case_acronyms)]
    CNAME,
    /// Mail exchange
    MX,
    /// Name server
    NS,
    /// Pointer (reverse resolution)
    #[allow(clippy::upper_case_acronyms)]
    PTR,
    /// Free text
    #[allow(clippy::upper_case_acronyms)]
    TXT,
    /// Service locator
    #[allow(clippy::upper_case_acronyms)]
    SRV,
    /// Start of authority
    #[allow(clippy::upper_case_acronyms)]
    SOA,
    /// Sender policy framework
    #[allow(clippy::upper_case_acronyms)]
    SPF,
}

impl RecordType {
    /// Every type the engine understands, in display order.
    pub const ALL: [RecordType; 10] = [
        Self::A,
        Self::AAAA,
        Self::CNAME,
        Self::MX,
        Self::NS,
        Self::PTR,
        Self::SOA,
        Self::TXT,
        Self::SPF,
        Self::SRV,
    ];

    /// Types accepted by add/update.
    pub const WRITABLE: [RecordType; 8] = [
        Self::A,
        Self::AAAA,
        Self::CNAME,
        Self::MX,
        Self::NS,
        Self::PTR,
        Self::TXT,
        Self::SRV,
    ];

    /// Zone-file mnemonic for this type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::MX => "MX",
            Self::NS => "NS",
            Self::PTR => "PTR",
            Self::TXT => "TXT",
            Self::SRV => "SRV",
            Self::SOA => "SOA",
            Self::SPF => "SPF",
        }
    }

    /// True for the types add/update may write.
    #[must_use]
    pub fn is_writable(self) -> bool {
        Self::WRITABLE.contains(&self)
    }

    /// Human-readable description shown next to the type.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::A => "IPv4 address",
            Self::AAAA => "IPv6 address",
            Self::CNAME => "Canonical name (alias)",
            Self::MX => "Mail exchange",
            Self::NS => "Name server",
            Self::PTR => "Pointer (reverse resolution)",
            Self::TXT => "Free text",
            Self::SRV => "Service",
            Self::SOA => "Start of authority",
            Self::SPF => "Sender policy framework",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| format!("Unknown record type '{s}'"))
    }
}

/// A resource record in its zone-relative view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Zone-relative owner name, `@` for the apex
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Type-specific textual value
    pub value: String,
    /// TTL in seconds, when known
    pub ttl: Option<u32>,
}

impl Record {
    /// Build a record with a known TTL.
    #[must_use]
    pub fn new(name: &str, record_type: RecordType, value: &str, ttl: u32) -> Self {
        Self {
            name: name.to_string(),
            record_type,
            value: value.to_string(),
            ttl: Some(ttl),
        }
    }

    /// Identity used for deduplication; TTL is not part of it.
    #[must_use]
    pub fn identity(&self) -> (&str, RecordType, &str) {
        (&self.name, self.record_type, &self.value)
    }
}

/// Which records a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    /// Every type
    #[default]
    All,
    /// A, AAAA, CNAME
    Direct,
    /// PTR
    Inverse,
    /// MX, NS, SOA, TXT, SPF, SRV
    Special,
    /// One explicit type
    Only(RecordType),
}

impl TypeFilter {
    /// Types queried individually when a zone transfer is refused.
    #[must_use]
    pub fn record_types(self) -> Vec<RecordType> {
        use RecordType::{A, AAAA, CNAME, MX, NS, PTR, SOA, SPF, SRV, TXT};
        match self {
            Self::All => RecordType::ALL.to_vec(),
            Self::Direct => vec![A, AAAA, CNAME],
            Self::Inverse => vec![PTR],
            Self::Special => vec![MX, NS, SOA, TXT, SPF, SRV],
            Self::Only(t) => vec![t],
        }
    }

    /// True if a record of type `mnemonic` belongs in this listing.
    #[must_use]
    pub fn includes(self, mnemonic: &str) -> bool {
        match self {
            Self::All => true,
            _ => self
                .record_types()
                .iter()
                .any(|t| t.as_str().eq_ignore_ascii_case(mnemonic)),
        }
    }
}

impl FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "direct" => Ok(Self::Direct),
            "inverse" => Ok(Self::Inverse),
            "special" => Ok(Self::Special),
            other => other.parse::<RecordType>().map(Self::Only),
        }
    }
}

/// Entry of the static supported-type table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordTypeInfo {
    /// Type mnemonic
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Human-readable description
    pub description: &'static str,
}

/// The writable record types with their descriptions.
#[must_use]
pub fn supported_record_types() -> Vec<RecordTypeInfo> {
    RecordType::WRITABLE
        .iter()
        .map(|&record_type| RecordTypeInfo {
            record_type,
            description: record_type.description(),
        })
        .collect()
}
