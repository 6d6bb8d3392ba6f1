// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for zone discovery, record queries and zone-file mutation.
//!
//! This module provides specialized error types for:
//! - Record validation failures (the caller's fault)
//! - Missing zone files and missing records
//! - Remote session (SSH transport) failures
//! - DNS query and zone transfer failures
//! - Remote zone-syntax validation rejecting an edited file
//!
//! Query and discovery paths recover from most of these locally; mutation paths
//! surface them as a failed [`crate::mutation::MutationResult`] whose message names
//! the step that failed.

use thiserror::Error;

/// Record parameters rejected before any remote work happens.
///
/// Only the first failing rule is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The zone argument was empty or blank
    #[error("Zone cannot be empty")]
    EmptyZone,

    /// The zone name is not a syntactically valid domain or reverse zone
    #[error("Invalid zone name '{zone}'")]
    InvalidZoneName {
        /// The rejected zone name
        zone: String,
    },

    /// The record type is not one of the writable types
    #[error("Unsupported record type '{record_type}'. Valid types: A, AAAA, CNAME, MX, NS, PTR, TXT, SRV")]
    UnsupportedType {
        /// The rejected record type
        record_type: String,
    },

    /// The record value was empty or blank
    #[error("Value cannot be empty")]
    EmptyValue,

    /// The TTL is outside the accepted write range
    #[error("TTL must be between 60 and 86400 seconds (got {ttl})")]
    TtlOutOfRange {
        /// The rejected TTL
        ttl: u32,
    },

    /// A record value is not a dotted-quad IPv4 address
    #[error("Invalid IPv4 address '{value}'")]
    InvalidIpv4 {
        /// The rejected value
        value: String,
    },

    /// AAAA record value is not an IPv6 literal
    #[error("Invalid IPv6 address '{value}'")]
    InvalidIpv6 {
        /// The rejected value
        value: String,
    },

    /// MX value is not `<preference> <exchange>`
    #[error("Invalid MX format '{value}'. Use: 'priority server.domain.'")]
    InvalidMx {
        /// The rejected value
        value: String,
    },

    /// CNAME target is not fully qualified
    #[error("CNAME target '{value}' must end with a trailing dot")]
    CnameMissingTrailingDot {
        /// The rejected value
        value: String,
    },
}

/// Errors locating or rewriting a zone file on the remote host.
#[derive(Error, Debug, Clone)]
pub enum ZoneError {
    /// No candidate path for the zone exists on the remote host
    #[error("Zone file for '{zone}' not found on {host}")]
    ZoneFileNotFound {
        /// The zone whose file was searched for
        zone: String,
        /// The remote host that was searched
        host: String,
    },

    /// Backing up the zone file failed; nothing was modified
    #[error("Error creating backup of '{path}' in {backup_dir}: {reason}")]
    BackupFailed {
        /// The zone file that could not be backed up
        path: String,
        /// The backup directory
        backup_dir: String,
        /// Diagnostic text from the remote host
        reason: String,
    },

    /// Reading the zone file failed
    #[error("Error reading zone file '{path}': {reason}")]
    ReadFailed {
        /// The zone file path
        path: String,
        /// Diagnostic text from the remote host
        reason: String,
    },

    /// Writing the temporary file failed; nothing was modified
    #[error("Error writing temporary zone file '{path}': {reason}")]
    WriteFailed {
        /// The temporary path
        path: String,
        /// Diagnostic text from the remote host
        reason: String,
    },

    /// The remote zone checker rejected the edited file; the original is untouched
    #[error("Zone validation error for '{zone}': {diagnostics}")]
    ZoneCheckFailed {
        /// The zone being edited
        zone: String,
        /// Checker output
        diagnostics: String,
    },

    /// Moving the validated file into place failed
    #[error("Error replacing zone file '{path}': {reason}")]
    ReplaceFailed {
        /// The zone file path
        path: String,
        /// Diagnostic text from the remote host
        reason: String,
    },
}

/// Errors matching a record inside a zone file.
#[derive(Error, Debug, Clone)]
pub enum RecordError {
    /// No line matched the (name, type, value) identity after a full scan
    #[error("Record {name} {record_type} {value} not found in zone '{zone}'. Checked: {checked} records.")]
    RecordNotFound {
        /// Zone-relative name searched for
        name: String,
        /// Record type searched for
        record_type: String,
        /// Value searched for
        value: String,
        /// Zone that was searched
        zone: String,
        /// Number of candidate lines of the same type that were compared
        checked: usize,
    },
}

/// Errors from the remote session collaborator.
#[derive(Error, Debug, Clone)]
pub enum SessionError {
    /// No credentials have been supplied
    #[error("SSH configuration required to access zone files")]
    NotConfigured,

    /// The remote host rejected the credentials
    #[error("SSH authentication failed for {username}@{host} (username or password incorrect)")]
    AuthenticationFailed {
        /// Remote host
        host: String,
        /// User that attempted to log in
        username: String,
    },

    /// Nothing listens on the remote port
    #[error("Connection refused by {host}:{port} (check IP address and port)")]
    ConnectionRefused {
        /// Remote host
        host: String,
        /// Remote port
        port: u16,
    },

    /// The connection or a command did not finish in time
    #[error("SSH connection to {host} timed out after {timeout_secs}s")]
    Timeout {
        /// Remote host
        host: String,
        /// Timeout that elapsed
        timeout_secs: u64,
    },

    /// Any other transport failure
    #[error("SSH error talking to {host}: {reason}")]
    Transport {
        /// Remote host
        host: String,
        /// Diagnostic text
        reason: String,
    },
}

/// Errors from individual DNS queries.
///
/// These are recovered per record type by the query engine.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The name does not exist
    #[error("NXDOMAIN for {name}")]
    NxDomain {
        /// Queried name
        name: String,
    },

    /// The name exists but has no data of the requested type
    #[error("No {record_type} answer for {name}")]
    NoAnswer {
        /// Queried name
        name: String,
        /// Queried type
        record_type: String,
    },

    /// The server did not answer in time
    #[error("Timeout querying {record_type} for {name}")]
    Timeout {
        /// Queried name
        name: String,
        /// Queried type
        record_type: String,
    },

    /// Malformed name, refused query, socket failure
    #[error("Query {record_type} for {name} failed: {reason}")]
    Failed {
        /// Queried name
        name: String,
        /// Queried type
        record_type: String,
        /// Diagnostic text
        reason: String,
    },
}

/// Errors related to zone transfer operations (AXFR).
#[derive(Error, Debug, Clone)]
pub enum ZoneTransferError {
    /// Zone transfer not allowed by the server
    #[error("Zone transfer for '{zone}' refused by {server}")]
    TransferRefused {
        /// The zone being transferred
        zone: String,
        /// The server that refused
        server: String,
    },

    /// Zone transfer failed (network, timeout, empty answer)
    #[error("Zone transfer for '{zone}' from {server} failed: {reason}")]
    TransferFailed {
        /// The zone being transferred
        zone: String,
        /// The server queried
        server: String,
        /// Reason for the failure
        reason: String,
    },

    /// The server answered with data that could not be interpreted
    #[error("Format error during zone transfer for '{zone}' from {server}: {reason}")]
    FormatError {
        /// The zone being transferred
        zone: String,
        /// The server queried
        server: String,
        /// Reason for the failure
        reason: String,
    },
}

/// Composite error type that encompasses all engine errors.
#[derive(Error, Debug, Clone)]
pub enum DnsError {
    /// Caller supplied invalid input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Zone file location or rewrite error
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Record matching error
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Remote session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// DNS query error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Zone transfer error
    #[error(transparent)]
    ZoneTransfer(#[from] ZoneTransferError),
}

impl DnsError {
    /// Returns a stable, machine-readable reason code for this error.
    ///
    /// Callers (for example a web layer) use it to pick a status code or an icon
    /// without parsing the human-readable message.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",

            Self::Zone(ZoneError::ZoneFileNotFound { .. }) => "ZoneFileNotFound",
            Self::Zone(ZoneError::BackupFailed { .. }) => "BackupFailed",
            Self::Zone(ZoneError::ReadFailed { .. }) => "ZoneReadFailed",
            Self::Zone(ZoneError::WriteFailed { .. }) => "ZoneWriteFailed",
            Self::Zone(ZoneError::ZoneCheckFailed { .. }) => "ZoneSyntaxError",
            Self::Zone(ZoneError::ReplaceFailed { .. }) => "ZoneReplaceFailed",

            Self::Record(RecordError::RecordNotFound { .. }) => "RecordNotFound",

            Self::Session(SessionError::NotConfigured) => "SessionNotConfigured",
            Self::Session(SessionError::AuthenticationFailed { .. }) => "AuthenticationFailed",
            Self::Session(SessionError::ConnectionRefused { .. }) => "ConnectionRefused",
            Self::Session(SessionError::Timeout { .. }) => "SessionTimeout",
            Self::Session(SessionError::Transport { .. }) => "TransportError",

            Self::Resolve(ResolveError::NxDomain { .. }) => "NxDomain",
            Self::Resolve(ResolveError::NoAnswer { .. }) => "NoAnswer",
            Self::Resolve(ResolveError::Timeout { .. }) => "QueryTimeout",
            Self::Resolve(ResolveError::Failed { .. }) => "QueryFailed",

            Self::ZoneTransfer(ZoneTransferError::TransferRefused { .. }) => "ZoneTransferRefused",
            Self::ZoneTransfer(ZoneTransferError::TransferFailed { .. }) => "ZoneTransferFailed",
            Self::ZoneTransfer(ZoneTransferError::FormatError { .. }) => "ZoneTransferFormatError",
        }
    }

    /// True when the error means the target (zone file or record) does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Zone(ZoneError::ZoneFileNotFound { .. })
                | Self::Record(RecordError::RecordNotFound { .. })
        )
    }
}

#[cfg(test)]
#[path = "dns_errors_tests.rs"]
mod dns_errors_tests;
