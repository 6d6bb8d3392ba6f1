// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS resolver seam.
//!
//! The query and discovery engines never encode or decode DNS messages; they go
//! through [`DnsResolver`]. Every call names the server to ask and carries its own
//! timeout, so concurrent callers never share timeout state.
//!
//! [`hickory::HickoryResolver`] is the shipped implementation.

pub mod hickory;

use std::net::SocketAddr;
use std::time::Duration;

use crate::dns_errors::{ResolveError, ZoneTransferError};
use crate::records::RecordType;

/// One answer of a direct query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    /// Presentation-format record data
    pub value: String,
    /// TTL in seconds
    pub ttl: u32,
}

/// One record received during a zone transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredRecord {
    /// Fully-qualified owner name, as sent by the server
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Presentation-format record data
    pub value: String,
    /// TTL in seconds
    pub ttl: u32,
}

/// Performs DNS queries and zone transfers.
#[async_trait::async_trait]
pub trait DnsResolver: Send + Sync {
    /// Query `name` for `record_type` at `server`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NxDomain`] when the name does not exist
    /// - [`ResolveError::NoAnswer`] when it exists without records of this type
    /// - [`ResolveError::Timeout`] when no response arrived in time
    /// - [`ResolveError::Failed`] for anything else
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
        timeout: Duration,
    ) -> Result<Vec<Answer>, ResolveError>;

    /// Transfer the whole of `zone` from `server` (AXFR).
    ///
    /// # Errors
    ///
    /// Returns a [`ZoneTransferError`] when the server refuses, the transfer fails,
    /// or the answer is not a well-formed zone.
    async fn transfer(
        &self,
        server: SocketAddr,
        zone: &str,
        timeout: Duration,
    ) -> Result<Vec<TransferredRecord>, ZoneTransferError>;
}
