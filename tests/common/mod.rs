// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common test utilities for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zonekeeper::config::SshConfig;
use zonekeeper::dns_errors::{ResolveError, SessionError, ZoneTransferError};
use zonekeeper::records::RecordType;
use zonekeeper::remote::{RemoteConnector, RemoteSession};
use zonekeeper::resolver::{Answer, DnsResolver, TransferredRecord};

/// Connector that counts attempts and always fails with the same error.
pub struct RejectingConnector {
    error: SessionError,
    attempts: AtomicUsize,
}

impl RejectingConnector {
    pub fn new(error: SessionError) -> Arc<Self> {
        Arc::new(Self {
            error,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RemoteConnector for RejectingConnector {
    async fn connect(
        &self,
        _config: &SshConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

pub fn auth_failure() -> SessionError {
    SessionError::AuthenticationFailed {
        host: "ns1.example.com".to_string(),
        username: "admin".to_string(),
    }
}

/// Resolver answering from fixed tables; everything else is NXDOMAIN or refused.
#[derive(Default)]
pub struct StaticResolver {
    answers: HashMap<(String, RecordType), Vec<Answer>>,
    transfers: HashMap<String, Vec<TransferredRecord>>,
    queries: Mutex<Vec<(String, RecordType)>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, name: &str, record_type: RecordType, value: &str, ttl: u32) -> Self {
        self.answers
            .entry((name.to_string(), record_type))
            .or_default()
            .push(Answer {
                value: value.to_string(),
                ttl,
            });
        self
    }

    pub fn transfer(mut self, zone: &str, records: &[(&str, RecordType, &str, u32)]) -> Self {
        let records = records
            .iter()
            .map(|(name, record_type, value, ttl)| TransferredRecord {
                name: (*name).to_string(),
                record_type: *record_type,
                value: (*value).to_string(),
                ttl: *ttl,
            })
            .collect();
        self.transfers.insert(zone.to_string(), records);
        self
    }

    pub fn queries(&self) -> Vec<(String, RecordType)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsResolver for StaticResolver {
    async fn query(
        &self,
        _server: SocketAddr,
        name: &str,
        record_type: RecordType,
        _timeout: Duration,
    ) -> Result<Vec<Answer>, ResolveError> {
        self.queries
            .lock()
            .unwrap()
            .push((name.to_string(), record_type));
        self.answers
            .get(&(name.to_string(), record_type))
            .cloned()
            .ok_or_else(|| ResolveError::NxDomain {
                name: name.to_string(),
            })
    }

    async fn transfer(
        &self,
        server: SocketAddr,
        zone: &str,
        _timeout: Duration,
    ) -> Result<Vec<TransferredRecord>, ZoneTransferError> {
        self.transfers
            .get(zone)
            .cloned()
            .ok_or_else(|| ZoneTransferError::TransferRefused {
                zone: zone.to_string(),
                server: server.to_string(),
            })
    }
}
