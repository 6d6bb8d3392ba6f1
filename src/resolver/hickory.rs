// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! [`DnsResolver`] implementation over `hickory-client`.
//!
//! Queries use UDP, zone transfers use TCP. The client is synchronous, so every
//! call runs on the blocking thread pool. A transfer reads every message of the
//! TCP stream and is only accepted once the closing SOA has arrived.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use hickory_client::client::{Client, SyncClient};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{DNSClass, Name, Record, RecordType as WireType};
use hickory_client::tcp::TcpClientConnection;
use hickory_client::udp::UdpClientConnection;
use tracing::debug;

use super::{Answer, DnsResolver, TransferredRecord};
use crate::dns_errors::{ResolveError, ZoneTransferError};
use crate::records::RecordType;

/// Type code of SPF, which hickory does not name.
const SPF_TYPE_CODE: u16 = 99;

/// Resolver speaking directly to one authoritative server per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct HickoryResolver;

/// Wire type for an engine record type.
#[must_use]
pub fn to_wire_type(record_type: RecordType) -> WireType {
    match record_type {
        RecordType::A => WireType::A,
        RecordType::AAAA => WireType::AAAA,
        RecordType::CNAME => WireType::CNAME,
        RecordType::MX => WireType::MX,
        RecordType::NS => WireType::NS,
        RecordType::PTR => WireType::PTR,
        RecordType::TXT => WireType::TXT,
        RecordType::SRV => WireType::SRV,
        RecordType::SOA => WireType::SOA,
        RecordType::SPF => WireType::Unknown(SPF_TYPE_CODE),
    }
}

/// Engine record type for a wire type, `None` for types the engine ignores.
#[must_use]
pub fn from_wire_type(wire: WireType) -> Option<RecordType> {
    match wire {
        WireType::A => Some(RecordType::A),
        WireType::AAAA => Some(RecordType::AAAA),
        WireType::CNAME => Some(RecordType::CNAME),
        WireType::MX => Some(RecordType::MX),
        WireType::NS => Some(RecordType::NS),
        WireType::PTR => Some(RecordType::PTR),
        WireType::TXT => Some(RecordType::TXT),
        WireType::SRV => Some(RecordType::SRV),
        WireType::SOA => Some(RecordType::SOA),
        WireType::Unknown(SPF_TYPE_CODE) => Some(RecordType::SPF),
        _ => None,
    }
}

/// Absolute form of `name` (exactly one trailing dot).
fn absolute_name(name: &str) -> String {
    format!("{}.", name.trim().trim_end_matches('.'))
}

fn is_timeout(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("timed out") || lower.contains("timeout")
}

fn record_value(record: &Record) -> Option<String> {
    record.data().map(ToString::to_string)
}

#[async_trait::async_trait]
impl DnsResolver for HickoryResolver {
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
        timeout: Duration,
    ) -> Result<Vec<Answer>, ResolveError> {
        let fqdn = absolute_name(name);
        let wire_type = to_wire_type(record_type);
        let failed = {
            let fqdn = fqdn.clone();
            move |reason: String| ResolveError::Failed {
                name: fqdn.clone(),
                record_type: record_type.to_string(),
                reason,
            }
        };

        let query_name = fqdn.clone();
        let task_failed = failed.clone();
        let result = tokio::task::spawn_blocking(move || {
            let name = Name::from_str(&query_name)
                .map_err(|e| task_failed(format!("Invalid name: {e}")))?;
            let conn = UdpClientConnection::with_timeout(server, timeout)
                .map_err(|e| task_failed(format!("Failed to create UDP connection: {e}")))?;
            let client = SyncClient::new(conn);
            client
                .query(&name, DNSClass::IN, wire_type)
                .map_err(|e| {
                    let message = e.to_string();
                    if is_timeout(&message) {
                        ResolveError::Timeout {
                            name: query_name.clone(),
                            record_type: record_type.to_string(),
                        }
                    } else {
                        task_failed(message)
                    }
                })
        })
        .await
        .map_err(|e| failed(format!("DNS query task failed: {e}")))??;

        match result.response_code() {
            ResponseCode::NoError => {}
            ResponseCode::NXDomain => return Err(ResolveError::NxDomain { name: fqdn }),
            code => return Err(failed(format!("Server answered {code:?}"))),
        }

        let answers: Vec<Answer> = result
            .answers()
            .iter()
            .filter(|r| r.record_type() == wire_type)
            .filter_map(|r| {
                record_value(r).map(|value| Answer {
                    value,
                    ttl: r.ttl(),
                })
            })
            .collect();

        if answers.is_empty() {
            return Err(ResolveError::NoAnswer {
                name: fqdn,
                record_type: record_type.to_string(),
            });
        }

        debug!(
            "{} {} answered with {} record(s)",
            fqdn,
            record_type,
            answers.len()
        );
        Ok(answers)
    }

    async fn transfer(
        &self,
        server: SocketAddr,
        zone: &str,
        timeout: Duration,
    ) -> Result<Vec<TransferredRecord>, ZoneTransferError> {
        let origin = absolute_name(zone);
        let zone_label = zone.to_string();
        let server_label = server.to_string();
        let transfer_failed = {
            let zone = zone_label.clone();
            let server = server_label.clone();
            move |reason: String| ZoneTransferError::TransferFailed {
                zone: zone.clone(),
                server: server.clone(),
                reason,
            }
        };
        let refused = ZoneTransferError::TransferRefused {
            zone: zone_label.clone(),
            server: server_label.clone(),
        };

        let task_failed = transfer_failed.clone();
        let answers = tokio::task::spawn_blocking(move || {
            let name = Name::from_str(&origin)
                .map_err(|e| task_failed(format!("Invalid zone name: {e}")))?;
            let conn = TcpClientConnection::with_timeout(server, timeout)
                .map_err(|e| task_failed(format!("Failed to create TCP connection: {e}")))?;
            let client = SyncClient::new(conn);
            let messages = client
                .zone_transfer(&name, None)
                .map_err(|e| task_failed(e.to_string()))?;

            let mut answers = Vec::new();
            for (index, message) in messages.enumerate() {
                let message = message.map_err(|e| task_failed(e.to_string()))?;
                match message.response_code() {
                    ResponseCode::NoError => {}
                    ResponseCode::Refused | ResponseCode::NotAuth => return Err(refused),
                    code => return Err(task_failed(format!("Server answered {code:?}"))),
                }
                debug!(
                    "Transfer message {} carried {} record(s)",
                    index + 1,
                    message.answers().len()
                );
                answers.extend(message.answers().iter().cloned());
            }
            Ok(answers)
        })
        .await
        .map_err(|e| transfer_failed(format!("Zone transfer task failed: {e}")))??;

        if answers.is_empty() {
            return Err(transfer_failed("Empty answer".to_string()));
        }
        let answers = complete_transfer(answers).map_err(|reason| ZoneTransferError::FormatError {
            zone: zone_label.clone(),
            server: server_label.clone(),
            reason,
        })?;

        let records: Vec<TransferredRecord> = answers
            .iter()
            .filter_map(|r| {
                let Some(record_type) = from_wire_type(r.record_type()) else {
                    debug!("Skipping {} record {} from transfer", r.record_type(), r.name());
                    return None;
                };
                record_value(r).map(|value| TransferredRecord {
                    name: r.name().to_string(),
                    record_type,
                    value,
                    ttl: r.ttl(),
                })
            })
            .collect();

        debug!(
            "Zone transfer of {} from {} returned {} record(s)",
            zone_label,
            server_label,
            records.len()
        );
        Ok(records)
    }
}

/// Check that the records of a whole transfer open and close with the SOA, and
/// drop the closing copy.
///
/// # Errors
///
/// Returns the reason when the first record is not an SOA or the transfer ended
/// before the closing SOA arrived.
pub(crate) fn complete_transfer(mut answers: Vec<Record>) -> Result<Vec<Record>, String> {
    match answers.first().map(Record::record_type) {
        Some(WireType::SOA) => {}
        Some(other) => return Err(format!("Transfer starts with {other} instead of SOA")),
        None => return Err("Transfer carried no records".to_string()),
    }
    if answers.len() < 2 || answers.last().map(Record::record_type) != Some(WireType::SOA) {
        return Err("Transfer ended before the closing SOA".to_string());
    }
    answers.pop();
    Ok(answers)
}

#[cfg(test)]
#[path = "hickory_tests.rs"]
mod hickory_tests;
