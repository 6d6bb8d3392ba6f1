// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone-file mutation engine.
//!
//! Add, update and delete all run the same sequence over one remote session:
//!
//! 1. Locate the zone file among the conventional candidate paths
//! 2. Back it up (a failed backup aborts before anything is written)
//! 3. Read it and apply the line-level edit
//! 4. Increment the SOA serial
//! 5. Write the result to a temporary file next to the zone file
//! 6. Run the zone checker against the temporary file
//! 7. Move the temporary file over the zone file
//! 8. Reload the nameserver
//!
//! A checker rejection removes the temporary file and leaves the zone file
//! untouched. A failed reload still reports success, with a warning, because the
//! edit is already durable.
//!
//! Mutations of the same zone are serialized by a per-zone async mutex held for
//! the whole sequence. A zone's mutex is forgotten once no mutation holds or
//! awaits it, so the table only holds zones with mutations in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{DiscoveryConfig, SshConfig};
use crate::constants::{
    BACKUP_TIMESTAMP_FORMAT, DEFAULT_RECORD_TTL_SECS, SSH_CONNECT_TIMEOUT_SECS, ZONE_DIRECT_DIR,
    ZONE_REVERSE_DIR, ZONE_ROOT_DIR,
};
use crate::dns_errors::{DnsError, RecordError, SessionError, ValidationError, ZoneError};
use crate::metrics;
use crate::records::normalize::{format_line, to_engine_relative};
use crate::records::validation::{is_reverse_zone, is_valid_zone_name, validate_record};
use crate::records::zonefile::{RecordMatcher, ZoneFile};
use crate::records::{Record, RecordType};
use crate::remote::{commands, RemoteConnector, RemoteSession};

/// Outcome of a mutation, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResult {
    /// Whether the edit was committed
    pub success: bool,
    /// Human-readable outcome, naming the failing step on failure
    pub message: String,
    /// The record as written, for add and update
    pub record: Option<Record>,
}

impl MutationResult {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            record: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Update,
    Delete,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Add => "added",
            Self::Update => "modified",
            Self::Delete => "deleted",
        }
    }
}

/// The line-level change applied to the zone file.
enum Edit<'a> {
    Insert(String),
    Replace(RecordMatcher<'a>, String),
    Remove(RecordMatcher<'a>),
}

/// Applies record mutations to zone files on the remote host.
pub struct MutationEngine {
    connector: Arc<dyn RemoteConnector>,
    zone_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MutationEngine {
    #[must_use]
    pub fn new(connector: Arc<dyn RemoteConnector>) -> Self {
        Self {
            connector,
            zone_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn zone_lock(&self, zone: &str) -> Arc<Mutex<()>> {
        self.zone_locks
            .lock()
            .await
            .entry(zone.to_ascii_lowercase())
            .or_default()
            .clone()
    }

    /// Drop the zone's entry once no other mutation holds or awaits it.
    async fn release_zone_lock(&self, zone: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.zone_locks.lock().await;
        drop(lock);
        let key = zone.to_ascii_lowercase();
        if locks.get(&key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&key);
        }
    }

    /// Add a record to `zone`.
    #[allow(clippy::too_many_arguments)]
    pub async fn add_record(
        &self,
        config: &DiscoveryConfig,
        ssh: &SshConfig,
        zone: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> MutationResult {
        let started = Instant::now();
        let zone = canonical_zone(zone);
        let record_type = match validate_write(zone, name, record_type, value, ttl) {
            Ok(record_type) => record_type,
            Err(e) => return finish(Operation::Add, started, Err(e.into()), None),
        };

        let clean_name = to_engine_relative(name, zone);
        let line = format_line(&clean_name, record_type, value, ttl);
        let record = Record::new(display_name(&clean_name), record_type, value, ttl);
        info!("Adding {record_type} record '{}' to zone {zone}", record.name);

        let outcome = self
            .mutate(Operation::Add, config, ssh, zone, Edit::Insert(line))
            .await;
        finish(Operation::Add, started, outcome, Some(record))
    }

    /// Replace the first record matching `original` with `updated`.
    ///
    /// The TTL of `original` is ignored; a missing TTL on `updated` takes the
    /// default.
    pub async fn update_record(
        &self,
        config: &DiscoveryConfig,
        ssh: &SshConfig,
        zone: &str,
        original: &Record,
        updated: &Record,
    ) -> MutationResult {
        let started = Instant::now();
        let zone = canonical_zone(zone);
        let ttl = updated.ttl.unwrap_or(DEFAULT_RECORD_TTL_SECS);
        let record_type = match validate_write(
            zone,
            &updated.name,
            updated.record_type.as_str(),
            &updated.value,
            ttl,
        ) {
            Ok(record_type) => record_type,
            Err(e) => return finish(Operation::Update, started, Err(e.into()), None),
        };

        let clean_name = to_engine_relative(&updated.name, zone);
        let line = format_line(&clean_name, record_type, &updated.value, ttl);
        let record = Record::new(display_name(&clean_name), record_type, &updated.value, ttl);
        info!(
            "Updating {} record '{}' in zone {zone}",
            original.record_type, original.name
        );

        let matcher = RecordMatcher {
            zone,
            name: &original.name,
            record_type: original.record_type,
            value: &original.value,
        };
        let outcome = self
            .mutate(
                Operation::Update,
                config,
                ssh,
                zone,
                Edit::Replace(matcher, line),
            )
            .await;
        finish(Operation::Update, started, outcome, Some(record))
    }

    /// Delete the first record matching (`name`, `record_type`, `value`).
    pub async fn delete_record(
        &self,
        config: &DiscoveryConfig,
        ssh: &SshConfig,
        zone: &str,
        name: &str,
        record_type: &str,
        value: &str,
    ) -> MutationResult {
        let started = Instant::now();
        let zone = canonical_zone(zone);
        let record_type = match validate_delete(zone, record_type, value) {
            Ok(record_type) => record_type,
            Err(e) => return finish(Operation::Delete, started, Err(e.into()), None),
        };
        info!("Deleting {record_type} record '{name}' from zone {zone}");

        let matcher = RecordMatcher {
            zone,
            name,
            record_type,
            value,
        };
        let outcome = self
            .mutate(Operation::Delete, config, ssh, zone, Edit::Remove(matcher))
            .await;
        finish(Operation::Delete, started, outcome, None)
    }

    /// Run the locked sequence over a fresh session; the session is always closed.
    ///
    /// Returns the reload diagnostics when the edit was committed but the reload
    /// failed.
    async fn mutate(
        &self,
        operation: Operation,
        config: &DiscoveryConfig,
        ssh: &SshConfig,
        zone: &str,
        edit: Edit<'_>,
    ) -> Result<Option<String>, DnsError> {
        if !ssh.is_configured() {
            return Err(SessionError::NotConfigured.into());
        }

        let lock = self.zone_lock(zone).await;
        let outcome = {
            let _guard = lock.lock().await;
            match self
                .connector
                .connect(ssh, Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS))
                .await
            {
                Ok(mut session) => {
                    let outcome =
                        apply(session.as_mut(), operation, config, ssh, zone, edit).await;
                    session.close().await;
                    outcome
                }
                Err(e) => Err(e.into()),
            }
        };
        self.release_zone_lock(zone, lock).await;
        outcome
    }
}

/// `zone` without surrounding whitespace and its trailing dot.
fn canonical_zone(zone: &str) -> &str {
    let zone = zone.trim();
    zone.strip_suffix('.').unwrap_or(zone)
}

/// Write-side validation plus a zone-name check, since the zone ends up in paths.
fn validate_write(
    zone: &str,
    name: &str,
    record_type: &str,
    value: &str,
    ttl: u32,
) -> Result<RecordType, ValidationError> {
    let record_type = validate_record(zone, name, record_type, value, ttl)?;
    check_zone_name(zone)?;
    Ok(record_type)
}

fn validate_delete(zone: &str, record_type: &str, value: &str) -> Result<RecordType, ValidationError> {
    if zone.trim().is_empty() {
        return Err(ValidationError::EmptyZone);
    }
    check_zone_name(zone)?;
    let record_type = record_type
        .parse::<RecordType>()
        .map_err(|_| ValidationError::UnsupportedType {
            record_type: record_type.to_string(),
        })?;
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyValue);
    }
    Ok(record_type)
}

fn check_zone_name(zone: &str) -> Result<(), ValidationError> {
    if is_valid_zone_name(zone) {
        Ok(())
    } else {
        Err(ValidationError::InvalidZoneName {
            zone: zone.to_string(),
        })
    }
}

fn display_name(clean_name: &str) -> &str {
    if clean_name.is_empty() {
        "@"
    } else {
        clean_name
    }
}

/// Turn an outcome into a [`MutationResult`] and record metrics.
///
/// `Ok(Some(diagnostics))` is a committed edit whose reload failed.
fn finish(
    operation: Operation,
    started: Instant,
    outcome: Result<Option<String>, DnsError>,
    record: Option<Record>,
) -> MutationResult {
    let elapsed = started.elapsed();
    let past = operation.past_tense();
    match outcome {
        Ok(reload_failure) => {
            let (label, message) = match reload_failure {
                None => (
                    "success",
                    format!("Record {past} successfully and DNS server reloaded"),
                ),
                Some(diagnostics) => (
                    "reload_failed",
                    format!("Record {past} but DNS reload failed: {diagnostics}"),
                ),
            };
            metrics::record_mutation(operation.as_str(), label, elapsed);
            info!("{message}");
            MutationResult {
                success: true,
                message,
                record,
            }
        }
        Err(e) => {
            let label = if e.is_not_found() { "not_found" } else { "failure" };
            metrics::record_mutation(operation.as_str(), label, elapsed);
            metrics::record_error(e.status_reason());
            if matches!(e, DnsError::Validation(_)) || e.is_not_found() {
                warn!("Rejected {} request: {e}", operation.as_str());
            } else {
                error!("Failed to {} record: {e}", operation.as_str());
            }
            MutationResult::failure(e.to_string())
        }
    }
}

/// Candidate zone-file paths, most likely first.
///
/// Reverse zones check the reverse directory before the direct one. The
/// configured zone path is appended when it is a specific directory: not one of
/// the defaults, and named like a zone or DNS directory.
#[must_use]
pub fn zone_file_candidates(zone: &str, ssh: &SshConfig) -> Vec<String> {
    let dirs = if is_reverse_zone(zone) {
        [ZONE_REVERSE_DIR, ZONE_DIRECT_DIR]
    } else {
        [ZONE_DIRECT_DIR, ZONE_REVERSE_DIR]
    };

    let mut candidates: Vec<String> = [
        format!("db.{zone}"),
        format!("{zone}.zone"),
        zone.to_string(),
    ]
    .iter()
    .flat_map(|file| dirs.iter().map(move |dir| format!("{dir}/{file}")))
    .collect();

    let configured = ssh.zone_files_path.trim().trim_end_matches('/');
    let lower = configured.to_ascii_lowercase();
    if !configured.is_empty()
        && ![ZONE_ROOT_DIR, ZONE_DIRECT_DIR, ZONE_REVERSE_DIR].contains(&configured)
        && (lower.contains("zone") || lower.contains("dns"))
    {
        candidates.extend([
            format!("{configured}/db.{zone}"),
            format!("{configured}/{zone}.zone"),
            format!("{configured}/{zone}.db"),
            format!("{configured}/{zone}"),
        ]);
    }
    candidates
}

async fn locate_zone_file(
    session: &mut dyn RemoteSession,
    ssh: &SshConfig,
    zone: &str,
) -> Result<String, DnsError> {
    for path in zone_file_candidates(zone, ssh) {
        let check = session.exec(&commands::file_exists(&path)).await?;
        if commands::reports_exists(&check.stdout) {
            debug!("Found zone file for {zone} at: {path}");
            return Ok(path);
        }
    }
    Err(ZoneError::ZoneFileNotFound {
        zone: zone.to_string(),
        host: ssh.hostname.clone(),
    }
    .into())
}

async fn backup(
    session: &mut dyn RemoteSession,
    config: &DiscoveryConfig,
    zone: &str,
    path: &str,
    timestamp: &str,
) -> Result<String, DnsError> {
    let backup_dir = config.commands.backup_dir.as_str();
    let failed = |reason: String| ZoneError::BackupFailed {
        path: path.to_string(),
        backup_dir: backup_dir.to_string(),
        reason,
    };

    let mkdir = session.exec(&commands::make_dir(backup_dir)).await?;
    if !mkdir.success() {
        return Err(failed(mkdir.diagnostics()).into());
    }

    let destination = commands::backup_path(backup_dir, zone, timestamp);
    let copy = session
        .exec(&commands::copy_file(path, &destination))
        .await?;
    if !copy.success() {
        return Err(failed(copy.diagnostics()).into());
    }
    debug!("Backup of {path} written to {destination}");
    Ok(destination)
}

async fn apply(
    session: &mut dyn RemoteSession,
    operation: Operation,
    config: &DiscoveryConfig,
    ssh: &SshConfig,
    zone: &str,
    edit: Edit<'_>,
) -> Result<Option<String>, DnsError> {
    let path = locate_zone_file(session, ssh, zone).await?;
    let timestamp = chrono::Local::now()
        .format(BACKUP_TIMESTAMP_FORMAT)
        .to_string();

    backup(session, config, zone, &path, &timestamp).await?;

    let read = session.exec(&commands::read_file(&path)).await?;
    if !read.success() {
        return Err(ZoneError::ReadFailed {
            path,
            reason: read.diagnostics(),
        }
        .into());
    }

    let mut zone_file = ZoneFile::parse(&read.stdout);
    match edit {
        Edit::Insert(line) => zone_file.insert_record(line),
        Edit::Replace(matcher, line) => {
            let outcome = zone_file.replace_first(&matcher, line);
            ensure_found(outcome.found, outcome.checked, &matcher)?;
        }
        Edit::Remove(matcher) => {
            let outcome = zone_file.remove_first(&matcher);
            ensure_found(outcome.found, outcome.checked, &matcher)?;
        }
    }
    zone_file.bump_serial();

    let temp_dir = config
        .commands
        .temp_dir
        .clone()
        .unwrap_or_else(|| commands::parent_dir(&path).to_string());
    let temp = commands::temp_path(&temp_dir, zone, &timestamp);
    session
        .write_file(&temp, zone_file.render().as_bytes())
        .await
        .map_err(|e| ZoneError::WriteFailed {
            path: temp.clone(),
            reason: e.to_string(),
        })?;

    let check_command = commands::render_template(&config.commands.check_zone, zone, &temp);
    debug!("Validating zone file: {check_command}");
    let check = session.exec(&check_command).await?;
    if !check.success() {
        discard(session, &temp).await;
        return Err(ZoneError::ZoneCheckFailed {
            zone: zone.to_string(),
            diagnostics: check.diagnostics(),
        }
        .into());
    }

    let replace = session
        .exec(&commands::move_replace(&temp, &path))
        .await?;
    if !replace.success() {
        discard(session, &temp).await;
        return Err(ZoneError::ReplaceFailed {
            path,
            reason: replace.diagnostics(),
        }
        .into());
    }

    let reload_command = commands::render_template(&config.commands.reload, zone, &path);
    let reload_failure = match session.exec(&reload_command).await {
        Ok(output) if output.success() => None,
        Ok(output) => Some(output.diagnostics()),
        Err(e) => Some(e.to_string()),
    };

    if let Some(diagnostics) = &reload_failure {
        warn!(
            "Reload after {} in {zone} failed: {diagnostics}",
            operation.as_str()
        );
    }
    Ok(reload_failure)
}

fn ensure_found(found: bool, checked: usize, matcher: &RecordMatcher<'_>) -> Result<(), RecordError> {
    info!("Search completed: {checked} records checked, found: {found}");
    if found {
        Ok(())
    } else {
        Err(RecordError::RecordNotFound {
            name: matcher.name.to_string(),
            record_type: matcher.record_type.to_string(),
            value: matcher.value.to_string(),
            zone: matcher.zone.to_string(),
            checked,
        })
    }
}

/// Best-effort removal of a temporary file.
async fn discard(session: &mut dyn RemoteSession, temp: &str) {
    match session.exec(&commands::remove_file(temp)).await {
        Ok(output) if output.success() => {}
        Ok(output) => warn!("Failed to remove {temp}: {}", output.diagnostics()),
        Err(e) => warn!("Failed to remove {temp}: {e}"),
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod mutation_tests;
