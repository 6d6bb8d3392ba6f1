// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Engine facade.
//!
//! [`ZoneManager`] is what a caller (the CLI, or a web layer) talks to. It owns
//! the configuration document and the remote credentials, and hands a snapshot of
//! both to the query, discovery and mutation engines on every call. Reloading the
//! configuration or replacing the credentials never affects a call already in
//! flight.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use zonekeeper::config::SshConfig;
//! use zonekeeper::manager::ZoneManager;
//! use zonekeeper::records::TypeFilter;
//!
//! # async fn example() {
//! let manager = ZoneManager::system(Path::new("zones_config.yaml"));
//! manager
//!     .update_ssh_config(SshConfig::new("ns1.example.com", "admin", "secret"))
//!     .await;
//!
//! for zone in manager.list_zones().await {
//!     let records = manager.get_records(&zone, TypeFilter::All).await;
//!     println!("{zone}: {} records", records.len());
//! }
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{DiscoveryConfig, SshConfig};
use crate::constants::SSH_CONNECT_TIMEOUT_SECS;
use crate::discovery::{ZoneDiscovery, ZoneListing};
use crate::mutation::{MutationEngine, MutationResult};
use crate::query::{QueryEngine, ZoneInfo};
use crate::records::{supported_record_types, Record, RecordTypeInfo, TypeFilter};
use crate::remote::openssh::OpenSshConnector;
use crate::remote::{commands, RemoteConnector};
use crate::resolver::hickory::HickoryResolver;
use crate::resolver::DnsResolver;

/// Outcome of [`ZoneManager::test_connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTest {
    /// True when the login succeeded as the expected user
    pub success: bool,
    /// Human-readable outcome
    pub message: String,
}

/// Facade over the query, discovery and mutation engines.
pub struct ZoneManager {
    config_path: Option<PathBuf>,
    config: RwLock<Arc<DiscoveryConfig>>,
    ssh: RwLock<SshConfig>,
    connector: Arc<dyn RemoteConnector>,
    query: QueryEngine,
    discovery: ZoneDiscovery,
    mutation: MutationEngine,
}

impl ZoneManager {
    /// Build a manager over the given collaborators.
    #[must_use]
    pub fn new(
        config: DiscoveryConfig,
        connector: Arc<dyn RemoteConnector>,
        resolver: Arc<dyn DnsResolver>,
    ) -> Self {
        let query = QueryEngine::new(resolver);
        Self {
            config_path: None,
            config: RwLock::new(Arc::new(config)),
            ssh: RwLock::new(SshConfig::default()),
            discovery: ZoneDiscovery::new(connector.clone(), query.clone()),
            mutation: MutationEngine::new(connector.clone()),
            connector,
            query,
        }
    }

    /// Build a manager whose configuration lives at `path`.
    ///
    /// The document is created with defaults when it does not exist.
    #[must_use]
    pub fn from_config_file(
        path: &Path,
        connector: Arc<dyn RemoteConnector>,
        resolver: Arc<dyn DnsResolver>,
    ) -> Self {
        let mut manager = Self::new(DiscoveryConfig::load_or_init(path), connector, resolver);
        manager.config_path = Some(path.to_path_buf());
        manager
    }

    /// Build a manager over the system OpenSSH client and the hickory resolver.
    #[must_use]
    pub fn system(config_path: &Path) -> Self {
        Self::from_config_file(
            config_path,
            Arc::new(OpenSshConnector::default()),
            Arc::new(HickoryResolver),
        )
    }

    /// Snapshot of the current configuration.
    pub async fn config(&self) -> Arc<DiscoveryConfig> {
        self.config.read().await.clone()
    }

    /// Snapshot of the current credentials.
    pub async fn ssh_config(&self) -> SshConfig {
        self.ssh.read().await.clone()
    }

    /// Replace the remote credentials.
    pub async fn update_ssh_config(&self, ssh: SshConfig) {
        info!(
            "SSH configuration updated: {}@{}:{}",
            ssh.username, ssh.hostname, ssh.port
        );
        *self.ssh.write().await = ssh;
    }

    /// Re-read the configuration document.
    ///
    /// Without a backing file this is a no-op. An unreadable document yields the
    /// defaults, as at startup.
    pub async fn reload_config(&self) {
        let Some(path) = &self.config_path else {
            debug!("No configuration file to reload");
            return;
        };
        let config = DiscoveryConfig::load_or_init(path);
        *self.config.write().await = Arc::new(config);
        info!("Configuration reloaded");
    }

    pub async fn list_zones(&self) -> Vec<String> {
        self.refresh_zones().await.zones
    }

    pub async fn refresh_zones(&self) -> ZoneListing {
        let config = self.config().await;
        let ssh = self.ssh_config().await;
        self.discovery.refresh_zones(&config, &ssh).await
    }

    pub async fn get_records(&self, zone: &str, filter: TypeFilter) -> Vec<Record> {
        let config = self.config().await;
        self.query.get_records(&config, zone, filter).await
    }

    pub async fn validate_zone(&self, zone: &str) -> bool {
        let config = self.config().await;
        self.query.validate_zone(&config, zone).await
    }

    pub async fn zone_info(&self, zone: &str) -> ZoneInfo {
        let config = self.config().await;
        self.query.zone_info(&config, zone).await
    }

    pub async fn add_record(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> MutationResult {
        let config = self.config().await;
        let ssh = self.ssh_config().await;
        self.mutation
            .add_record(&config, &ssh, zone, name, record_type, value, ttl)
            .await
    }

    pub async fn update_record(
        &self,
        zone: &str,
        original: &Record,
        updated: &Record,
    ) -> MutationResult {
        let config = self.config().await;
        let ssh = self.ssh_config().await;
        self.mutation
            .update_record(&config, &ssh, zone, original, updated)
            .await
    }

    pub async fn delete_record(
        &self,
        zone: &str,
        name: &str,
        record_type: &str,
        value: &str,
    ) -> MutationResult {
        let config = self.config().await;
        let ssh = self.ssh_config().await;
        self.mutation
            .delete_record(&config, &ssh, zone, name, record_type, value)
            .await
    }

    #[must_use]
    pub fn supported_record_types(&self) -> Vec<RecordTypeInfo> {
        supported_record_types()
    }

    /// Check that `ssh` can log in and read its zone directory.
    ///
    /// Runs `whoami` and compares the answer with the configured user, then lists
    /// the zone directory. A directory that cannot be listed only adds a warning.
    pub async fn test_connection(&self, ssh: &SshConfig) -> ConnectionTest {
        let failed = |message: String| {
            warn!("SSH connection test failed: {message}");
            ConnectionTest {
                success: false,
                message,
            }
        };

        let mut session = match self
            .connector
            .connect(ssh, Duration::from_secs(SSH_CONNECT_TIMEOUT_SECS))
            .await
        {
            Ok(session) => session,
            Err(e) => return failed(e.to_string()),
        };

        let whoami = match session.exec(&commands::whoami()).await {
            Ok(output) => output,
            Err(e) => {
                session.close().await;
                return failed(e.to_string());
            }
        };
        let user = whoami.stdout.trim();
        let (success, mut message) = if user == ssh.username {
            (true, format!("SSH connection successful as {user}"))
        } else {
            (
                false,
                format!("Connection established but unexpected user: {user}"),
            )
        };

        let path = &ssh.zone_files_path;
        match session.exec(&commands::list_dir_long(path)).await {
            Ok(output) if output.success() => {
                message.push_str(&format!(" | Access to {path} directory confirmed"));
            }
            Ok(_) | Err(_) => {
                message.push_str(&format!(" | Warning: Limited access to {path}"));
            }
        }
        session.close().await;

        info!("SSH connection test: {message}");
        ConnectionTest { success, message }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod manager_tests;
