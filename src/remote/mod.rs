// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remote execution on the nameserver host.
//!
//! The engine never speaks a transport protocol itself. It talks to the remote
//! host through two traits:
//!
//! - [`RemoteConnector`] opens a session from an [`SshConfig`]
//! - [`RemoteSession`] runs shell commands and writes files
//!
//! Every public engine operation opens its own session and closes it before
//! returning. The shell vocabulary the engine uses lives in [`commands`]; the
//! shipped adapter over the system OpenSSH client lives in [`openssh`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use zonekeeper::config::SshConfig;
//! use zonekeeper::remote::{commands, openssh::OpenSshConnector, RemoteConnector};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connector = OpenSshConnector::default();
//! let config = SshConfig::new("ns1.example.com", "admin", "secret");
//!
//! let mut session = connector.connect(&config, Duration::from_secs(10)).await?;
//! let output = session.exec(&commands::whoami()).await?;
//! println!("logged in as {}", output.stdout.trim());
//! session.close().await;
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod openssh;

use std::time::Duration;

use crate::config::SshConfig;
use crate::dns_errors::SessionError;

/// Captured result of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded as UTF-8
    pub stdout: String,
    /// Standard error, lossily decoded as UTF-8
    pub stderr: String,
    /// Exit status; `-1` when the process was terminated by a signal
    pub exit_code: i32,
}

impl CommandOutput {
    /// True when the command exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Best diagnostic text: stderr when present, stdout otherwise.
    #[must_use]
    pub fn diagnostics(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Opens sessions on the remote nameserver host.
#[async_trait::async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Connect and authenticate.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] describing why the connection could not be
    /// established: bad credentials, refused connection, timeout or any other
    /// transport failure.
    async fn connect(
        &self,
        config: &SshConfig,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SessionError>;
}

/// An authenticated session on the remote host.
#[async_trait::async_trait]
pub trait RemoteSession: Send {
    /// Run a shell command and capture its output.
    ///
    /// A non-zero exit status is not an error; inspect [`CommandOutput::exit_code`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the command could not be delivered.
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SessionError>;

    /// Write `contents` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the file could not be written.
    async fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), SessionError>;

    /// Close the session. Failures are logged, never returned.
    async fn close(&mut self);
}
