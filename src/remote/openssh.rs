// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Remote session adapter over the system OpenSSH client.
//!
//! A session is one multiplexed master connection (`ssh -M -N -f -S <socket>`);
//! every command and file write rides on it through the control socket, and
//! [`RemoteSession::close`] tears it down with `ssh -O exit`.
//!
//! Password authentication goes through `sshpass -e`, which reads the password
//! from the `SSHPASS` environment variable so it never appears on a command line.
//! With an empty password the client runs in batch mode and relies on keys or an
//! agent.
//!
//! The master forks into the background once authenticated, so its diagnostics are
//! written to a log file next to the control socket (`ssh -E`) and read back when
//! the connection fails.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{CommandOutput, RemoteConnector, RemoteSession};
use crate::config::SshConfig;
use crate::dns_errors::SessionError;

/// Exit status `sshpass` uses for a rejected password.
const SSHPASS_INVALID_PASSWORD: i32 = 5;

/// Exit status `ssh` uses for its own (non-remote) failures.
const SSH_CLIENT_FAILURE: i32 = 255;

/// Extra time allowed for the master to fork after `ConnectTimeout`.
const CONNECT_GRACE: Duration = Duration::from_secs(2);

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens [`OpenSshSession`]s by spawning the system `ssh` client.
#[derive(Debug, Clone)]
pub struct OpenSshConnector {
    ssh_program: String,
    sshpass_program: String,
    control_dir: PathBuf,
}

impl Default for OpenSshConnector {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
            control_dir: std::env::temp_dir(),
        }
    }
}

impl OpenSshConnector {
    fn control_path(&self) -> PathBuf {
        let id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.control_dir
            .join(format!("zonekeeper-{}-{id}.sock", std::process::id()))
    }
}

#[async_trait::async_trait]
impl RemoteConnector for OpenSshConnector {
    async fn connect(
        &self,
        config: &SshConfig,
        timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        let control_path = self.control_path();
        let log_path = control_path.with_extension("log");
        let destination = format!("{}@{}", config.username, config.hostname);

        let mut cmd = if config.password.is_empty() {
            let mut cmd = Command::new(&self.ssh_program);
            cmd.args(["-o", "BatchMode=yes"]);
            cmd
        } else {
            let mut cmd = Command::new(&self.sshpass_program);
            cmd.arg("-e")
                .arg(&self.ssh_program)
                .env("SSHPASS", &config.password);
            cmd
        };

        cmd.args(["-M", "-N", "-f", "-S"])
            .arg(&control_path)
            .arg("-E")
            .arg(&log_path)
            .arg("-p")
            .arg(config.port.to_string())
            .arg("-o")
            .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)))
            .args([
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-o",
                "NumberOfPasswordPrompts=1",
                "-o",
                "ControlPersist=no",
            ])
            .arg(&destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!(
            "Opening SSH master connection to {}:{} as {}",
            config.hostname, config.port, config.username
        );

        let mut child = cmd.spawn().map_err(|e| SessionError::Transport {
            host: config.hostname.clone(),
            reason: format!("Failed to spawn {}: {e}", self.ssh_program),
        })?;

        let status = match tokio::time::timeout(timeout + CONNECT_GRACE, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                return Err(SessionError::Transport {
                    host: config.hostname.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(
                    "SSH connection to {} did not complete within {:?}",
                    config.hostname, timeout
                );
                remove_quietly(&log_path).await;
                return Err(SessionError::Timeout {
                    host: config.hostname.clone(),
                    timeout_secs: timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            let log = tokio::fs::read_to_string(&log_path)
                .await
                .unwrap_or_default();
            remove_quietly(&log_path).await;
            let err = classify_connect_failure(status.code(), &log, config, timeout);
            error!("SSH connection failed: {err}");
            return Err(err);
        }

        info!("SSH session established with {}", config.hostname);
        Ok(Box::new(OpenSshSession {
            ssh_program: self.ssh_program.clone(),
            control_path,
            log_path,
            host: config.hostname.clone(),
            port: config.port,
            destination,
            closed: false,
        }))
    }
}

/// Map a failed master connection to a [`SessionError`].
///
/// `log` is whatever the client wrote to its log file.
#[must_use]
pub fn classify_connect_failure(
    exit_code: Option<i32>,
    log: &str,
    config: &SshConfig,
    timeout: Duration,
) -> SessionError {
    let lower = log.to_ascii_lowercase();

    if exit_code == Some(SSHPASS_INVALID_PASSWORD)
        || lower.contains("permission denied")
        || lower.contains("authentication failed")
    {
        SessionError::AuthenticationFailed {
            host: config.hostname.clone(),
            username: config.username.clone(),
        }
    } else if lower.contains("connection refused") {
        SessionError::ConnectionRefused {
            host: config.hostname.clone(),
            port: config.port,
        }
    } else if lower.contains("timed out") {
        SessionError::Timeout {
            host: config.hostname.clone(),
            timeout_secs: timeout.as_secs(),
        }
    } else {
        let reason = log
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map_or_else(
                || format!("ssh exited with status {exit_code:?}"),
                |line| line.trim().to_string(),
            );
        SessionError::Transport {
            host: config.hostname.clone(),
            reason,
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!("Could not remove {}: {e}", path.display());
    }
}

/// A session multiplexed over one OpenSSH master connection.
pub struct OpenSshSession {
    ssh_program: String,
    control_path: PathBuf,
    log_path: PathBuf,
    host: String,
    port: u16,
    destination: String,
    closed: bool,
}

impl OpenSshSession {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.arg("-S")
            .arg(&self.control_path)
            .args(["-o", "ControlMaster=no", "-p"])
            .arg(self.port.to_string())
            .arg(&self.destination)
            .kill_on_drop(true);
        cmd
    }

    fn transport_error(&self, reason: impl Into<String>) -> SessionError {
        SessionError::Transport {
            host: self.host.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait::async_trait]
impl RemoteSession for OpenSshSession {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        debug!("Remote exec on {}: {command}", self.host);

        let output = self
            .command()
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.transport_error(format!("Failed to spawn ssh: {e}")))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        if result.exit_code == SSH_CLIENT_FAILURE {
            return Err(self.transport_error(result.diagnostics()));
        }

        debug!("Remote exec exited with {}", result.exit_code);
        Ok(result)
    }

    async fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), SessionError> {
        debug!("Writing {} bytes to {}:{path}", contents.len(), self.host);

        let mut child = self
            .command()
            .arg(format!("cat > {}", super::commands::shell_quote(path)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.transport_error(format!("Failed to spawn ssh: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(contents)
                .await
                .map_err(|e| self.transport_error(format!("Failed to send file: {e}")))?;
            stdin
                .shutdown()
                .await
                .map_err(|e| self.transport_error(format!("Failed to close stdin: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.transport_error(format!("Failed to wait for ssh: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(self.transport_error(format!("Failed to write {path}: {stderr}")));
        }
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let result = Command::new(&self.ssh_program)
            .arg("-S")
            .arg(&self.control_path)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(output) if output.status.success() => {
                debug!("SSH session with {} closed", self.host);
            }
            Ok(output) => warn!(
                "Closing SSH session with {} failed: {}",
                self.host,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => warn!("Closing SSH session with {} failed: {e}", self.host),
        }
        remove_quietly(&self.log_path).await;
    }
}

impl Drop for OpenSshSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best effort: ask the master to exit without waiting for it.
        let spawned = std::process::Command::new(&self.ssh_program)
            .arg("-S")
            .arg(&self.control_path)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(e) = spawned {
            warn!("SSH session with {} was not closed: {e}", self.host);
        }
    }
}

#[cfg(test)]
#[path = "openssh_tests.rs"]
mod openssh_tests;
