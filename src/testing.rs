// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory test doubles for the remote host and the resolver.
//!
//! [`FakeHost`] interprets the shell vocabulary in [`crate::remote::commands`]
//! against an in-memory file map. [`FakeResolver`] answers from a script and
//! records every query it receives.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::SshConfig;
use crate::dns_errors::{ResolveError, SessionError, ZoneTransferError};
use crate::records::RecordType;
use crate::remote::commands::parent_dir;
use crate::remote::{CommandOutput, RemoteConnector, RemoteSession};
use crate::resolver::{Answer, DnsResolver, TransferredRecord};

/// A zone file with a multi-line SOA, used across the engine tests.
pub const EXAMPLE_ZONE: &str = "$TTL 3600
@       IN      SOA     ns1.example.com. admin.example.com. (
                        2024010101 ; serial
                        3600       ; refresh
                        600        ; retry
                        604800     ; expire
                        86400 )    ; minimum
@                              3600     IN  NS       ns1.example.com.
www                            3600     IN  A        10.0.0.1
mail                           3600     IN  A        10.0.0.2
@                              3600     IN  MX       10 mail.example.com.

; end of records
";

/// Split a command line into words, honouring single quotes and backslash escapes.
pub fn shell_words(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut in_quote = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_quote = !in_quote;
                in_word = true;
            }
            '\\' if !in_quote => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            c if c.is_whitespace() && !in_quote => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn ok(stdout: impl Into<String>) -> CommandOutput {
    CommandOutput {
        stdout: stdout.into(),
        stderr: String::new(),
        exit_code: 0,
    }
}

fn fail(exit_code: i32, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        stdout: String::new(),
        stderr: stderr.into(),
        exit_code,
    }
}

/// Mutable state of a [`FakeHost`].
#[derive(Debug, Default)]
pub struct HostState {
    /// Regular files by absolute path
    pub files: BTreeMap<String, String>,
    /// Directories that exist without containing files
    pub dirs: BTreeSet<String>,
    /// Every command executed, in order
    pub commands: Vec<String>,
    /// Login name reported by `whoami`
    pub whoami: String,
    /// When set, the zone checker fails with this output
    pub check_failure: Option<String>,
    /// Make the reload command fail
    pub reload_fails: bool,
    /// Make `mkdir`/`cp` fail
    pub backup_fails: bool,
    /// Make `write_file` fail
    pub write_fails: bool,
    /// Make every `exec` fail with a transport error
    pub exec_fails: bool,
    /// Sessions opened
    pub opened: usize,
    /// Sessions closed
    pub closed: usize,
}

impl HostState {
    fn dir_exists(&self, dir: &str) -> bool {
        self.dirs.contains(dir) || self.files.keys().any(|path| parent_dir(path) == dir)
    }

    fn run(&mut self, command: &str) -> CommandOutput {
        let words = shell_words(command);
        let word = |i: usize| words.get(i).map(String::as_str).unwrap_or_default();

        match (word(0), word(1)) {
            ("test", "-f") => {
                let hit = self.files.contains_key(word(2));
                ok(if hit { "exists\n" } else { "not_found\n" })
            }
            ("test", "-d") => {
                let hit = self.dir_exists(word(2));
                ok(if hit { "exists\n" } else { "not_found\n" })
            }
            ("cat", path) => match self.files.get(path) {
                Some(content) => ok(content.clone()),
                None => fail(1, format!("cat: {path}: No such file or directory")),
            },
            ("mkdir", "-p") => {
                if self.backup_fails {
                    return fail(1, "mkdir: cannot create directory: Permission denied");
                }
                self.dirs.insert(word(2).to_string());
                ok("")
            }
            ("cp", source) => {
                if self.backup_fails {
                    return fail(1, "cp: cannot create regular file: Permission denied");
                }
                match self.files.get(source).cloned() {
                    Some(content) => {
                        self.files.insert(word(2).to_string(), content);
                        ok("")
                    }
                    None => fail(1, format!("cp: cannot stat '{source}'")),
                }
            }
            ("mv", "-f") => match self.files.remove(word(2)) {
                Some(content) => {
                    self.files.insert(word(3).to_string(), content);
                    ok("")
                }
                None => fail(1, format!("mv: cannot stat '{}'", word(2))),
            },
            ("rm", "-f") => {
                self.files.remove(word(2));
                ok("")
            }
            ("find", dir) => {
                let names: Vec<&str> = self
                    .files
                    .keys()
                    .filter(|path| parent_dir(path) == dir)
                    .map(|path| basename(path))
                    .collect();
                ok(names.join("\n"))
            }
            ("whoami", _) => ok(format!("{}\n", self.whoami)),
            ("ls", "-la") => {
                if self.dir_exists(word(2)) {
                    ok("total 8\ndrwxr-xr-x 2 bind bind 4096 .\n")
                } else {
                    fail(2, format!("ls: cannot access '{}'", word(2)))
                }
            }
            ("named-checkzone", zone) => match &self.check_failure {
                Some(diagnostics) => CommandOutput {
                    stdout: diagnostics.clone(),
                    stderr: String::new(),
                    exit_code: 1,
                },
                None => ok(format!("zone {zone}/IN: loaded serial 1\nOK\n")),
            },
            ("rndc", _) => {
                if self.reload_fails {
                    fail(1, "rndc: connect failed: 127.0.0.1#953: connection refused")
                } else {
                    ok("server reload successful\n")
                }
            }
            (program, _) => fail(127, format!("{program}: command not found")),
        }
    }
}

/// A remote host backed by an in-memory file map.
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        let host = Self::default();
        host.state().whoami = "admin".to_string();
        Arc::new(host)
    }

    /// Lock the host state for inspection or setup.
    pub fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn with_file(self: Arc<Self>, path: &str, content: &str) -> Arc<Self> {
        self.state()
            .files
            .insert(path.to_string(), content.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Paths of files whose name starts with `prefix`.
    pub fn files_under(&self, prefix: &str) -> Vec<String> {
        self.state()
            .files
            .keys()
            .filter(|path| path.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Connects to a [`FakeHost`], or fails with a scripted error.
pub struct FakeConnector {
    pub host: Arc<FakeHost>,
    pub failure: Option<SessionError>,
}

impl FakeConnector {
    pub fn new(host: Arc<FakeHost>) -> Arc<Self> {
        Arc::new(Self {
            host,
            failure: None,
        })
    }

    pub fn failing(host: Arc<FakeHost>, failure: SessionError) -> Arc<Self> {
        Arc::new(Self {
            host,
            failure: Some(failure),
        })
    }
}

#[async_trait::async_trait]
impl RemoteConnector for FakeConnector {
    async fn connect(
        &self,
        _config: &SshConfig,
        _timeout: Duration,
    ) -> Result<Box<dyn RemoteSession>, SessionError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.host.state().opened += 1;
        Ok(Box::new(FakeSession {
            host: self.host.clone(),
        }))
    }
}

struct FakeSession {
    host: Arc<FakeHost>,
}

#[async_trait::async_trait]
impl RemoteSession for FakeSession {
    async fn exec(&mut self, command: &str) -> Result<CommandOutput, SessionError> {
        let mut state = self.host.state();
        if state.exec_fails {
            return Err(SessionError::Transport {
                host: "fake".to_string(),
                reason: "connection reset".to_string(),
            });
        }
        state.commands.push(command.to_string());
        Ok(state.run(command))
    }

    async fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), SessionError> {
        let mut state = self.host.state();
        if state.write_fails {
            return Err(SessionError::Transport {
                host: "fake".to_string(),
                reason: "No space left on device".to_string(),
            });
        }
        state.files.insert(
            path.to_string(),
            String::from_utf8_lossy(contents).into_owned(),
        );
        Ok(())
    }

    async fn close(&mut self) {
        self.host.state().closed += 1;
    }
}

fn key(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// A resolver answering from a script; unscripted queries get NXDOMAIN and
/// unscripted transfers are refused.
#[derive(Default)]
pub struct FakeResolver {
    answers: Mutex<HashMap<(String, RecordType), Result<Vec<Answer>, ResolveError>>>,
    transfers: Mutex<HashMap<String, Result<Vec<TransferredRecord>, ZoneTransferError>>>,
    queries: Mutex<Vec<(SocketAddr, String, RecordType, Duration)>>,
}

impl FakeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, name: &str, record_type: RecordType, values: &[(&str, u32)]) -> Self {
        let answers = values
            .iter()
            .map(|(value, ttl)| Answer {
                value: (*value).to_string(),
                ttl: *ttl,
            })
            .collect();
        self.lock_answers()
            .insert((key(name), record_type), Ok(answers));
        self
    }

    pub fn error(self, name: &str, record_type: RecordType, error: ResolveError) -> Self {
        self.lock_answers()
            .insert((key(name), record_type), Err(error));
        self
    }

    pub fn transfer_ok(self, zone: &str, records: &[(&str, RecordType, &str, u32)]) -> Self {
        let records = records
            .iter()
            .map(|(name, record_type, value, ttl)| TransferredRecord {
                name: (*name).to_string(),
                record_type: *record_type,
                value: (*value).to_string(),
                ttl: *ttl,
            })
            .collect();
        self.transfers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key(zone), Ok(records));
        self
    }

    /// Every query received, as (server, name, type, timeout).
    pub fn queries(&self) -> Vec<(SocketAddr, String, RecordType, Duration)> {
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn lock_answers(
        &self,
    ) -> MutexGuard<'_, HashMap<(String, RecordType), Result<Vec<Answer>, ResolveError>>> {
        self.answers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl DnsResolver for FakeResolver {
    async fn query(
        &self,
        server: SocketAddr,
        name: &str,
        record_type: RecordType,
        timeout: Duration,
    ) -> Result<Vec<Answer>, ResolveError> {
        self.queries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((server, key(name), record_type, timeout));
        self.lock_answers()
            .get(&(key(name), record_type))
            .cloned()
            .unwrap_or_else(|| {
                Err(ResolveError::NxDomain {
                    name: name.to_string(),
                })
            })
    }

    async fn transfer(
        &self,
        server: SocketAddr,
        zone: &str,
        _timeout: Duration,
    ) -> Result<Vec<TransferredRecord>, ZoneTransferError> {
        self.transfers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key(zone))
            .cloned()
            .unwrap_or_else(|| {
                Err(ZoneTransferError::TransferRefused {
                    zone: zone.to_string(),
                    server: server.to_string(),
                })
            })
    }
}
