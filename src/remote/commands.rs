// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shell command vocabulary run on the nameserver host.
//!
//! Every path and zone name is single-quoted with [`shell_quote`] before it is
//! interpolated, so names containing spaces or shell metacharacters cannot break
//! out of the argument they belong to.

/// Marker printed by [`file_exists`] and [`dir_exists`] on success.
pub const EXISTS_MARKER: &str = "exists";

/// Quote `value` for a POSIX shell.
///
/// The value is wrapped in single quotes; embedded single quotes become `'\''`.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Prints `exists` when `path` is a regular file, `not_found` otherwise.
#[must_use]
pub fn file_exists(path: &str) -> String {
    format!(
        "test -f {} && echo {EXISTS_MARKER} || echo not_found",
        shell_quote(path)
    )
}

/// Prints `exists` when `path` is a directory, `not_found` otherwise.
#[must_use]
pub fn dir_exists(path: &str) -> String {
    format!(
        "test -d {} && echo {EXISTS_MARKER} || echo not_found",
        shell_quote(path)
    )
}

/// True when the output of [`file_exists`] or [`dir_exists`] reports a hit.
#[must_use]
pub fn reports_exists(stdout: &str) -> bool {
    stdout.trim() == EXISTS_MARKER
}

#[must_use]
pub fn read_file(path: &str) -> String {
    format!("cat {}", shell_quote(path))
}

#[must_use]
pub fn make_dir(path: &str) -> String {
    format!("mkdir -p {}", shell_quote(path))
}

#[must_use]
pub fn copy_file(source: &str, destination: &str) -> String {
    format!("cp {} {}", shell_quote(source), shell_quote(destination))
}

/// Rename `source` onto `destination`, replacing it.
#[must_use]
pub fn move_replace(source: &str, destination: &str) -> String {
    format!("mv -f {} {}", shell_quote(source), shell_quote(destination))
}

#[must_use]
pub fn remove_file(path: &str) -> String {
    format!("rm -f {}", shell_quote(path))
}

/// Names of the regular files directly under `dir`, one per line.
#[must_use]
pub fn list_files(dir: &str) -> String {
    format!(
        r"find {} -maxdepth 1 -type f -exec basename {{}} \;",
        shell_quote(dir)
    )
}

#[must_use]
pub fn whoami() -> String {
    "whoami".to_string()
}

#[must_use]
pub fn list_dir_long(dir: &str) -> String {
    format!("ls -la {}", shell_quote(dir))
}

/// Expand a configured command template.
///
/// `{zone}` and `{file}` are replaced with shell-quoted values; a template without
/// placeholders is returned as written.
#[must_use]
pub fn render_template(template: &str, zone: &str, file: &str) -> String {
    template
        .replace("{zone}", &shell_quote(zone))
        .replace("{file}", &shell_quote(file))
}

/// Directory part of a remote path (`/` for top-level files, `.` for bare names).
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(index) => &path[..index],
        None => ".",
    }
}

/// Backup destination for `zone`, e.g. `/etc/bind/backup/db.example.com.backup.20240101_120000`.
#[must_use]
pub fn backup_path(backup_dir: &str, zone: &str, timestamp: &str) -> String {
    format!(
        "{}/db.{zone}.backup.{timestamp}",
        backup_dir.trim_end_matches('/')
    )
}

/// Temporary file for the edited zone, unique per zone and timestamp.
///
/// The name is dot-prefixed so zone-file discovery never lists it.
#[must_use]
pub fn temp_path(dir: &str, zone: &str, timestamp: &str) -> String {
    format!(
        "{}/.zonekeeper.{zone}.{timestamp}.tmp",
        dir.trim_end_matches('/')
    )
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod commands_tests;
