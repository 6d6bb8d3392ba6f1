// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Line model of a zone file.
//!
//! A zone file is edited as text: it is split on `\n` into [`ZoneLine`]s by a
//! single parse pass, transformed, and joined back with `\n`. Lines the engine does
//! not touch are rendered byte-for-byte as they were read.
//!
//! Lines that fall inside an open parenthesis (the body of a multi-line SOA, for
//! example) are classified as record continuation lines, whatever they contain, so
//! an insertion can never land inside a parenthesized record.

use tracing::{debug, warn};

use super::normalize::{names_match, parse_line, values_match, ParsedLine};
use super::RecordType;

/// One line of a zone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneLine {
    /// Empty or whitespace-only line
    Blank(String),
    /// Line whose first non-blank character is `;`
    Comment(String),
    /// `$TTL`, `$ORIGIN`, `$INCLUDE`...
    Directive(String),
    /// Resource record text, or a continuation of one
    Record {
        /// The line as read
        raw: String,
        /// Parsed fields; `None` for continuation lines and lines without a class
        parsed: Option<ParsedLine>,
    },
}

impl ZoneLine {
    /// The line text as it will be rendered.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Blank(raw) | Self::Comment(raw) | Self::Directive(raw) => raw,
            Self::Record { raw, .. } => raw,
        }
    }

    fn record(raw: String) -> Self {
        let parsed = parse_line(strip_comment(&raw));
        Self::Record { raw, parsed }
    }
}

/// Identifies the record an update or delete targets.
#[derive(Debug, Clone, Copy)]
pub struct RecordMatcher<'a> {
    /// Zone the names are relative to
    pub zone: &'a str,
    /// Owner name, relative or fully qualified
    pub name: &'a str,
    /// Record type
    pub record_type: RecordType,
    /// Record value
    pub value: &'a str,
}

impl RecordMatcher<'_> {
    fn matches(&self, parsed: &ParsedLine) -> bool {
        parsed
            .record_type
            .eq_ignore_ascii_case(self.record_type.as_str())
            && values_match(&parsed.value, self.value, self.record_type.as_str())
            && names_match(&parsed.name, self.name, self.zone)
    }
}

/// Result of scanning a zone file for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Whether a matching line was found (and changed)
    pub found: bool,
    /// Number of record lines of the requested type examined
    pub checked: usize,
}

/// A parsed zone file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ZoneFile {
    lines: Vec<ZoneLine>,
}

impl ZoneFile {
    /// Classify every line of `content`.
    ///
    /// Record lines that start with whitespace inherit the owner of the previous
    /// record line, as BIND does.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();
        let mut depth: usize = 0;
        let mut last_owner: Option<String> = None;

        for raw in content.split('\n') {
            let trimmed = raw.trim();
            let line = if depth > 0 {
                ZoneLine::Record {
                    raw: raw.to_string(),
                    parsed: None,
                }
            } else if trimmed.is_empty() {
                ZoneLine::Blank(raw.to_string())
            } else if trimmed.starts_with(';') {
                ZoneLine::Comment(raw.to_string())
            } else if trimmed.starts_with('$') {
                ZoneLine::Directive(raw.to_string())
            } else if raw.starts_with(char::is_whitespace) {
                let text = strip_comment(raw).trim();
                let parsed = last_owner
                    .as_deref()
                    .and_then(|owner| parse_line(&format!("{owner} {text}")));
                ZoneLine::Record {
                    raw: raw.to_string(),
                    parsed,
                }
            } else {
                last_owner = raw.split_whitespace().next().map(ToString::to_string);
                ZoneLine::record(raw.to_string())
            };

            let (opens, closes) = paren_balance(strip_comment(raw));
            depth = (depth + opens).saturating_sub(closes);
            lines.push(line);
        }

        Self { lines }
    }

    /// Join the lines back with `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(ZoneLine::raw)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The classified lines.
    #[must_use]
    pub fn lines(&self) -> &[ZoneLine] {
        &self.lines
    }

    /// Parsed record lines, continuation lines excluded.
    pub fn records(&self) -> impl Iterator<Item = &ParsedLine> {
        self.lines.iter().filter_map(|line| match line {
            ZoneLine::Record {
                parsed: Some(parsed),
                ..
            } => Some(parsed),
            _ => None,
        })
    }

    /// Insert a formatted record line.
    ///
    /// The line goes before the first blank or comment line that follows the
    /// leading record block. Without such a line it is appended, ahead of the empty
    /// element left by a trailing newline. Indented records after the insertion
    /// point keep the owner they had.
    pub fn insert_record(&mut self, line: String) {
        let index = self.insertion_index();
        let follower = self.next_inheriting(index);
        debug!("Inserting record at line {}", index + 1);
        self.lines.insert(index, ZoneLine::record(line));
        self.restore_owner(follower.map(|(i, owner)| (i + 1, owner)));
    }

    fn insertion_index(&self) -> usize {
        let first_record = self
            .lines
            .iter()
            .position(|l| matches!(l, ZoneLine::Record { .. }));

        if let Some(start) = first_record {
            if let Some(offset) = self.lines[start..]
                .iter()
                .position(|l| matches!(l, ZoneLine::Blank(_) | ZoneLine::Comment(_)))
            {
                return start + offset;
            }
        }

        match self.lines.last() {
            Some(ZoneLine::Blank(raw)) if raw.is_empty() => self.lines.len() - 1,
            _ => self.lines.len(),
        }
    }

    fn scan(&self, matcher: &RecordMatcher<'_>) -> (Option<usize>, usize) {
        let mut found = None;
        let mut checked = 0;
        for (index, line) in self.lines.iter().enumerate() {
            let ZoneLine::Record {
                parsed: Some(parsed),
                ..
            } = line
            else {
                continue;
            };
            if !parsed
                .record_type
                .eq_ignore_ascii_case(matcher.record_type.as_str())
            {
                continue;
            }
            checked += 1;
            debug!(
                "Line {}: name='{}', type='{}', value='{}'",
                index + 1,
                parsed.name,
                parsed.record_type,
                parsed.value
            );
            if found.is_none() && matcher.matches(parsed) {
                found = Some(index);
            }
        }
        (found, checked)
    }

    /// Replace the first record line matching `matcher` with `new_line`.
    ///
    /// Indented records that inherited the old line's owner keep it.
    pub fn replace_first(&mut self, matcher: &RecordMatcher<'_>, new_line: String) -> MatchOutcome {
        let (found, checked) = self.scan(matcher);
        if let Some(index) = found {
            debug!("Record found at line {}: {}", index + 1, self.lines[index].raw());
            let follower = self.next_inheriting(index + 1);
            self.lines[index] = ZoneLine::record(new_line);
            self.restore_owner(follower);
        }
        MatchOutcome {
            found: found.is_some(),
            checked,
        }
    }

    /// Remove the first record line matching `matcher`.
    ///
    /// Indented records that inherited the removed line's owner keep it.
    pub fn remove_first(&mut self, matcher: &RecordMatcher<'_>) -> MatchOutcome {
        let (found, checked) = self.scan(matcher);
        if let Some(index) = found {
            let follower = self.next_inheriting(index + 1);
            let removed = self.lines.remove(index);
            debug!("Record found and removed at line {}: {}", index + 1, removed.raw());
            self.restore_owner(follower.map(|(i, owner)| (i - 1, owner)));
        }
        MatchOutcome {
            found: found.is_some(),
            checked,
        }
    }

    /// First record at or after `from` that takes its owner from an earlier line,
    /// with that owner. Blank and comment lines are skipped.
    fn next_inheriting(&self, from: usize) -> Option<(usize, String)> {
        for (index, line) in self.lines.iter().enumerate().skip(from) {
            match line {
                ZoneLine::Blank(_) | ZoneLine::Comment(_) => {}
                ZoneLine::Record {
                    raw,
                    parsed: Some(parsed),
                } if raw.starts_with(char::is_whitespace) => {
                    return Some((index, parsed.name.clone()));
                }
                _ => return None,
            }
        }
        None
    }

    /// Owner an indented line at `index` inherits: the first token of the closest
    /// record line above it that starts in column one.
    fn owner_before(&self, index: usize) -> Option<&str> {
        self.lines[..index].iter().rev().find_map(|line| match line {
            ZoneLine::Record { raw, .. } if !raw.starts_with(char::is_whitespace) => {
                raw.split_whitespace().next()
            }
            _ => None,
        })
    }

    /// Write `owner` onto the indented line at `index` unless it still inherits it.
    fn restore_owner(&mut self, follower: Option<(usize, String)>) {
        let Some((index, owner)) = follower else {
            return;
        };
        if self.owner_before(index) == Some(owner.as_str()) {
            return;
        }
        debug!("Writing owner '{owner}' onto line {}", index + 1);
        let line = format!("{owner}{}", self.lines[index].raw());
        self.lines[index] = ZoneLine::record(line);
    }

    /// Increment the SOA serial by one (wrapping at `u32::MAX`).
    ///
    /// The SOA record is tokenized across lines, with parentheses and comments
    /// removed; the serial is the third field after the `SOA` keyword. Only the
    /// serial's digits are rewritten. Returns the old and new serial, or `None`
    /// (with a warning) when the file has no parseable SOA record.
    pub fn bump_serial(&mut self) -> Option<(u32, u32)> {
        let Some((line_index, range)) = self.locate_serial() else {
            warn!("No parseable SOA serial found, leaving serial unchanged");
            return None;
        };

        let raw = self.lines[line_index].raw();
        let old_text = &raw[range.clone()];
        let Ok(old) = old_text.parse::<u32>() else {
            warn!("SOA serial '{old_text}' is not a 32-bit number, leaving serial unchanged");
            return None;
        };
        let new = old.wrapping_add(1);

        let mut updated = raw.to_string();
        updated.replace_range(range, &new.to_string());
        debug!("SOA serial {old} -> {new} at line {}", line_index + 1);

        let replacement = match &self.lines[line_index] {
            ZoneLine::Record { parsed: None, .. } => ZoneLine::Record {
                raw: updated,
                parsed: None,
            },
            _ => ZoneLine::record(updated),
        };
        self.lines[line_index] = replacement;
        Some((old, new))
    }

    /// Find the line and byte range holding the SOA serial.
    fn locate_serial(&self) -> Option<(usize, std::ops::Range<usize>)> {
        let soa_line = self.lines.iter().position(|line| {
            matches!(line, ZoneLine::Record { .. })
                && tokens(strip_comment(line.raw()))
                    .iter()
                    .any(|(_, t)| t.eq_ignore_ascii_case("SOA"))
        })?;

        // Fields after SOA: mname, rname, serial
        let mut after_soa: Option<usize> = None;
        for (index, line) in self.lines.iter().enumerate().skip(soa_line) {
            if index > soa_line && !matches!(line, ZoneLine::Record { .. }) {
                if matches!(line, ZoneLine::Blank(_) | ZoneLine::Comment(_)) {
                    continue;
                }
                return None;
            }
            for (start, token) in tokens(strip_comment(line.raw())) {
                match after_soa {
                    None if token.eq_ignore_ascii_case("SOA") => after_soa = Some(0),
                    None => {}
                    Some(2) => return Some((index, start..start + token.len())),
                    Some(n) => after_soa = Some(n + 1),
                }
            }
        }
        None
    }
}

/// Text before the first `;` that is not inside a quoted string.
fn strip_comment(line: &str) -> &str {
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Tokens separated by whitespace and parentheses, with their byte offsets.
fn tokens(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() || c == '(' || c == ')' {
            if let Some(s) = start.take() {
                out.push((s, &text[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &text[s..]));
    }
    out
}

fn paren_balance(text: &str) -> (usize, usize) {
    let mut in_quotes = false;
    let (mut opens, mut closes) = (0, 0);
    for c in text.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => opens += 1,
            ')' if !in_quotes => closes += 1,
            _ => {}
        }
    }
    (opens, closes)
}

#[cfg(test)]
#[path = "zonefile_tests.rs"]
mod zonefile_tests;
