// file: src/security/pgpass.rs
// version: 1.0.0
// guid: 8a3f6c19-d2e4-4b70-91c5-e7b08d4f2a63

//! PostgreSQL password file (`host:port:database:username:password`)
//!
//! `:` and `\` inside a field are escaped with a backslash. Managed entries
//! are keyed by everything but the password, so merging replaces a stale
//! password in place and never adds a second line for the same key.

use std::collections::HashSet;

/// One line of a password file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgPassEntry {
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl PgPassEntry {
    pub fn new(
        host: impl Into<String>,
        port: impl ToString,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.to_string(),
            database: database.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Identity of the entry
    pub fn key(&self) -> (&str, &str, &str, &str) {
        (&self.host, &self.port, &self.database, &self.username)
    }

    /// Parse a line; comments, blank lines and malformed lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            return None;
        }
        let mut fields = split_fields(trimmed);
        if fields.len() != 5 {
            return None;
        }
        let password = fields.pop()?;
        let username = fields.pop()?;
        let database = fields.pop()?;
        let port = fields.pop()?;
        let host = fields.pop()?;
        Some(Self {
            host,
            port,
            database,
            username,
            password,
        })
    }

    pub fn render(&self) -> String {
        [
            &self.host,
            &self.port,
            &self.database,
            &self.username,
            &self.password,
        ]
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(":")
    }
}

fn escape(field: &str) -> String {
    field.replace('\\', "\\\\").replace(':', "\\:")
}

fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Find the password recorded for a key
pub fn lookup(text: &str, host: &str, port: &str, database: &str, username: &str) -> Option<String> {
    text.lines()
        .filter_map(PgPassEntry::parse)
        .find(|e| e.key() == (host, port, database, username))
        .map(|e| e.password)
}

/// Merge managed entries into existing file content
///
/// The first line for a managed key is replaced in place, later lines for
/// the same key are dropped, and managed keys not yet present are appended.
/// Every other line is kept verbatim.
pub fn merge(existing: &str, managed: &[PgPassEntry]) -> String {
    let mut emitted: HashSet<(String, String, String, String)> = HashSet::new();
    let mut lines: Vec<String> = Vec::new();

    for line in existing.lines() {
        let replacement = PgPassEntry::parse(line)
            .and_then(|parsed| managed.iter().find(|m| m.key() == parsed.key()));
        match replacement {
            Some(entry) => {
                if emitted.insert(owned_key(entry)) {
                    lines.push(entry.render());
                }
            }
            None => lines.push(line.to_string()),
        }
    }

    for entry in managed {
        if emitted.insert(owned_key(entry)) {
            lines.push(entry.render());
        }
    }

    let mut merged = lines.join("\n");
    merged.push('\n');
    merged
}

fn owned_key(entry: &PgPassEntry) -> (String, String, String, String) {
    let (h, p, d, u) = entry.key();
    (h.to_string(), p.to_string(), d.to_string(), u.to_string())
}
