//! Replication summary line parsing.
//!
//! Directory servers expose replication state through monitor attributes
//! whose values are single lines of `key="value"` pairs, one line per
//! replica or replication server:
//!
//! ```text
//! replica-id="12345" ldap-server="ds1.example.com:389" connected-to="rs1.example.com:8989" generation-id="5721980" replication-backlog="0" age-of-oldest-missing-change="N/A" failed-replay-count="0"
//! ```
//!
//! Lines come from servers of many versions, so parsing is best-effort:
//! a missing or unparsable field is `None`, never an error.

use std::fmt;
use std::time::Duration;

/// Extract the value for `key` from a summary line.
///
/// Accepts `key="quoted value"` and bare `key=value` (terminated by
/// whitespace). Key matching is on a word boundary so `replica-id` never
/// matches inside `conflicting-replica-id`.
///
/// # Examples
///
/// ```
/// use async_ldap::summary::element_value;
///
/// let line = r#"server-id="101" server="rs1.example.com:8989" generation-id="5721980""#;
/// assert_eq!(element_value(line, "server-id"), Some("101"));
/// assert_eq!(element_value(line, "server"), Some("rs1.example.com:8989"));
/// assert_eq!(element_value(line, "missing"), None);
/// ```
pub fn element_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let mut search_from = 0;
    loop {
        let found = line[search_from..].find(key)?;
        let start = search_from + found;

        // Word boundary on the left: start of line or whitespace
        let at_boundary = start == 0
            || line[..start]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_whitespace());
        let after_key = start + key.len();

        if at_boundary && line[after_key..].starts_with('=') {
            let rest = &line[after_key + 1..];
            return Some(if let Some(quoted) = rest.strip_prefix('"') {
                match quoted.find('"') {
                    Some(end) => &quoted[..end],
                    // Unterminated quote: take the remainder
                    None => quoted,
                }
            } else {
                match rest.find(char::is_whitespace) {
                    Some(end) => &rest[..end],
                    None => rest,
                }
            });
        }

        search_from = after_key;
        if search_from >= line.len() {
            return None;
        }
    }
}

fn element_u64(line: &str, key: &str) -> Option<u64> {
    element_value(line, key).and_then(|v| v.parse().ok())
}

/// Parsed `replica-summary` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSummary {
    /// Replica identifier.
    pub replica_id: Option<String>,
    /// Address of the directory server holding the replica.
    pub ldap_server: Option<String>,
    /// Address of the replication server the replica is connected to.
    pub connected_to: Option<String>,
    /// Generation ID of the replicated data.
    pub generation_id: Option<String>,
    /// Number of changes not yet replayed.
    pub replication_backlog: Option<u64>,
    /// Age of the oldest missing change; `None` when the server reports
    /// `N/A` or nothing.
    pub age_of_oldest_missing_change: Option<Duration>,
    /// Number of changes that failed to replay.
    pub failed_replay_count: Option<u64>,
    raw: String,
}

impl ReplicaSummary {
    /// Parse a replica summary line.
    pub fn parse(line: &str) -> Self {
        Self {
            replica_id: element_value(line, "replica-id").map(str::to_owned),
            ldap_server: element_value(line, "ldap-server").map(str::to_owned),
            connected_to: element_value(line, "connected-to").map(str::to_owned),
            generation_id: element_value(line, "generation-id").map(str::to_owned),
            replication_backlog: element_u64(line, "replication-backlog")
                // Older servers call the same number "missing-changes"
                .or_else(|| element_u64(line, "missing-changes")),
            age_of_oldest_missing_change: element_u64(line, "age-of-oldest-missing-change")
                .map(Duration::from_millis),
            failed_replay_count: element_u64(line, "failed-replay-count"),
            raw: line.to_owned(),
        }
    }

    /// The unparsed line.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ReplicaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Parsed `replication-server-summary` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicationServerSummary {
    /// Replication server identifier.
    pub server_id: Option<String>,
    /// Replication server address (`host:port`).
    pub server: Option<String>,
    /// Generation ID of the replicated data.
    pub generation_id: Option<String>,
    raw: String,
}

impl ReplicationServerSummary {
    /// Parse a replication server summary line.
    pub fn parse(line: &str) -> Self {
        Self {
            server_id: element_value(line, "server-id").map(str::to_owned),
            server: element_value(line, "server").map(str::to_owned),
            generation_id: element_value(line, "generation-id").map(str::to_owned),
            raw: line.to_owned(),
        }
    }

    /// The unparsed line.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ReplicationServerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
