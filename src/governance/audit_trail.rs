//! Governance audit trail.
//!
//! - Append-only: one entry per committed command, never edited or removed
//! - Timestamps are the command's `now`, so replaying a log reproduces the trail
//! - Kept inside the governance state and rolled back with it on failure

use super::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of committed governance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Propose,
    Vote,
    Execute,
    Cancel,
    Join,
    Leave,
    AutoJoin,
    ChallengeMake,
    ChallengeDecide,
    /// Guardian action while bootstrap mode is enabled.
    Bootstrap,
}

impl AuditAction {
    pub fn display_name(&self) -> &'static str {
        match self {
            AuditAction::Propose => "Propose",
            AuditAction::Vote => "Vote",
            AuditAction::Execute => "Execute",
            AuditAction::Cancel => "Cancel",
            AuditAction::Join => "Join",
            AuditAction::Leave => "Leave",
            AuditAction::AutoJoin => "Auto-join",
            AuditAction::ChallengeMake => "Challenge",
            AuditAction::ChallengeDecide => "Challenge Decided",
            AuditAction::Bootstrap => "Bootstrap",
        }
    }
}

/// Single audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: Timestamp,
    pub actor: Address,
    pub action: AuditAction,
    /// Human-readable summary of what changed.
    pub details: String,
}

impl AuditEntry {
    pub fn new(timestamp: Timestamp, actor: Address, action: AuditAction, details: String) -> Self {
        Self {
            timestamp,
            actor,
            action,
            details,
        }
    }

    /// Age of the entry relative to `now`, e.g. "2h 5m ago".
    ///
    /// Entries older than a week, or from the future, show the raw timestamp.
    pub fn age_display(&self, now: Timestamp) -> String {
        if now < self.timestamp {
            return format!("Unix: {}", self.timestamp);
        }

        match now - self.timestamp {
            0..=60 => "Just now".to_string(),
            elapsed @ 61..=604_800 => {
                // Drop seconds for readability
                let rounded = elapsed - elapsed % 60;
                format!(
                    "{} ago",
                    humantime::format_duration(Duration::from_secs(rounded))
                )
            }
            _ => format!("Unix: {}", self.timestamp),
        }
    }
}

/// Query options for the audit log.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    pub actor: Option<Address>,
    /// Maximum number of results (most recent first).
    pub limit: Option<usize>,
    /// Only entries strictly after this timestamp.
    pub after_timestamp: Option<Timestamp>,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            action: None,
            actor: None,
            limit: Some(50),
            after_timestamp: None,
        }
    }
}

/// Query the audit log. Results are newest first; entries with equal
/// timestamps keep reverse insertion order.
pub fn query_audit_log(entries: &[AuditEntry], query: &AuditQuery) -> Vec<AuditEntry> {
    let mut filtered: Vec<AuditEntry> = entries
        .iter()
        .rev()
        .filter(|entry| {
            if let Some(action) = query.action {
                if entry.action != action {
                    return false;
                }
            }

            if let Some(ref actor) = query.actor {
                if &entry.actor != actor {
                    return false;
                }
            }

            if let Some(after_ts) = query.after_timestamp {
                if entry.timestamp <= after_ts {
                    return false;
                }
            }

            true
        })
        .cloned()
        .collect();

    filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    if let Some(limit) = query.limit {
        filtered.truncate(limit);
    }

    filtered
}

/// Render entries for terminal output.
pub fn format_audit_log(entries: &[AuditEntry], now: Timestamp) -> String {
    if entries.is_empty() {
        return "No audit entries found.".to_string();
    }

    let mut output = String::from("Governance Audit Trail\n\n");

    for entry in entries {
        output.push_str(&format!(
            "* {} - {} ({})\n  {}\n\n",
            entry.age_display(now),
            entry.action.display_name(),
            entry.actor.short(),
            entry.details
        ));
    }

    output.trim_end().to_string()
}
