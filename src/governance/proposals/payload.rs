//! Proposal payloads.
//!
//! A payload is only interpreted when its proposal executes.

use crate::governance::contracts::ContractUpgrade;
use crate::governance::types::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a proposal does when executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Invite a registered node to join.
    Invite {
        label: String,
        url: String,
        address: Address,
    },
    /// Approve a member's request to leave.
    Leave { address: Address },
    /// Remove a member, burning `fine` from its bond.
    Kick {
        address: Address,
        #[serde(with = "crate::serialization::amount_string")]
        fine: Amount,
    },
    /// Change one governance setting.
    SettingChange { key: String, value: String },
    /// Change the contract registry.
    Upgrade { upgrade: ContractUpgrade },
}

impl Payload {
    /// Short kind name for logs and the audit trail.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Invite { .. } => "invite",
            Payload::Leave { .. } => "leave",
            Payload::Kick { .. } => "kick",
            Payload::SettingChange { .. } => "setting_change",
            Payload::Upgrade { .. } => "upgrade",
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Invite { label, address, .. } => write!(f, "invite {} ({})", label, address),
            Payload::Leave { address } => write!(f, "leave {}", address),
            Payload::Kick { address, fine } => write!(f, "kick {} with fine {}", address, fine),
            Payload::SettingChange { key, value } => write!(f, "set {} = {}", key, value),
            Payload::Upgrade { upgrade } => {
                write!(f, "{:?} {}", upgrade.kind, upgrade.name)
            }
        }
    }
}
