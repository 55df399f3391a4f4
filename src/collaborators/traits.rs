//! Trait abstractions for the engine's external collaborators.
//!
//! The governance core never moves tokens, reads a wall clock, or decides who
//! the guardian is on its own. Each concern sits behind a trait so hosts can
//! plug in a real chain client and tests can use the in-memory versions in
//! [`super::mock`].

use crate::governance::types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Time source. Read once per command by the host; the engine itself only
/// ever sees the resulting `now`.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// One token movement requested by the bond ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    /// Move `amount` from `account` into the bond vault.
    Deposit { account: Address, amount: Amount },
    /// Move `amount` out of the bond vault to `to`.
    Refund { to: Address, amount: Amount },
    /// Destroy `amount` held by the vault, reducing total supply.
    Burn { amount: Amount },
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Account {account} holds {available}, needs {required}")]
    InsufficientBalance {
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Bond vault holds {available}, needs {required}")]
    VaultUnderflow { required: Amount, available: Amount },

    #[error("Ledger rejected batch: {0}")]
    Rejected(String),
}

/// Token ledger holding the bond vault.
pub trait Ledger: Send {
    /// Spendable balance of an account.
    fn balance_of(&self, account: &Address) -> Amount;

    /// Tokens currently held by the bond vault.
    fn vault_balance(&self) -> Amount;

    /// Total token supply (decreases on burn).
    fn total_supply(&self) -> Amount;

    /// Apply a batch of operations in order.
    ///
    /// Must be all-or-nothing: if any operation fails, no operation in the
    /// batch may remain applied.
    fn commit(&mut self, ops: &[LedgerOp]) -> LedgerResult<()>;
}

/// Role of a calling address as seen by the surrounding protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorRole {
    /// Temporary protocol guardian (bootstrap powers).
    Guardian,
    /// A registered node; may be invited, auto-join, or pay to challenge.
    RegisteredNode,
    /// Anyone else.
    Unregistered,
}

/// Resolves caller roles. Trusted membership itself is tracked by the
/// governance registry, not here.
pub trait ActorAuthority: Send {
    fn role(&self, address: &Address) -> ActorRole;

    fn is_guardian(&self, address: &Address) -> bool {
        self.role(address) == ActorRole::Guardian
    }

    fn is_registered_node(&self, address: &Address) -> bool {
        self.role(address) == ActorRole::RegisteredNode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OnlyGuardian(Address);

    impl ActorAuthority for OnlyGuardian {
        fn role(&self, address: &Address) -> ActorRole {
            if *address == self.0 {
                ActorRole::Guardian
            } else {
                ActorRole::Unregistered
            }
        }
    }

    #[test]
    fn test_default_role_helpers() {
        let guardian = Address::from_label("guardian");
        let authority = OnlyGuardian(guardian);
        assert!(authority.is_guardian(&guardian));
        assert!(!authority.is_registered_node(&guardian));
        assert!(!authority.is_guardian(&Address::from_label("someone")));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[test]
    fn test_ledger_error_display() {
        let err = LedgerError::VaultUnderflow {
            required: 5,
            available: 1,
        };
        assert_eq!(err.to_string(), "Bond vault holds 1, needs 5");
    }

    #[test]
    fn test_ledger_op_serialization() {
        let op = LedgerOp::Refund {
            to: Address::from_label("member"),
            amount: 10,
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: LedgerOp = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
