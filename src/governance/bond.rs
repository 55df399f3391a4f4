//! Bond accounting.
//!
//! Member bonds are recorded on each [`Member`] and the tokens themselves sit
//! in the external ledger's bond vault. The [`BondJournal`] updates the
//! recorded bond and, in the same step, queues the matching [`LedgerOp`]. The
//! engine hands the queued operations to the ledger only once the whole
//! command has succeeded.
//!
//! Invariant: the sum of all recorded bonds equals the vault balance.

use super::error::{GovernanceError, GovernanceResult, InvariantCorruption};
use super::membership::Member;
use super::types::{Address, Amount};
use crate::collaborators::LedgerOp;

/// Pending ledger operations for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BondJournal {
    ops: Vec<LedgerOp>,
}

impl BondJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `amount` from the member's own account into the vault.
    pub fn deposit(&mut self, member: &mut Member, amount: Amount) -> GovernanceResult<()> {
        member.bond_amount = member.bond_amount.checked_add(amount).ok_or_else(|| {
            GovernanceError::InvalidTarget(format!("Bond overflow for {}", member.address))
        })?;
        if amount > 0 {
            self.ops.push(LedgerOp::Deposit {
                account: member.address,
                amount,
            });
        }
        Ok(())
    }

    /// Return `amount` of the member's bond to `to`.
    pub fn refund(
        &mut self,
        member: &mut Member,
        amount: Amount,
        to: Address,
    ) -> GovernanceResult<()> {
        member.bond_amount = member.bond_amount.checked_sub(amount).ok_or_else(|| {
            GovernanceError::InvalidTarget(format!(
                "Refund of {} exceeds bond of {} held for {}",
                amount, member.bond_amount, member.address
            ))
        })?;
        if amount > 0 {
            self.ops.push(LedgerOp::Refund { to, amount });
        }
        Ok(())
    }

    /// Burn `amount` of the member's bond.
    pub fn fine(&mut self, member: &mut Member, amount: Amount) -> GovernanceResult<()> {
        member.bond_amount = member.bond_amount.checked_sub(amount).ok_or_else(|| {
            GovernanceError::InvalidTarget(format!(
                "Fine of {} exceeds bond of {} held for {}",
                amount, member.bond_amount, member.address
            ))
        })?;
        if amount > 0 {
            self.ops.push(LedgerOp::Burn { amount });
        }
        Ok(())
    }

    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Net change to the vault if every queued operation is applied.
    pub fn vault_delta(&self) -> i128 {
        self.ops
            .iter()
            .map(|op| match op {
                LedgerOp::Deposit { amount, .. } => *amount as i128,
                LedgerOp::Refund { amount, .. } | LedgerOp::Burn { amount } => -(*amount as i128),
            })
            .sum()
    }
}

/// Check that recorded bonds match what the vault actually holds.
pub fn verify_bond_invariant(recorded: Amount, vault: Amount) -> Result<(), InvariantCorruption> {
    if recorded != vault {
        return Err(InvariantCorruption { recorded, vault });
    }
    Ok(())
}
