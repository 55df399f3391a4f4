//! Trusted member registry.
//!
//! - Members are keyed by address and never removed; history is kept so a
//!   kicked address stays banned
//! - `invite` → `join` is the normal admission path, `auto_join` skips the
//!   invite while the registry is below its minimum size
//! - Leaving takes two steps: an executed Leave proposal approves it, then the
//!   member calls `leave` within the leave window
//! - Bond movements go through the [`BondJournal`]

use super::bond::BondJournal;
use super::error::{GovernanceError, GovernanceResult};
use super::types::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A trusted member record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: Address,
    pub label: String,
    pub url: String,
    /// When the member last joined. Zero until the first join.
    pub joined_at: Timestamp,
    /// Bond currently held in the vault for this member.
    #[serde(with = "crate::serialization::amount_string")]
    pub bond_amount: Amount,
    pub is_valid: bool,
    pub is_invited: bool,
    /// Set on kick. A kicked address can never be invited or join again.
    #[serde(default)]
    pub kicked: bool,
    /// Set when a Leave proposal for this member executes.
    #[serde(default)]
    pub leave_approved_at: Option<Timestamp>,
}

impl Member {
    /// A fresh, invited (not yet joined) member record.
    pub fn invited(address: Address, label: String, url: String) -> Self {
        Self {
            address,
            label,
            url,
            joined_at: 0,
            bond_amount: 0,
            is_valid: false,
            is_invited: true,
            kicked: false,
            leave_approved_at: None,
        }
    }
}

/// The set of trusted members.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRegistry {
    members: BTreeMap<Address, Member>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, address: &Address) -> Option<&Member> {
        self.members.get(address)
    }

    pub fn is_valid(&self, address: &Address) -> bool {
        self.members.get(address).is_some_and(|m| m.is_valid)
    }

    /// Number of currently valid members.
    pub fn valid_count(&self) -> u64 {
        self.valid_members().count() as u64
    }

    pub fn valid_members(&self) -> impl Iterator<Item = &Member> {
        self.members.values().filter(|m| m.is_valid)
    }

    /// Every member record ever created, valid or not.
    pub fn all(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Sum of all recorded bonds.
    pub fn total_bonded(&self) -> Amount {
        self.all().map(|m| m.bond_amount).sum()
    }

    /// True while the registry is below its minimum size.
    pub fn is_low_member_mode(&self, min_members: u64) -> bool {
        self.valid_count() < min_members
    }

    fn ensure_min_after_removal(&self, min_members: u64) -> GovernanceResult<()> {
        if self.valid_count().saturating_sub(1) < min_members {
            return Err(GovernanceError::InvariantViolation(format!(
                "Member count will fall below min required ({})",
                min_members
            )));
        }
        Ok(())
    }

    /// Mark `address` as invited, creating the record if needed.
    pub fn invite(&mut self, address: Address, label: &str, url: &str) -> GovernanceResult<()> {
        if address.is_zero() {
            return Err(GovernanceError::InvalidTarget(
                "Cannot invite the zero address".to_string(),
            ));
        }

        match self.members.get_mut(&address) {
            Some(existing) if existing.is_valid => Err(GovernanceError::Duplicate(format!(
                "{} is already a trusted member",
                address
            ))),
            Some(existing) if existing.kicked => Err(GovernanceError::PermanentlyBanned(address)),
            Some(existing) => {
                existing.label = label.to_string();
                existing.url = url.to_string();
                existing.is_invited = true;
                Ok(())
            }
            None => {
                self.members.insert(
                    address,
                    Member::invited(address, label.to_string(), url.to_string()),
                );
                Ok(())
            }
        }
    }

    /// Admit an invited address, depositing its bond.
    pub fn join(
        &mut self,
        address: Address,
        bond_amount: Amount,
        now: Timestamp,
        journal: &mut BondJournal,
    ) -> GovernanceResult<()> {
        let member = self
            .members
            .get_mut(&address)
            .ok_or(GovernanceError::NotInvited(address))?;

        if member.kicked {
            return Err(GovernanceError::PermanentlyBanned(address));
        }
        if member.is_valid {
            return Err(GovernanceError::Duplicate(format!(
                "{} is already a trusted member",
                address
            )));
        }
        if !member.is_invited {
            return Err(GovernanceError::NotInvited(address));
        }

        admit(member, bond_amount, now, journal)
    }

    /// Admit a registered node without an invite while in low member mode.
    #[allow(clippy::too_many_arguments)]
    pub fn auto_join(
        &mut self,
        address: Address,
        label: &str,
        url: &str,
        bond_amount: Amount,
        min_members: u64,
        now: Timestamp,
        journal: &mut BondJournal,
    ) -> GovernanceResult<()> {
        if !self.is_low_member_mode(min_members) {
            return Err(GovernanceError::InvalidState(
                "Low member mode not engaged".to_string(),
            ));
        }

        let member = self
            .members
            .entry(address)
            .or_insert_with(|| Member::invited(address, label.to_string(), url.to_string()));

        if member.is_valid {
            return Err(GovernanceError::Duplicate(format!(
                "{} is already a trusted member",
                address
            )));
        }
        if member.kicked {
            return Err(GovernanceError::PermanentlyBanned(address));
        }

        member.label = label.to_string();
        member.url = url.to_string();
        admit(member, bond_amount, now, journal)
    }

    /// Record that a Leave proposal for `address` passed.
    pub fn approve_leave(
        &mut self,
        address: &Address,
        min_members: u64,
        now: Timestamp,
    ) -> GovernanceResult<()> {
        if !self.is_valid(address) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{} is not a trusted member",
                address
            )));
        }
        self.ensure_min_after_removal(min_members)?;

        if let Some(member) = self.members.get_mut(address) {
            member.leave_approved_at = Some(now);
        }
        Ok(())
    }

    /// Leave after an approved Leave proposal, refunding the whole bond to `refund_to`.
    pub fn leave(
        &mut self,
        address: &Address,
        refund_to: Address,
        min_members: u64,
        leave_window: u64,
        now: Timestamp,
        journal: &mut BondJournal,
    ) -> GovernanceResult<()> {
        if !self.is_valid(address) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} is not a trusted member",
                address
            )));
        }
        if refund_to.is_zero() {
            return Err(GovernanceError::InvalidTarget(
                "Refund address cannot be the zero address".to_string(),
            ));
        }

        let approved_at = self
            .members
            .get(address)
            .and_then(|m| m.leave_approved_at)
            .ok_or_else(|| {
                GovernanceError::InvalidState(
                    "Member has not been approved to leave".to_string(),
                )
            })?;
        if now >= approved_at.saturating_add(leave_window) {
            return Err(GovernanceError::InvalidState(
                "Leave approval has expired".to_string(),
            ));
        }

        self.ensure_min_after_removal(min_members)?;

        let member = self
            .members
            .get_mut(address)
            .ok_or_else(|| GovernanceError::InvalidTarget(address.to_string()))?;
        let bond = member.bond_amount;
        journal.refund(member, bond, refund_to)?;
        member.is_valid = false;
        member.is_invited = false;
        member.leave_approved_at = None;
        Ok(())
    }

    /// Remove a member, burning `fine` from its bond and refunding the rest.
    ///
    /// `enforce_minimum` is set on the proposal path; liveness kicks skip it.
    pub fn kick(
        &mut self,
        address: &Address,
        fine: Amount,
        enforce_minimum: bool,
        min_members: u64,
        journal: &mut BondJournal,
    ) -> GovernanceResult<Amount> {
        if !self.is_valid(address) {
            return Err(GovernanceError::InvalidTarget(format!(
                "{} is not a trusted member",
                address
            )));
        }
        if enforce_minimum {
            self.ensure_min_after_removal(min_members)?;
        }

        let member = self
            .members
            .get_mut(address)
            .ok_or_else(|| GovernanceError::InvalidTarget(address.to_string()))?;
        if fine > member.bond_amount {
            return Err(GovernanceError::InvalidTarget(format!(
                "Fine {} exceeds bond {} of {}",
                fine, member.bond_amount, address
            )));
        }

        let refund_to = member.address;
        journal.fine(member, fine)?;
        let remainder = member.bond_amount;
        journal.refund(member, remainder, refund_to)?;
        member.is_valid = false;
        member.is_invited = false;
        member.kicked = true;
        member.leave_approved_at = None;
        Ok(remainder)
    }
}

fn admit(
    member: &mut Member,
    bond_amount: Amount,
    now: Timestamp,
    journal: &mut BondJournal,
) -> GovernanceResult<()> {
    journal.deposit(member, bond_amount)?;
    member.is_valid = true;
    member.is_invited = false;
    member.joined_at = now;
    member.leave_approved_at = None;
    Ok(())
}
