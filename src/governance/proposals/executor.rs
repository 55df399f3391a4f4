//! Proposal execution logic.
//!
//! Applies a passed proposal's payload to the working copy of the governance
//! state. Any error aborts the whole command, so a payload that fails here
//! leaves the proposal Succeeded and retryable.

use super::payload::Payload;
use crate::collaborators::ActorAuthority;
use crate::governance::bond::BondJournal;
use crate::governance::error::{GovernanceError, GovernanceResult};
use crate::governance::state::GovernanceState;
use crate::governance::types::Timestamp;

/// Apply `payload` to `state`. Returns a one-line summary for the audit trail.
pub fn execute_payload<A: ActorAuthority + ?Sized>(
    state: &mut GovernanceState,
    journal: &mut BondJournal,
    authority: &A,
    payload: &Payload,
    now: Timestamp,
) -> GovernanceResult<String> {
    match payload {
        Payload::Invite {
            label,
            url,
            address,
        } => {
            if !authority.is_registered_node(address) {
                return Err(GovernanceError::InvalidTarget(format!(
                    "Invalid node: {} is not a registered node",
                    address
                )));
            }
            state.members.invite(*address, label, url)?;
            Ok(format!("Invited {} ({})", label, address))
        }
        Payload::Leave { address } => {
            state
                .members
                .approve_leave(address, state.settings.min_members, now)?;
            Ok(format!("Approved leave for {}", address))
        }
        Payload::Kick { address, fine } => {
            let min_members = state.settings.min_members;
            let refunded = state.members.kick(address, *fine, true, min_members, journal)?;
            // Kicked members cannot answer a challenge
            if state.challenges.is_challenged(address) {
                state.challenges.close(address)?;
            }
            Ok(format!(
                "Kicked {}: burned {}, refunded {}",
                address, fine, refunded
            ))
        }
        Payload::SettingChange { key, value } => {
            state.settings = state.settings.apply_change(key, value)?;
            Ok(format!("Set {} = {}", key, value))
        }
        Payload::Upgrade { upgrade } => {
            state.contracts.apply(upgrade)?;
            Ok(format!("{:?} {}", upgrade.kind, upgrade.name))
        }
    }
}
