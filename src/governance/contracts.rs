//! Network contract registry.
//!
//! Trusted members (or the guardian during bootstrap) can point a contract
//! name at a new address or replace its ABI. The registry only stores names,
//! addresses and SHA-256 digests of ABI text; resolving and calling the
//! contracts is left to the host.

use super::error::{GovernanceError, GovernanceResult};
use super::types::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Names that can never be upgraded in place.
pub const PROTECTED_CONTRACTS: &[&str] = &["vault", "storage"];

/// Kind of registry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Replace the address (and ABI) of an existing contract.
    UpgradeContract,
    /// Register a new contract name.
    AddContract,
    /// Replace the ABI of an existing entry.
    UpgradeAbi,
    /// Register an ABI under a new name (no address).
    AddAbi,
}

/// A requested registry change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractUpgrade {
    pub kind: UpgradeKind,
    pub name: String,
    #[serde(default = "zero_address")]
    pub address: Address,
    pub abi: String,
}

fn zero_address() -> Address {
    Address::ZERO
}

/// A registered contract or ABI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    pub address: Option<Address>,
    pub abi_hash: Option<String>,
}

/// Hex SHA-256 of ABI text.
pub fn abi_hash(abi: &str) -> String {
    hex::encode(Sha256::digest(abi.as_bytes()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRegistry {
    entries: BTreeMap<String, ContractEntry>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ContractEntry> {
        self.entries.get(name)
    }

    fn address_in_use(&self, address: &Address) -> bool {
        self.entries
            .values()
            .any(|entry| entry.address.as_ref() == Some(address))
    }

    /// Validate and apply an upgrade.
    pub fn apply(&mut self, upgrade: &ContractUpgrade) -> GovernanceResult<()> {
        let name = upgrade.name.trim();
        if name.is_empty() {
            return Err(GovernanceError::InvalidTarget(
                "Invalid contract name".to_string(),
            ));
        }
        if upgrade.abi.trim().is_empty() {
            return Err(GovernanceError::InvalidTarget("Empty ABI is invalid".to_string()));
        }
        let hash = abi_hash(&upgrade.abi);

        match upgrade.kind {
            UpgradeKind::UpgradeContract | UpgradeKind::AddContract => {
                self.check_new_address(&upgrade.address)?;

                let existing = self.entries.get(name);
                if upgrade.kind == UpgradeKind::UpgradeContract {
                    if PROTECTED_CONTRACTS.contains(&name) {
                        return Err(GovernanceError::InvalidTarget(format!(
                            "Cannot upgrade the {} contract",
                            name
                        )));
                    }
                    if existing.and_then(|e| e.address).is_none() {
                        return Err(GovernanceError::InvalidTarget(format!(
                            "Contract {} does not exist",
                            name
                        )));
                    }
                } else if existing.is_some() {
                    return Err(GovernanceError::Duplicate(format!(
                        "Contract name {} is already in use",
                        name
                    )));
                }

                self.entries.insert(
                    name.to_string(),
                    ContractEntry {
                        address: Some(upgrade.address),
                        abi_hash: Some(hash),
                    },
                );
            }
            UpgradeKind::UpgradeAbi => {
                let entry = self
                    .entries
                    .get_mut(name)
                    .filter(|e| e.abi_hash.is_some())
                    .ok_or_else(|| {
                        GovernanceError::InvalidTarget(format!("ABI {} does not exist", name))
                    })?;
                if entry.abi_hash.as_deref() == Some(hash.as_str()) {
                    return Err(GovernanceError::Duplicate(format!(
                        "ABI for {} is identical to the current one",
                        name
                    )));
                }
                entry.abi_hash = Some(hash);
            }
            UpgradeKind::AddAbi => {
                if self.entries.get(name).is_some_and(|e| e.abi_hash.is_some()) {
                    return Err(GovernanceError::Duplicate(format!(
                        "ABI name {} is already in use",
                        name
                    )));
                }
                self.entries
                    .entry(name.to_string())
                    .or_insert(ContractEntry {
                        address: None,
                        abi_hash: None,
                    })
                    .abi_hash = Some(hash);
            }
        }

        Ok(())
    }

    fn check_new_address(&self, address: &Address) -> GovernanceResult<()> {
        if address.is_zero() {
            return Err(GovernanceError::InvalidTarget(
                "Invalid contract address".to_string(),
            ));
        }
        if self.address_in_use(address) {
            return Err(GovernanceError::Duplicate(format!(
                "Contract address {} is already in use",
                address
            )));
        }
        Ok(())
    }
}
