//! In-memory collaborators for tests, benchmarks and command-log replay.

use super::traits::*;
use crate::governance::types::{Address, Amount, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory token ledger with a single bond vault.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<Address, Amount>,
    vault: Amount,
    supply: Amount,
    burned: Amount,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint tokens to an account (test setup).
    pub fn mint(&mut self, account: Address, amount: Amount) {
        *self.balances.entry(account).or_insert(0) += amount;
        self.supply += amount;
    }

    /// Total amount burned so far.
    pub fn burned(&self) -> Amount {
        self.burned
    }

    /// Run the batch against scratch copies; return them only if every step succeeds.
    fn simulate(
        &self,
        ops: &[LedgerOp],
    ) -> LedgerResult<(BTreeMap<Address, Amount>, Amount, Amount)> {
        let mut balances = self.balances.clone();
        let mut vault = self.vault;
        let mut burned = 0;

        for op in ops {
            match op {
                LedgerOp::Deposit { account, amount } => {
                    let available = balances.get(account).copied().unwrap_or(0);
                    if available < *amount {
                        return Err(LedgerError::InsufficientBalance {
                            account: *account,
                            required: *amount,
                            available,
                        });
                    }
                    balances.insert(*account, available - amount);
                    vault += amount;
                }
                LedgerOp::Refund { to, amount } => {
                    if vault < *amount {
                        return Err(LedgerError::VaultUnderflow {
                            required: *amount,
                            available: vault,
                        });
                    }
                    vault -= amount;
                    *balances.entry(*to).or_insert(0) += amount;
                }
                LedgerOp::Burn { amount } => {
                    if vault < *amount {
                        return Err(LedgerError::VaultUnderflow {
                            required: *amount,
                            available: vault,
                        });
                    }
                    vault -= amount;
                    burned += amount;
                }
            }
        }

        Ok((balances, vault, burned))
    }
}

impl Ledger for InMemoryLedger {
    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn vault_balance(&self) -> Amount {
        self.vault
    }

    fn total_supply(&self) -> Amount {
        self.supply
    }

    fn commit(&mut self, ops: &[LedgerOp]) -> LedgerResult<()> {
        let (balances, vault, burned) = self.simulate(ops)?;
        self.balances = balances;
        self.vault = vault;
        self.supply -= burned;
        self.burned += burned;
        Ok(())
    }
}

/// Clock controlled by the test. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Fixed role table: one optional guardian plus a set of registered nodes.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthority {
    guardian: Option<Address>,
    registered: BTreeSet<Address>,
}

impl StaticAuthority {
    pub fn new(guardian: Address) -> Self {
        Self {
            guardian: Some(guardian),
            registered: BTreeSet::new(),
        }
    }

    /// Register a node address.
    pub fn register(&mut self, node: Address) {
        self.registered.insert(node);
    }

    /// Builder-style variant of [`StaticAuthority::register`].
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Address>) -> Self {
        self.registered.extend(nodes);
        self
    }
}

impl ActorAuthority for StaticAuthority {
    fn role(&self, address: &Address) -> ActorRole {
        if self.guardian.as_ref() == Some(address) {
            ActorRole::Guardian
        } else if self.registered.contains(address) {
            ActorRole::RegisteredNode
        } else {
            ActorRole::Unregistered
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(label: &str) -> Address {
        Address::from_label(label)
    }

    #[test]
    fn test_mint_and_deposit() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(addr("alice"), 100);

        ledger
            .commit(&[LedgerOp::Deposit {
                account: addr("alice"),
                amount: 60,
            }])
            .unwrap();

        assert_eq!(ledger.balance_of(&addr("alice")), 40);
        assert_eq!(ledger.vault_balance(), 60);
        assert_eq!(ledger.total_supply(), 100);
    }

    #[test]
    fn test_burn_reduces_supply() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(addr("alice"), 100);
        ledger
            .commit(&[
                LedgerOp::Deposit {
                    account: addr("alice"),
                    amount: 100,
                },
                LedgerOp::Burn { amount: 30 },
                LedgerOp::Refund {
                    to: addr("alice"),
                    amount: 70,
                },
            ])
            .unwrap();

        assert_eq!(ledger.total_supply(), 70);
        assert_eq!(ledger.burned(), 30);
        assert_eq!(ledger.vault_balance(), 0);
        assert_eq!(ledger.balance_of(&addr("alice")), 70);
    }

    #[test]
    fn test_failed_batch_leaves_ledger_untouched() {
        let mut ledger = InMemoryLedger::new();
        ledger.mint(addr("alice"), 50);

        let result = ledger.commit(&[
            LedgerOp::Deposit {
                account: addr("alice"),
                amount: 50,
            },
            LedgerOp::Refund {
                to: addr("bob"),
                amount: 80,
            },
        ]);

        assert!(matches!(result, Err(LedgerError::VaultUnderflow { .. })));
        assert_eq!(ledger.balance_of(&addr("alice")), 50);
        assert_eq!(ledger.balance_of(&addr("bob")), 0);
        assert_eq!(ledger.vault_balance(), 0);
    }

    #[test]
    fn test_insufficient_balance() {
        let mut ledger = InMemoryLedger::new();
        let result = ledger.commit(&[LedgerOp::Deposit {
            account: addr("broke"),
            amount: 1,
        }]);
        assert_eq!(
            result,
            Err(LedgerError::InsufficientBalance {
                account: addr("broke"),
                required: 1,
                available: 0,
            })
        );
    }

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(50);
        assert_eq!(other.now(), 1_050);
        other.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn test_static_authority_roles() {
        let authority = StaticAuthority::new(addr("guardian")).with_nodes([addr("node-1")]);
        assert_eq!(authority.role(&addr("guardian")), ActorRole::Guardian);
        assert_eq!(authority.role(&addr("node-1")), ActorRole::RegisteredNode);
        assert_eq!(authority.role(&addr("stranger")), ActorRole::Unregistered);
    }
}
