//! External collaborators consumed by the governance core.
//!
//! - `Clock`: time source, read once per command by the host
//! - `Ledger`: bond vault deposits, refunds and burns
//! - `ActorAuthority`: guardian / registered-node role lookup
//! - In-memory implementations for tests and replay

pub mod mock;
pub mod traits;

pub use mock::{InMemoryLedger, ManualClock, StaticAuthority};
pub use traits::{
    ActorAuthority, ActorRole, Clock, Ledger, LedgerError, LedgerOp, LedgerResult, SystemClock,
};
