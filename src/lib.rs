//! TrustDAO - Trusted-Node Governance Engine
//!
//! A small permissioned consensus system for a bounded set of bonded
//! trusted nodes.
//!
//! Key principles:
//! - Single writer: one command at a time, applied atomically
//! - Time is an input, never read inside the engine
//! - Recorded bonds always equal the ledger's vault balance
//! - Token movement, roles and time come from host collaborators

pub mod collaborators;
pub mod governance;
pub mod serialization;
pub mod service;
