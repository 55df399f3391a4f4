//! Replay a JSON command log against a fresh governance engine.
//!
//! The log names participants either by `0x` address or by label (hashed
//! with [`Address::from_label`]). Address fields inside commands use the
//! hex form.
//!
//! ```json
//! {
//!   "guardian": "guardian",
//!   "registered_nodes": ["alpha", "beta"],
//!   "balances": { "alpha": "5000" },
//!   "commands": [
//!     { "at": 100, "actor": "alpha", "command": { "type": "join" } }
//!   ]
//! }
//! ```

use super::config::TrustDaoConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use trustdao::collaborators::{InMemoryLedger, Ledger, ManualClock, StaticAuthority};
use trustdao::governance::audit_trail::format_audit_log;
use trustdao::governance::{
    Address, Amount, AuditQuery, Command, GovernanceEngine, GovernanceSettings, Timestamp,
};
use trustdao::service;

type ReplayEngine = GovernanceEngine<InMemoryLedger, StaticAuthority>;

/// Queue depth for the replay worker. Replay awaits every reply, so one slot is enough.
const REPLAY_QUEUE_CAPACITY: usize = 1;

#[derive(Debug, Deserialize)]
pub struct CommandLog {
    pub guardian: String,
    #[serde(default)]
    pub registered_nodes: Vec<String>,
    #[serde(default)]
    pub balances: BTreeMap<String, String>,
    /// Optional per-log settings, overriding the config file.
    #[serde(default)]
    pub settings: Option<GovernanceSettings>,
    pub commands: Vec<LoggedCommand>,
}

#[derive(Debug, Deserialize)]
pub struct LoggedCommand {
    pub at: Timestamp,
    pub actor: String,
    pub command: Command,
}

/// Totals printed after a replay.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Resolve a participant given either as a hex address or as a label.
pub fn resolve_participant(name: &str) -> Result<Address, Box<dyn std::error::Error>> {
    if name.starts_with("0x") {
        name.parse::<Address>()
            .map_err(|e| format!("Invalid address '{}': {}", name, e).into())
    } else {
        Ok(Address::from_label(name))
    }
}

impl CommandLog {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read command log '{}': {}", path.display(), e))?;
        let log: CommandLog = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse command log '{}': {}", path.display(), e))?;
        Ok(log)
    }

    fn authority(&self) -> Result<StaticAuthority, Box<dyn std::error::Error>> {
        let guardian = resolve_participant(&self.guardian)?;
        let nodes = self
            .registered_nodes
            .iter()
            .map(|n| resolve_participant(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StaticAuthority::new(guardian).with_nodes(nodes))
    }

    fn ledger(&self) -> Result<InMemoryLedger, Box<dyn std::error::Error>> {
        let mut ledger = InMemoryLedger::new();
        for (name, amount) in &self.balances {
            let amount: Amount = amount
                .replace('_', "")
                .parse()
                .map_err(|e| format!("Invalid balance '{}' for {}: {}", amount, name, e))?;
            ledger.mint(resolve_participant(name)?, amount);
        }
        Ok(ledger)
    }
}

pub async fn execute(
    config_path: Option<String>,
    log_path: String,
    snapshot: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = TrustDaoConfig::load_or_default(config_path.as_deref().map(Path::new))?;
    super::init_logging(&config.logging)?;

    let log = CommandLog::load(Path::new(&log_path))?;
    let settings = log.settings.clone().unwrap_or(config.governance);
    let engine = GovernanceEngine::new(settings, log.ledger()?, log.authority()?)?;

    println!("Replaying {} commands from {}", log.commands.len(), log_path);
    println!();

    let (engine, summary) = replay(engine, &log).await?;

    println!();
    println!(
        "Applied: {}  Rejected: {}",
        summary.applied, summary.rejected
    );
    println!("Valid members: {}", engine.member_count());
    println!("Proposals: {}", engine.proposal_count());
    println!("Challenge fees: {}", engine.challenge_fees_collected());
    println!(
        "Bonded: {}  Vault: {}",
        engine.bond_vault_total(),
        engine.ledger().vault_balance()
    );
    match engine.check_bond_invariant() {
        Ok(()) => println!("Bond invariant: ok"),
        Err(corruption) => println!("Bond invariant: VIOLATED ({})", corruption),
    }

    let last = log.commands.last().map_or(0, |c| c.at);
    println!();
    println!(
        "{}",
        format_audit_log(&engine.audit_log(&AuditQuery::default()), last)
    );

    if let Some(path) = snapshot {
        let bytes = engine.state().to_bytes()?;
        fs::write(&path, bytes)
            .map_err(|e| format!("Failed to write snapshot '{}': {}", path, e))?;
        println!();
        println!("State snapshot written to {}", path);
    }

    Ok(())
}

/// Feed every logged command through a governance worker, one at a time.
pub async fn replay(
    engine: ReplayEngine,
    log: &CommandLog,
) -> Result<(ReplayEngine, ReplaySummary), Box<dyn std::error::Error>> {
    let clock = ManualClock::new(log.commands.first().map_or(0, |c| c.at));
    let (handle, worker) = service::spawn(engine, clock.clone(), REPLAY_QUEUE_CAPACITY);
    let mut summary = ReplaySummary::default();

    for (index, entry) in log.commands.iter().enumerate() {
        let actor = resolve_participant(&entry.actor)?;
        clock.set(entry.at);

        match handle.apply(actor, entry.command.clone()).await {
            Ok(outcome) => {
                summary.applied += 1;
                println!(
                    "#{:<3} t={} {} {} -> {}",
                    index + 1,
                    entry.at,
                    entry.actor,
                    entry.command.name(),
                    serde_json::to_string(&outcome)?
                );
            }
            Err(e) => {
                summary.rejected += 1;
                println!(
                    "#{:<3} t={} {} {} -> rejected: {}",
                    index + 1,
                    entry.at,
                    entry.actor,
                    entry.command.name(),
                    e
                );
            }
        }
    }

    if let Err(corruption) = handle.check_bond_invariant().await? {
        warn!(%corruption, "Replay finished with a broken bond invariant");
    }
    drop(handle);

    let engine = worker.await?;
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "Replay complete"
    );
    Ok((engine, summary))
}
