//! Host-process governance worker.
//!
//! - One tokio task owns the [`GovernanceEngine`] and drains an ordered queue
//! - Callers hold a cloneable [`GovernanceHandle`] and get replies over oneshots
//! - The worker reads the injected [`Clock`] once per command, so every
//!   command sees exactly one `now`
//! - When the last handle is dropped the worker stops and returns the engine

use crate::collaborators::{ActorAuthority, Clock, Ledger};
use crate::governance::{
    Address, Command, CommandOutcome, GovernanceEngine, GovernanceError, GovernanceState,
    InvariantCorruption, ProposalId, ProposalState, Timestamp,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

/// Errors returned through a [`GovernanceHandle`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("Governance worker has stopped")]
    Stopped,
}

pub type ServiceResult<T> = Result<T, ServiceError>;

enum Request {
    Apply {
        actor: Address,
        command: Command,
        reply: oneshot::Sender<Result<CommandOutcome, GovernanceError>>,
    },
    ProposalState {
        id: ProposalId,
        reply: oneshot::Sender<Result<ProposalState, GovernanceError>>,
    },
    Snapshot {
        reply: oneshot::Sender<GovernanceState>,
    },
    CheckInvariant {
        reply: oneshot::Sender<Result<(), InvariantCorruption>>,
    },
}

/// Cloneable handle to a running governance worker.
#[derive(Clone)]
pub struct GovernanceHandle {
    sender: mpsc::Sender<Request>,
}

impl GovernanceHandle {
    /// Submit a command. Commands are applied in the order they are received.
    pub async fn apply(&self, actor: Address, command: Command) -> ServiceResult<CommandOutcome> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Apply {
            actor,
            command,
            reply,
        })
        .await?;
        Ok(response.await.map_err(|_| ServiceError::Stopped)??)
    }

    /// Derived state of a proposal at the worker's current time.
    pub async fn proposal_state(&self, id: ProposalId) -> ServiceResult<ProposalState> {
        let (reply, response) = oneshot::channel();
        self.send(Request::ProposalState { id, reply }).await?;
        Ok(response.await.map_err(|_| ServiceError::Stopped)??)
    }

    /// A copy of the current governance state.
    pub async fn snapshot(&self) -> ServiceResult<GovernanceState> {
        let (reply, response) = oneshot::channel();
        self.send(Request::Snapshot { reply }).await?;
        response.await.map_err(|_| ServiceError::Stopped)
    }

    /// Compare recorded bonds with the ledger vault.
    pub async fn check_bond_invariant(&self) -> ServiceResult<Result<(), InvariantCorruption>> {
        let (reply, response) = oneshot::channel();
        self.send(Request::CheckInvariant { reply }).await?;
        response.await.map_err(|_| ServiceError::Stopped)
    }

    async fn send(&self, request: Request) -> ServiceResult<()> {
        self.sender
            .send(request)
            .await
            .map_err(|_| ServiceError::Stopped)
    }
}

/// Spawn the worker task on the current tokio runtime.
///
/// `capacity` bounds the command queue; senders wait when it is full.
pub fn spawn<L, A, C>(
    engine: GovernanceEngine<L, A>,
    clock: C,
    capacity: usize,
) -> (GovernanceHandle, JoinHandle<GovernanceEngine<L, A>>)
where
    L: Ledger + 'static,
    A: ActorAuthority + 'static,
    C: Clock + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let worker = tokio::spawn(run(engine, clock, receiver));
    (GovernanceHandle { sender }, worker)
}

async fn run<L, A, C>(
    mut engine: GovernanceEngine<L, A>,
    clock: C,
    mut receiver: mpsc::Receiver<Request>,
) -> GovernanceEngine<L, A>
where
    L: Ledger,
    A: ActorAuthority,
    C: Clock,
{
    while let Some(request) = receiver.recv().await {
        let now: Timestamp = clock.now();
        match request {
            Request::Apply {
                actor,
                command,
                reply,
            } => {
                let result = engine.apply(actor, &command, now);
                if reply.send(result).is_err() {
                    debug!(command = command.name(), "Caller dropped before reply");
                }
            }
            Request::ProposalState { id, reply } => {
                let _ = reply.send(engine.proposal_state(id, now));
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(engine.state().clone());
            }
            Request::CheckInvariant { reply } => {
                let _ = reply.send(engine.check_bond_invariant());
            }
        }
    }

    debug!("Governance worker stopping, all handles dropped");
    engine
}
