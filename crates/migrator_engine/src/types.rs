use migrator_core::{RunId, TransferItemId, TransferSnapshot, TransferStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// State of a run after one tick or an external fault.
    Progress(TransferSnapshot),
    /// Overall progress reached 100; sent once per run.
    Completed { run_id: RunId },
    /// The run hit its tick ceiling before completing.
    Exhausted { run_id: RunId },
}

/// What a single tick did to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Advanced,
    /// Overall progress reached 100 on this tick.
    Completed,
    /// The tick ceiling was reached on this tick; the run is stopped.
    Exhausted,
    /// The run had already stopped; nothing changed.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("no transfer item {0}")]
    UnknownItem(TransferItemId),
    #[error("transfer item {id} is already {}", .status.label())]
    AlreadyTerminal {
        id: TransferItemId,
        status: TransferStatus,
    },
    #[error("run {0} has finished")]
    RunFinished(RunId),
}
