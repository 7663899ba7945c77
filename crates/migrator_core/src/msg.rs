use crate::{ObjectKind, RunId, TargetField, TransferItemId, TransferSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked the Access database file on the selection step.
    SourceChosen(String),
    /// User edited a field of the MySQL configuration form.
    TargetFieldChanged { field: TargetField, value: String },
    /// User flipped a checkbox on the preview step.
    SelectionToggled { kind: ObjectKind, name: String },
    /// User clicked Next.
    NextClicked,
    /// User clicked Previous.
    PreviousClicked,
    /// User clicked Start New Migration (always honoured).
    StartNewMigrationClicked,
    /// External fault signal for one transfer item.
    ItemFailed { item_id: TransferItemId, error: String },
    /// User asked for the migration report on the completion step.
    ExportReportClicked,
    /// Engine tick snapshot for a run.
    TransferProgress(TransferSnapshot),
    /// Engine completion signal for a run, sent once.
    TransferCompleted { run_id: RunId },
    /// Engine gave up on a run after its tick ceiling.
    TransferExhausted { run_id: RunId },
    /// UI/render tick to coalesce rendering.
    Tick,
}
