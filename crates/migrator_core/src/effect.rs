use crate::{MigratableObject, MigrationSummary, RunId, TransferItem, TransferItemId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartTransfer {
        run_id: RunId,
        objects: Vec<MigratableObject>,
    },
    CancelTransfer {
        run_id: RunId,
    },
    FailItem {
        run_id: RunId,
        item_id: TransferItemId,
        error: String,
    },
    ExportReport {
        summary: MigrationSummary,
        items: Vec<TransferItem>,
    },
}
