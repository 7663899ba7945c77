use serde::Serialize;

use crate::transfer::count_status;
use crate::{ObjectKind, TransferItem, TransferStatus};

/// Figures shown on the completion step and written into the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub source_name: String,
    pub target: String,
    pub total_items: usize,
    pub tables_migrated: usize,
    pub queries_migrated: usize,
    pub procedures_migrated: usize,
    pub failed: usize,
    pub not_started: usize,
    pub records_transferred: u64,
    pub ticks_elapsed: u64,
}

impl MigrationSummary {
    pub fn from_items(
        source_name: impl Into<String>,
        target: impl Into<String>,
        items: &[TransferItem],
        ticks_elapsed: u64,
    ) -> Self {
        let migrated = |kind: ObjectKind| {
            items
                .iter()
                .filter(|item| item.kind == kind && item.status == TransferStatus::Completed)
                .count()
        };
        Self {
            source_name: source_name.into(),
            target: target.into(),
            total_items: items.len(),
            tables_migrated: migrated(ObjectKind::Table),
            queries_migrated: migrated(ObjectKind::Query),
            procedures_migrated: migrated(ObjectKind::Procedure),
            failed: count_status(items, TransferStatus::Failed),
            not_started: count_status(items, TransferStatus::Pending),
            records_transferred: items.iter().filter_map(|item| item.records_transferred).sum(),
            ticks_elapsed,
        }
    }

    pub fn fully_migrated(&self) -> bool {
        self.tables_migrated + self.queries_migrated + self.procedures_migrated == self.total_items
    }
}
