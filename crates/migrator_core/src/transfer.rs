use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{MigratableObject, ObjectKind};

/// Identifies one transfer run started from the preview step.
pub type RunId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransferItemId(pub u64);

impl fmt::Display for TransferItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TransferStatus {
    pub fn label(self) -> &'static str {
        match self {
            TransferStatus::Pending => "Pending",
            TransferStatus::InProgress => "In Progress",
            TransferStatus::Completed => "Completed",
            TransferStatus::Failed => "Failed",
        }
    }
}

/// Runtime record of one selected object's transfer.
///
/// `Completed` implies `progress == 100`, `Pending` implies `progress == 0`,
/// and `error` is set only on `Failed` items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub id: TransferItemId,
    pub name: String,
    pub kind: ObjectKind,
    pub status: TransferStatus,
    pub progress: u8,
    pub record_count: Option<u64>,
    pub records_transferred: Option<u64>,
    pub error: Option<String>,
}

impl TransferItem {
    pub fn pending(id: TransferItemId, object: &MigratableObject) -> Self {
        let record_count = match object.kind {
            ObjectKind::Procedure => None,
            ObjectKind::Table | ObjectKind::Query => Some(object.record_count),
        };
        Self {
            id,
            name: object.name.clone(),
            kind: object.kind,
            status: TransferStatus::Pending,
            progress: 0,
            record_count,
            records_transferred: record_count.map(|_| 0),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal(self.status)
    }
}

pub fn is_terminal(status: TransferStatus) -> bool {
    matches!(status, TransferStatus::Completed | TransferStatus::Failed)
}

/// `floor(progress / 100 * record_count)`, clamped to `[0, record_count]`.
pub fn derive_records_transferred(progress: u8, record_count: u64) -> u64 {
    let progress = u128::from(progress.min(100));
    let transferred = progress * u128::from(record_count) / 100;
    u64::try_from(transferred).map_or(record_count, |n| n.min(record_count))
}

/// One pending item per selected object, numbered from 1 in selection order.
pub fn items_from_selection(subset: &[MigratableObject]) -> Vec<TransferItem> {
    subset
        .iter()
        .zip(1u64..)
        .map(|(object, id)| TransferItem::pending(TransferItemId(id), object))
        .collect()
}

/// Point-in-time read of a run, safe to take at any tick.
///
/// `revision` grows with every change to the run (ticks and injected
/// faults), so it orders snapshots that share a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSnapshot {
    pub run_id: RunId,
    pub tick: u64,
    pub revision: u64,
    pub items: Vec<TransferItem>,
    pub overall_progress: u8,
    pub estimated_seconds_remaining: u64,
}

impl TransferSnapshot {
    pub fn completed_count(&self) -> usize {
        count_status(&self.items, TransferStatus::Completed)
    }

    pub fn failed_count(&self) -> usize {
        count_status(&self.items, TransferStatus::Failed)
    }

    pub fn item(&self, id: TransferItemId) -> Option<&TransferItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

pub(crate) fn count_status(items: &[TransferItem], status: TransferStatus) -> usize {
    items.iter().filter(|item| item.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_transferred_floors_and_clamps() {
        assert_eq!(derive_records_transferred(65, 5000), 3250);
        assert_eq!(derive_records_transferred(5, 91), 4);
        assert_eq!(derive_records_transferred(100, 91), 91);
        assert_eq!(derive_records_transferred(0, 91), 0);
        assert_eq!(derive_records_transferred(250, 10), 10);
        assert_eq!(derive_records_transferred(50, u64::MAX), u64::MAX / 2);
    }

    #[test]
    fn terminal_statuses() {
        assert!(is_terminal(TransferStatus::Completed));
        assert!(is_terminal(TransferStatus::Failed));
        assert!(!is_terminal(TransferStatus::Pending));
        assert!(!is_terminal(TransferStatus::InProgress));
    }

    #[test]
    fn procedures_have_no_record_count() {
        let proc = MigratableObject::new(ObjectKind::Procedure, "GenerateInvoice", 0, true);
        let item = TransferItem::pending(TransferItemId(3), &proc);
        assert_eq!(item.record_count, None);
        assert_eq!(item.records_transferred, None);
        assert_eq!(item.status, TransferStatus::Pending);
    }
}
