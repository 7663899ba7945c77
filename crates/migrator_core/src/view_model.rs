use crate::{MigrationSummary, ObjectKind, RunId, TransferItemId, TransferStatus, WizardStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub step: WizardStep,
    pub steps: Vec<StepView>,
    pub source_name: String,
    pub target: TargetView,
    pub catalog: Vec<CatalogTabView>,
    pub selected_count: usize,
    pub total_count: usize,
    pub transfer: Option<TransferView>,
    pub summary: Option<MigrationSummary>,
    pub can_go_back: bool,
    pub can_go_next: bool,
    pub can_start_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub step: WizardStep,
    pub title: &'static str,
    pub completed: bool,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetView {
    pub host: String,
    pub port: String,
    pub database: String,
    pub username: String,
    pub password_masked: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTabView {
    pub kind: ObjectKind,
    pub title: String,
    pub objects: Vec<ObjectRowView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRowView {
    pub name: String,
    pub record_count: u64,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferView {
    pub run_id: RunId,
    pub rows: Vec<TransferRowView>,
    pub overall_progress: u8,
    pub estimated_seconds_remaining: Option<u64>,
    pub completed_count: usize,
    pub total_count: usize,
    pub finished: bool,
}

impl TransferView {
    pub fn eta_text(&self) -> String {
        format_eta(self.estimated_seconds_remaining)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRowView {
    pub id: TransferItemId,
    pub name: String,
    pub kind: ObjectKind,
    pub status: TransferStatus,
    pub progress: u8,
    pub record_count: Option<u64>,
    pub records_transferred: Option<u64>,
    pub error: Option<String>,
}

/// Display-only rendering of a remaining-time estimate.
pub fn format_eta(seconds: Option<u64>) -> String {
    match seconds {
        None => "calculating".to_string(),
        Some(0) => "less than a second".to_string(),
        Some(1) => "1 second".to_string(),
        Some(s @ 2..=59) => format!("{s} seconds"),
        Some(60..=119) => "1 minute".to_string(),
        Some(s) => format!("{} minutes", s / 60),
    }
}
