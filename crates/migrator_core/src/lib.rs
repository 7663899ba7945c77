//! Migrator core: pure wizard state machine, catalog and transfer model.
mod catalog;
mod effect;
mod msg;
mod state;
mod summary;
mod target;
mod transfer;
mod update;
mod view_model;
mod wizard;

pub use catalog::{Catalog, MigratableObject, ObjectKind, Selection, SelectionError, SelectionObserver};
pub use effect::Effect;
pub use msg::Msg;
pub use state::AppState;
pub use summary::MigrationSummary;
pub use target::{TargetConfig, TargetField, UnknownTargetField, DEFAULT_MYSQL_PORT};
pub use transfer::{
    derive_records_transferred, is_terminal, items_from_selection, RunId, TransferItem,
    TransferItemId, TransferSnapshot, TransferStatus,
};
pub use update::update;
pub use view_model::{
    format_eta, AppViewModel, CatalogTabView, ObjectRowView, StepView, TargetView,
    TransferRowView, TransferView,
};
pub use wizard::{NavigationError, StepGuard, Wizard, WizardStep};
