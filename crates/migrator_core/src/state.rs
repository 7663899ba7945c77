use std::collections::BTreeSet;

use migrator_logging::{migrator_debug, migrator_info, migrator_warn};

use crate::transfer::items_from_selection;
use crate::view_model::{
    AppViewModel, CatalogTabView, ObjectRowView, StepView, TargetView, TransferRowView,
    TransferView,
};
use crate::{
    Catalog, Effect, MigrationSummary, NavigationError, ObjectKind, RunId, Selection, StepGuard,
    TargetConfig, TargetField, TransferItem, TransferItemId, TransferSnapshot, TransferStatus,
    Wizard, WizardStep,
};

const SOURCE_EXTENSIONS: [&str; 2] = ["mdb", "accdb"];

/// The transfer started from the preview step, as last reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TransferRun {
    run_id: RunId,
    items: Vec<TransferItem>,
    overall_progress: u8,
    estimated_seconds_remaining: Option<u64>,
    tick: u64,
    revision: u64,
    finished: bool,
    exhausted: bool,
}

/// One wizard session. Passed by value through [`crate::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    wizard: Wizard,
    initial_catalog: Catalog,
    catalog: Catalog,
    selection: Selection,
    source: Option<String>,
    target: TargetConfig,
    transfer: Option<TransferRun>,
    next_run_id: RunId,
    summary: Option<MigrationSummary>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_catalog(Catalog::sample())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            wizard: Wizard::new(),
            selection: Selection::from_catalog(&catalog),
            initial_catalog: catalog.clone(),
            catalog,
            source: None,
            target: TargetConfig::default(),
            transfer: None,
            next_run_id: 1,
            summary: None,
            dirty: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_step(&self) -> WizardStep {
        self.wizard.current()
    }

    pub fn completed_steps(&self) -> &BTreeSet<WizardStep> {
        self.wizard.completed_steps()
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    pub fn source_name(&self) -> &str {
        self.source
            .as_deref()
            .unwrap_or_else(|| self.catalog.database_name())
    }

    pub fn transfer_items(&self) -> &[TransferItem] {
        self.transfer
            .as_ref()
            .map(|run| run.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn overall_progress(&self) -> u8 {
        self.transfer.as_ref().map_or(0, |run| run.overall_progress)
    }

    /// Run id of a transfer that has not finished yet.
    pub fn active_run(&self) -> Option<RunId> {
        self.transfer
            .as_ref()
            .filter(|run| !run.finished)
            .map(|run| run.run_id)
    }

    /// True while the engine can still report on the current run.
    pub fn transfer_running(&self) -> bool {
        self.transfer
            .as_ref()
            .is_some_and(|run| !run.finished && !run.exhausted)
    }

    pub fn summary(&self) -> Option<&MigrationSummary> {
        self.summary.as_ref()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn step_guard(&self) -> StepGuard {
        StepGuard {
            selected_count: self.selection.len(),
            transfer_finished: self.transfer.as_ref().is_some_and(|run| run.finished),
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn choose_source(&mut self, path: &str) {
        if self.current_step() != WizardStep::Selection {
            migrator_debug!("Ignoring source change outside the selection step");
            return;
        }
        let file_name = path
            .trim()
            .rsplit(&['/', '\\'][..])
            .next()
            .unwrap_or_default()
            .to_string();
        let accepted = file_name
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| {
                !stem.is_empty() && SOURCE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
            });
        if !accepted {
            migrator_warn!("Rejected source file {:?}: expected .mdb or .accdb", file_name);
            return;
        }
        migrator_info!("Source database set to {}", file_name);
        self.catalog.set_database_name(file_name.clone());
        self.source = Some(file_name);
        self.mark_dirty();
    }

    pub(crate) fn set_target_field(&mut self, field: TargetField, value: String) {
        if self.current_step() != WizardStep::Configuration {
            migrator_debug!("Ignoring {:?} edit outside the configuration step", field);
            return;
        }
        self.target.set(field, value);
        self.mark_dirty();
    }

    pub(crate) fn toggle_selection(&mut self, kind: ObjectKind, name: &str) {
        if self.current_step() != WizardStep::Preview {
            migrator_debug!("Ignoring toggle of {} {:?} outside the preview step", kind, name);
            return;
        }
        match self.catalog.toggle(kind, name, &mut self.selection) {
            Ok(selected) => {
                migrator_debug!(
                    "{} {:?} selected={} ({} of {})",
                    kind,
                    name,
                    selected,
                    self.selection.len(),
                    self.catalog.total_count()
                );
                self.mark_dirty();
            }
            Err(err) => migrator_debug!("Toggle ignored: {}", err),
        }
    }

    /// Moves to the next step. Entering the transfer step starts a new run.
    pub fn advance(&mut self) -> Result<Vec<Effect>, NavigationError> {
        let from = self.current_step();
        let to = self.wizard.advance(self.step_guard())?;
        migrator_info!("Step {:?} -> {:?}", from, to);
        self.mark_dirty();

        if to != WizardStep::Transfer {
            return Ok(Vec::new());
        }
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        let objects = self.selection.objects().to_vec();
        migrator_info!("Starting transfer run {} with {} objects", run_id, objects.len());
        self.transfer = Some(TransferRun {
            run_id,
            items: items_from_selection(&objects),
            overall_progress: 0,
            estimated_seconds_remaining: None,
            tick: 0,
            revision: 0,
            finished: false,
            exhausted: false,
        });
        self.summary = None;
        Ok(vec![Effect::StartTransfer { run_id, objects }])
    }

    pub fn retreat(&mut self) -> Result<WizardStep, NavigationError> {
        let from = self.current_step();
        let to = self.wizard.retreat()?;
        migrator_info!("Step {:?} -> {:?}", from, to);
        self.mark_dirty();
        Ok(to)
    }

    /// Back to a fresh session. Cancels a run that is still going.
    pub fn reset(&mut self) -> Vec<Effect> {
        let effects = match self.active_run() {
            Some(run_id) => {
                migrator_info!("Cancelling transfer run {} on reset", run_id);
                vec![Effect::CancelTransfer { run_id }]
            }
            None => Vec::new(),
        };
        self.wizard.reset();
        self.catalog = self.initial_catalog.clone();
        self.selection = Selection::from_catalog(&self.catalog);
        self.source = None;
        self.target = TargetConfig::default();
        self.transfer = None;
        self.summary = None;
        self.mark_dirty();
        effects
    }

    pub(crate) fn request_item_failure(&self, item_id: TransferItemId, error: String) -> Option<Effect> {
        let run = self.transfer.as_ref().filter(|run| !run.finished)?;
        if !run.items.iter().any(|item| item.id == item_id) {
            migrator_debug!("No item {} in run {}", item_id, run.run_id);
            return None;
        }
        Some(Effect::FailItem {
            run_id: run.run_id,
            item_id,
            error,
        })
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: TransferSnapshot) {
        let Some(run) = self.transfer.as_mut() else {
            migrator_debug!("Dropping snapshot for run {}: no transfer", snapshot.run_id);
            return;
        };
        if run.run_id != snapshot.run_id || run.finished || snapshot.revision <= run.revision {
            migrator_debug!(
                "Dropping stale snapshot run={} tick={} revision={}",
                snapshot.run_id,
                snapshot.tick,
                snapshot.revision
            );
            return;
        }
        run.tick = snapshot.tick;
        run.revision = snapshot.revision;
        run.overall_progress = run.overall_progress.max(snapshot.overall_progress);
        run.estimated_seconds_remaining = Some(snapshot.estimated_seconds_remaining);
        run.items = snapshot.items;
        self.mark_dirty();
    }

    pub(crate) fn apply_completion(&mut self, run_id: RunId) {
        match self.transfer.as_mut() {
            Some(run) if run.run_id == run_id && !run.finished => run.finished = true,
            _ => {
                migrator_debug!("Ignoring completion for inactive run {}", run_id);
                return;
            }
        }
        if let Err(err) = self.advance() {
            migrator_warn!("Completed run {} could not leave the transfer step: {}", run_id, err);
            return;
        }
        let summary = self.build_summary();
        migrator_info!(
            "Run {} complete: {} of {} items migrated, {} failed",
            run_id,
            summary.tables_migrated + summary.queries_migrated + summary.procedures_migrated,
            summary.total_items,
            summary.failed
        );
        self.summary = Some(summary);
    }

    pub(crate) fn apply_exhausted(&mut self, run_id: RunId) {
        if let Some(run) = self.transfer.as_mut().filter(|run| run.run_id == run_id) {
            migrator_warn!("Run {} stopped at its tick ceiling before completing", run_id);
            run.estimated_seconds_remaining = None;
            run.exhausted = true;
            self.mark_dirty();
        }
    }

    pub(crate) fn export_request(&self) -> Option<Effect> {
        if self.current_step() != WizardStep::Complete {
            return None;
        }
        let summary = self.summary.clone()?;
        Some(Effect::ExportReport {
            summary,
            items: self.transfer_items().to_vec(),
        })
    }

    fn build_summary(&self) -> MigrationSummary {
        let tick = self.transfer.as_ref().map_or(0, |run| run.tick);
        MigrationSummary::from_items(
            self.source_name(),
            self.target.display_target(),
            self.transfer_items(),
            tick,
        )
    }

    pub fn view(&self) -> AppViewModel {
        let current = self.current_step();
        let steps = WizardStep::ALL
            .iter()
            .map(|&step| StepView {
                step,
                title: step.title(),
                completed: self.wizard.is_completed(step),
                current: step == current,
            })
            .collect();

        let catalog = ObjectKind::ALL
            .iter()
            .map(|&kind| CatalogTabView {
                kind,
                title: format!("{} ({})", kind.plural_label(), self.catalog.count_of(kind)),
                objects: self
                    .catalog
                    .objects_of(kind)
                    .map(|object| ObjectRowView {
                        name: object.name.clone(),
                        record_count: object.record_count,
                        selected: object.selected,
                    })
                    .collect(),
            })
            .collect();

        let transfer = self.transfer.as_ref().map(|run| TransferView {
            run_id: run.run_id,
            overall_progress: run.overall_progress,
            estimated_seconds_remaining: run.estimated_seconds_remaining,
            completed_count: run
                .items
                .iter()
                .filter(|item| item.status == TransferStatus::Completed)
                .count(),
            total_count: run.items.len(),
            finished: run.finished,
            rows: run
                .items
                .iter()
                .map(|item| TransferRowView {
                    id: item.id,
                    name: item.name.clone(),
                    kind: item.kind,
                    status: item.status,
                    progress: item.progress,
                    record_count: item.record_count,
                    records_transferred: item.records_transferred,
                    error: item.error.clone(),
                })
                .collect(),
        });

        AppViewModel {
            step: current,
            steps,
            source_name: self.source_name().to_string(),
            target: TargetView {
                host: self.target.host.clone(),
                port: self.target.port.clone(),
                database: self.target.database.clone(),
                username: self.target.username.clone(),
                password_masked: self.target.masked_password(),
            },
            catalog,
            selected_count: self.selection.len(),
            total_count: self.catalog.total_count(),
            transfer,
            summary: self.summary.clone(),
            can_go_back: self.wizard.can_retreat(),
            can_go_next: self.wizard.can_advance(self.step_guard()),
            can_start_new: current == WizardStep::Complete,
        }
    }
}
