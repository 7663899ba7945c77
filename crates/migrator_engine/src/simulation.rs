use migrator_core::{
    derive_records_transferred, items_from_selection, MigratableObject, RunId, TransferItem,
    TransferItemId, TransferSnapshot, TransferStatus,
};
use migrator_logging::{migrator_debug, migrator_info, migrator_trace};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{OverallProgress, SettingsError, SimulationSettings, TickOutcome, TransferError};

/// Edge detector for the completion signal: fires on the first observation
/// of 100 and never again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompletionLatch {
    signaled: bool,
}

impl CompletionLatch {
    pub fn observe(&mut self, overall_progress: u8) -> bool {
        if self.signaled || overall_progress < 100 {
            return false;
        }
        self.signaled = true;
        true
    }

    pub fn is_signaled(&self) -> bool {
        self.signaled
    }
}

/// Tick-driven transfer simulation for one run.
///
/// Owns the run's items; nothing else mutates them. Randomness comes only
/// from the injected generator, so a seeded run replays exactly.
#[derive(Debug, Clone)]
pub struct Simulation<R = ChaCha8Rng> {
    run_id: RunId,
    settings: SimulationSettings,
    items: Vec<TransferItem>,
    overall_progress: u8,
    ticks: u64,
    revision: u64,
    latch: CompletionLatch,
    exhausted: bool,
    rng: R,
}

impl Simulation<ChaCha8Rng> {
    /// Seeds from `settings.seed`, or from entropy when no seed is set.
    pub fn new(
        run_id: RunId,
        objects: &[MigratableObject],
        settings: SimulationSettings,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::prevalidated(run_id, objects, settings))
    }

    /// For settings the caller has already validated.
    pub(crate) fn prevalidated(
        run_id: RunId,
        objects: &[MigratableObject],
        settings: SimulationSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::assemble(run_id, objects, settings, rng)
    }
}

impl<R: Rng> Simulation<R> {
    pub fn with_rng(
        run_id: RunId,
        objects: &[MigratableObject],
        settings: SimulationSettings,
        rng: R,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self::assemble(run_id, objects, settings, rng))
    }

    fn assemble(
        run_id: RunId,
        objects: &[MigratableObject],
        settings: SimulationSettings,
        rng: R,
    ) -> Self {
        Self {
            run_id,
            settings,
            items: items_from_selection(objects),
            overall_progress: 0,
            ticks: 0,
            revision: 0,
            latch: CompletionLatch::default(),
            exhausted: false,
            rng,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn items(&self) -> &[TransferItem] {
        &self.items
    }

    pub fn overall_progress(&self) -> u8 {
        self.overall_progress
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of changes applied to the run so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn is_complete(&self) -> bool {
        self.latch.is_signaled()
    }

    /// True once the run has completed or hit its tick ceiling.
    pub fn is_stopped(&self) -> bool {
        self.latch.is_signaled() || self.exhausted
    }

    pub fn estimated_seconds_remaining(&self) -> u64 {
        u64::from(100 - self.overall_progress) * self.settings.seconds_per_percent
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            run_id: self.run_id,
            tick: self.ticks,
            revision: self.revision,
            items: self.items.clone(),
            overall_progress: self.overall_progress,
            estimated_seconds_remaining: self.estimated_seconds_remaining(),
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Idle;
        }
        if self.settings.max_ticks.is_some_and(|max| self.ticks >= max) {
            self.exhausted = true;
            migrator_info!("Run {} stopped after {} ticks", self.run_id, self.ticks);
            return TickOutcome::Exhausted;
        }

        self.ticks += 1;
        self.revision += 1;
        let step = self.settings.progress_step;
        let p = self.settings.promotion_probability;
        for item in self.items.iter_mut() {
            advance_item(item, step, p, &mut self.rng);
        }
        self.overall_progress = self.overall_progress.max(self.next_overall_progress());
        migrator_trace!("Run {} overall {}%", self.run_id, self.overall_progress);

        if self.latch.observe(self.overall_progress) {
            migrator_info!("Run {} reached 100% after {} ticks", self.run_id, self.ticks);
            TickOutcome::Completed
        } else {
            TickOutcome::Advanced
        }
    }

    /// External fault signal. Terminal items stay frozen.
    pub fn mark_failed(
        &mut self,
        item_id: TransferItemId,
        error: impl Into<String>,
    ) -> Result<(), TransferError> {
        if self.is_stopped() {
            return Err(TransferError::RunFinished(self.run_id));
        }
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(TransferError::UnknownItem(item_id))?;
        if item.is_terminal() {
            return Err(TransferError::AlreadyTerminal {
                id: item_id,
                status: item.status,
            });
        }
        let error = error.into();
        migrator_info!("Run {} item {} ({}) failed: {}", self.run_id, item_id, item.name, error);
        item.status = TransferStatus::Failed;
        item.error = Some(error);
        self.revision += 1;
        Ok(())
    }

    fn next_overall_progress(&self) -> u8 {
        match self.settings.overall_policy {
            OverallProgress::Counter => self
                .overall_progress
                .saturating_add(self.settings.overall_step)
                .min(100),
            OverallProgress::MeanOfItems => mean_item_progress(&self.items),
        }
    }
}

fn advance_item<R: Rng>(item: &mut TransferItem, step: u8, p: f64, rng: &mut R) {
    match item.status {
        TransferStatus::Pending => {
            if rng.gen_bool(p) {
                migrator_debug!("Item {} ({}) started", item.id, item.name);
                item.status = TransferStatus::InProgress;
            }
        }
        TransferStatus::InProgress => {
            item.progress = item.progress.saturating_add(step).min(100);
            item.records_transferred = item
                .record_count
                .map(|count| derive_records_transferred(item.progress, count));
            if item.progress == 100 {
                migrator_debug!("Item {} ({}) completed", item.id, item.name);
                item.status = TransferStatus::Completed;
            }
        }
        TransferStatus::Completed | TransferStatus::Failed => {}
    }
}

/// Floor keeps the figure below 100 while any item is still running.
fn mean_item_progress(items: &[TransferItem]) -> u8 {
    if items.is_empty() {
        return 100;
    }
    let total: u64 = items
        .iter()
        .map(|item| if item.is_terminal() { 100 } else { u64::from(item.progress) })
        .sum();
    let mean = total / items.len() as u64;
    u8::try_from(mean).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_fires_once() {
        let mut latch = CompletionLatch::default();
        assert!(!latch.observe(98));
        assert!(latch.observe(100));
        assert!(!latch.observe(100));
        assert!(latch.is_signaled());
    }

    #[test]
    fn mean_counts_terminal_items_as_done() {
        let object = MigratableObject::new(migrator_core::ObjectKind::Table, "T", 10, true);
        let mut items = items_from_selection(&[object.clone(), object]);
        items[0].status = TransferStatus::Failed;
        items[0].progress = 30;
        items[1].status = TransferStatus::InProgress;
        items[1].progress = 99;
        assert_eq!(mean_item_progress(&items), 99);

        items[1].status = TransferStatus::Completed;
        items[1].progress = 100;
        assert_eq!(mean_item_progress(&items), 100);
    }
}
