use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use chrono::Utc;
use migrator_core::{Effect, Msg};
use migrator_engine::{
    export_report, EngineEvent, EngineHandle, ProgressSink, SettingsError, SimulationSettings,
    TransferHandle,
};
use migrator_logging::{migrator_error, migrator_info, migrator_warn};

use super::app::Inbound;

/// Forwards engine events into the app's message loop.
struct MsgSink {
    tx: mpsc::Sender<Inbound>,
}

impl ProgressSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        let msg = match event {
            EngineEvent::Progress(snapshot) => Msg::TransferProgress(snapshot),
            EngineEvent::Completed { run_id } => Msg::TransferCompleted { run_id },
            EngineEvent::Exhausted { run_id } => Msg::TransferExhausted { run_id },
        };
        let _ = self.tx.send(Inbound::Core(msg));
    }
}

/// Something the user should see that is not part of the wizard view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    ReportWritten { markdown: PathBuf, manifest: PathBuf },
    ReportFailed(String),
}

pub struct EffectRunner {
    engine: EngineHandle,
    active: Option<TransferHandle>,
    report_dir: PathBuf,
}

impl EffectRunner {
    pub fn new(
        settings: SimulationSettings,
        report_dir: PathBuf,
        tx: mpsc::Sender<Inbound>,
    ) -> Result<Self, SettingsError> {
        let engine = EngineHandle::with_sink(settings, Arc::new(MsgSink { tx }))?;
        Ok(Self {
            engine,
            active: None,
            report_dir,
        })
    }

    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for effect in effects {
            match effect {
                Effect::StartTransfer { run_id, objects } => {
                    if let Some(previous) = self.active.take() {
                        previous.cancel();
                    }
                    let handle = self.engine.start_transfer(run_id, &objects);
                    handle.on_complete(move |snapshot| {
                        migrator_info!(
                            "Run {} finished after {} ticks: {} completed, {} failed",
                            run_id,
                            snapshot.tick,
                            snapshot.completed_count(),
                            snapshot.failed_count()
                        );
                    });
                    self.active = Some(handle);
                }
                Effect::CancelTransfer { run_id } => match self.active.take() {
                    Some(handle) if handle.run_id() == run_id => handle.cancel(),
                    other => {
                        migrator_warn!("No active run {} to cancel", run_id);
                        self.active = other;
                    }
                },
                Effect::FailItem {
                    run_id,
                    item_id,
                    error,
                } => match self.active.as_ref().filter(|handle| handle.run_id() == run_id) {
                    Some(handle) => {
                        if let Err(err) = handle.mark_failed(item_id, error) {
                            migrator_warn!("Could not fail item {}: {}", item_id, err);
                        }
                    }
                    None => migrator_warn!("Ignoring fault for inactive run {}", run_id),
                },
                Effect::ExportReport { summary, items } => {
                    let generated_utc = Utc::now().to_rfc3339();
                    match export_report(&self.report_dir, &summary, &items, &generated_utc) {
                        Ok(paths) => notices.push(Notice::ReportWritten {
                            markdown: paths.markdown,
                            manifest: paths.manifest,
                        }),
                        Err(err) => {
                            migrator_error!("Report export failed: {}", err);
                            notices.push(Notice::ReportFailed(err.to_string()));
                        }
                    }
                }
            }
        }
        notices
    }
}
