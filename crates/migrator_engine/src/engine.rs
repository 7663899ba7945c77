use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use migrator_core::{MigratableObject, RunId, TransferItemId, TransferSnapshot};
use migrator_logging::{migrator_debug, migrator_error, migrator_info, migrator_warn, set_sim_tick};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sink::ChannelProgressSink;
use crate::{
    EngineEvent, ProgressSink, SettingsError, Simulation, SimulationSettings, TickOutcome,
    TransferError,
};

type CompletionCallback = Box<dyn FnOnce(&TransferSnapshot) + Send>;

/// Everything the timer task and the handle share for one run, behind one mutex.
struct RunState {
    simulation: Simulation,
    cancelled: bool,
    completion_delivered: bool,
    callbacks: Vec<CompletionCallback>,
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

enum EngineCommand {
    Run {
        state: Arc<Mutex<RunState>>,
        cancel: CancellationToken,
        interval: Duration,
    },
}

/// Runs transfer simulations on a background timer thread.
pub struct EngineHandle {
    settings: SimulationSettings,
    cmd_tx: mpsc::Sender<EngineCommand>,
    sink: Arc<dyn ProgressSink>,
    event_rx: Option<mpsc::Receiver<EngineEvent>>,
}

impl EngineHandle {
    /// Events are buffered for [`EngineHandle::try_recv`].
    pub fn new(settings: SimulationSettings) -> Result<Self, SettingsError> {
        let (event_tx, event_rx) = mpsc::channel();
        let mut handle = Self::with_sink(settings, Arc::new(ChannelProgressSink::new(event_tx)))?;
        handle.event_rx = Some(event_rx);
        Ok(handle)
    }

    /// Events go straight to `sink`; `try_recv` always returns `None`.
    pub fn with_sink(
        settings: SimulationSettings,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<Self, SettingsError> {
        settings.validate()?;
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let task_sink = sink.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    migrator_error!("Could not start engine runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Run {
                        state,
                        cancel,
                        interval,
                    } => {
                        runtime.spawn(drive_run(state, cancel, interval, task_sink.clone()));
                    }
                }
            }
        });

        Ok(Self {
            settings,
            cmd_tx,
            sink,
            event_rx: None,
        })
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Starts ticking a new run over `objects` and returns its handle.
    pub fn start_transfer(&self, run_id: RunId, objects: &[MigratableObject]) -> TransferHandle {
        let simulation = Simulation::prevalidated(run_id, objects, self.settings.clone());
        self.start_with(simulation)
    }

    /// Same as [`EngineHandle::start_transfer`] with a fixed seed for this run.
    pub fn start_seeded(&self, run_id: RunId, objects: &[MigratableObject], seed: u64) -> TransferHandle {
        let settings = SimulationSettings {
            seed: Some(seed),
            ..self.settings.clone()
        };
        self.start_with(Simulation::prevalidated(run_id, objects, settings))
    }

    fn start_with(&self, simulation: Simulation) -> TransferHandle {
        let run_id = simulation.run_id();
        migrator_info!(
            "Run {} starting with {} items",
            run_id,
            simulation.items().len()
        );
        let state = Arc::new(Mutex::new(RunState {
            simulation,
            cancelled: false,
            completion_delivered: false,
            callbacks: Vec::new(),
        }));
        let cancel = CancellationToken::new();
        let command = EngineCommand::Run {
            state: state.clone(),
            cancel: cancel.clone(),
            interval: self.settings.tick_interval,
        };
        if self.cmd_tx.send(command).is_err() {
            migrator_warn!("Engine thread is gone; run {} will not tick", run_id);
        }
        TransferHandle {
            run_id,
            state,
            cancel,
            sink: self.sink.clone(),
        }
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.as_ref()?.try_recv().ok()
    }

    /// Waits up to `timeout` for the next buffered event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.as_ref()?.recv_timeout(timeout).ok()
    }
}

/// Caller-side view of one running transfer.
#[derive(Clone)]
pub struct TransferHandle {
    run_id: RunId,
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    sink: Arc<dyn ProgressSink>,
}

impl TransferHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn snapshot(&self) -> TransferSnapshot {
        lock(&self.state).simulation.snapshot()
    }

    pub fn is_complete(&self) -> bool {
        lock(&self.state).simulation.is_complete()
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.state).cancelled
    }

    /// Registers `callback` for the run's single completion signal. If the run
    /// has already completed it is invoked right away.
    pub fn on_complete(&self, callback: impl FnOnce(&TransferSnapshot) + Send + 'static) {
        let snapshot = {
            let mut guard = lock(&self.state);
            if guard.cancelled {
                return;
            }
            if !guard.completion_delivered {
                guard.callbacks.push(Box::new(callback));
                return;
            }
            guard.simulation.snapshot()
        };
        callback(&snapshot);
    }

    /// Records an item-level fault and publishes the updated snapshot.
    pub fn mark_failed(
        &self,
        item_id: TransferItemId,
        error: impl Into<String>,
    ) -> Result<(), TransferError> {
        let snapshot = {
            let mut guard = lock(&self.state);
            if guard.cancelled {
                return Err(TransferError::RunFinished(self.run_id));
            }
            guard.simulation.mark_failed(item_id, error)?;
            guard.simulation.snapshot()
        };
        self.sink.emit(EngineEvent::Progress(snapshot));
        Ok(())
    }

    /// Stops the timer. No tick mutates the run after this returns.
    pub fn cancel(&self) {
        {
            let mut guard = lock(&self.state);
            if guard.cancelled {
                return;
            }
            guard.cancelled = true;
            guard.callbacks.clear();
        }
        self.cancel.cancel();
        migrator_info!("Run {} cancelled", self.run_id);
    }
}

async fn drive_run(
    state: Arc<Mutex<RunState>>,
    cancel: CancellationToken,
    interval: Duration,
    sink: Arc<dyn ProgressSink>,
) {
    let run_id = lock(&state).simulation.run_id();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let (outcome, snapshot, callbacks) = {
            let mut guard = lock(&state);
            if guard.cancelled {
                break;
            }
            let outcome = guard.simulation.tick();
            set_sim_tick(guard.simulation.ticks());
            let callbacks = if outcome == TickOutcome::Completed {
                guard.completion_delivered = true;
                std::mem::take(&mut guard.callbacks)
            } else {
                Vec::new()
            };
            (outcome, guard.simulation.snapshot(), callbacks)
        };

        match outcome {
            TickOutcome::Advanced => sink.emit(EngineEvent::Progress(snapshot)),
            TickOutcome::Completed => {
                sink.emit(EngineEvent::Progress(snapshot.clone()));
                for callback in callbacks {
                    callback(&snapshot);
                }
                sink.emit(EngineEvent::Completed { run_id });
                break;
            }
            TickOutcome::Exhausted => {
                sink.emit(EngineEvent::Exhausted { run_id });
                break;
            }
            TickOutcome::Idle => break,
        }
    }
    migrator_debug!("Timer for run {} stopped", run_id);
}
