use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use migrator_core::{
    update, AppState, Catalog, Effect, MigratableObject, Msg, TransferItemId, TransferStatus,
};
use migrator_engine::{
    EngineEvent, EngineHandle, OverallProgress, ProgressSink, SettingsError, SimulationSettings,
    TransferError,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(migrator_logging::initialize_for_tests);
}

fn objects() -> Vec<MigratableObject> {
    Catalog::sample().selected_subset()
}

fn fast(policy: OverallProgress) -> SimulationSettings {
    SimulationSettings {
        tick_interval: Duration::from_millis(5),
        promotion_probability: 1.0,
        overall_policy: policy,
        seed: Some(11),
        ..SimulationSettings::default()
    }
}

/// Drains events until `Completed` for `run_id` or the deadline passes.
fn wait_for_completion(engine: &EngineHandle, run_id: u64, timeout: Duration) -> Vec<EngineEvent> {
    let deadline = Instant::now() + timeout;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match engine.recv_timeout(remaining) {
            Some(event) => {
                let done = event == EngineEvent::Completed { run_id };
                events.push(event);
                if done {
                    break;
                }
            }
            None => break,
        }
    }
    events
}

#[test]
fn run_streams_snapshots_then_completes_once() {
    init_logging();
    let engine = EngineHandle::new(fast(OverallProgress::MeanOfItems)).expect("valid settings");
    let handle = engine.start_transfer(7, &objects());
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    handle.on_complete(move |snapshot| {
        assert_eq!(snapshot.overall_progress, 100);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let events = wait_for_completion(&engine, 7, Duration::from_secs(10));
    assert_eq!(events.last(), Some(&EngineEvent::Completed { run_id: 7 }));

    let ticks: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(snapshot) => Some(snapshot.tick),
            _ => None,
        })
        .collect();
    assert_eq!(ticks, (1..=21).collect::<Vec<_>>());

    thread::sleep(Duration::from_millis(50));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(engine.try_recv().is_none());
    assert!(handle.is_complete());
}

#[test]
fn late_completion_callback_runs_immediately() {
    init_logging();
    let engine = EngineHandle::new(fast(OverallProgress::MeanOfItems)).expect("valid settings");
    let handle = engine.start_transfer(1, &objects());
    wait_for_completion(&engine, 1, Duration::from_secs(10));

    let (tx, rx) = mpsc::channel();
    handle.on_complete(move |snapshot| {
        let _ = tx.send(snapshot.tick);
    });
    assert_eq!(rx.try_recv(), Ok(21));
}

#[test]
fn cancel_stops_ticking_and_drops_callbacks() {
    init_logging();
    let settings = SimulationSettings {
        tick_interval: Duration::from_millis(10),
        ..fast(OverallProgress::Counter)
    };
    let engine = EngineHandle::new(settings).expect("valid settings");
    let handle = engine.start_transfer(2, &objects());
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    handle.on_complete(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    assert!(matches!(
        engine.recv_timeout(Duration::from_secs(5)),
        Some(EngineEvent::Progress(_))
    ));
    handle.cancel();
    let frozen = handle.snapshot();
    thread::sleep(Duration::from_millis(150));

    assert!(handle.is_cancelled());
    assert!(!handle.is_complete());
    assert_eq!(handle.snapshot(), frozen);
    while let Some(event) = engine.try_recv() {
        assert!(!matches!(event, EngineEvent::Completed { .. }), "{event:?}");
    }
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(
        handle.mark_failed(TransferItemId(1), "too late"),
        Err(TransferError::RunFinished(2))
    );
}

#[test]
fn fault_injection_publishes_a_snapshot() {
    init_logging();
    let settings = SimulationSettings {
        tick_interval: Duration::from_secs(60),
        ..SimulationSettings::default()
    };
    let engine = EngineHandle::new(settings).expect("valid settings");
    let handle = engine.start_transfer(3, &objects());

    handle
        .mark_failed(TransferItemId(9), "Syntax error in query")
        .expect("item is pending");
    match engine.recv_timeout(Duration::from_secs(1)) {
        Some(EngineEvent::Progress(snapshot)) => {
            let item = snapshot.item(TransferItemId(9)).expect("item exists");
            assert_eq!(item.name, "ProductsByCategory");
            assert_eq!(item.status, TransferStatus::Failed);
            assert_eq!(item.error.as_deref(), Some("Syntax error in query"));
            assert_eq!(snapshot.tick, 0);
        }
        other => panic!("expected a progress snapshot, got {other:?}"),
    }
    assert_eq!(
        handle.mark_failed(TransferItemId(9), "again"),
        Err(TransferError::AlreadyTerminal {
            id: TransferItemId(9),
            status: TransferStatus::Failed
        })
    );
    handle.cancel();
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: EngineEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

#[test]
fn custom_sink_receives_every_event() {
    init_logging();
    let sink = Arc::new(RecordingSink::default());
    let engine = EngineHandle::with_sink(fast(OverallProgress::MeanOfItems), sink.clone())
        .expect("valid settings");
    let handle = engine.start_seeded(5, &objects(), 99);
    let (tx, rx) = mpsc::channel();
    handle.on_complete(move |_| {
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(10)).expect("run completes");
    thread::sleep(Duration::from_millis(20));

    let events = sink.events.lock().expect("sink lock").clone();
    assert_eq!(events.len(), 22);
    assert_eq!(events.last(), Some(&EngineEvent::Completed { run_id: 5 }));
    assert!(engine.try_recv().is_none());
}

/// Holds the first event until the test releases it, recording delivery order.
struct HeldSink {
    events: Mutex<Vec<EngineEvent>>,
    held: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
}

impl HeldSink {
    fn new(held: mpsc::Sender<()>, release: mpsc::Receiver<()>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            held: Mutex::new(Some((held, release))),
        }
    }

    fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for HeldSink {
    fn emit(&self, event: EngineEvent) {
        let gate = self
            .held
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some((held, release)) = gate {
            let _ = held.send(());
            let _ = release.recv();
        }
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

#[test]
fn failure_during_a_tick_emit_is_not_undone_by_the_tick_snapshot() {
    init_logging();
    let state = AppState::new();
    let (state, _) = update(state, Msg::NextClicked);
    let (state, _) = update(state, Msg::NextClicked);
    let (mut state, effects) = update(state, Msg::NextClicked);
    let [Effect::StartTransfer { run_id, objects }] = effects.as_slice() else {
        panic!("expected a single StartTransfer, got {effects:?}");
    };

    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let sink = Arc::new(HeldSink::new(held_tx, release_rx));
    let settings = SimulationSettings {
        max_ticks: Some(1),
        ..fast(OverallProgress::Counter)
    };
    let engine = EngineHandle::with_sink(settings, sink.clone()).expect("valid settings");
    let handle = engine.start_transfer(*run_id, objects);

    held_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("tick 1 reaches the sink");
    handle
        .mark_failed(TransferItemId(1), "Syntax error in query")
        .expect("item is running");
    release_tx.send(()).expect("sink is waiting");

    let deadline = Instant::now() + Duration::from_secs(5);
    let events = loop {
        let events = sink.events();
        if events.contains(&EngineEvent::Exhausted { run_id: *run_id }) {
            break events;
        }
        assert!(Instant::now() < deadline, "run never stopped: {events:?}");
        thread::sleep(Duration::from_millis(5));
    };
    let revisions: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::Progress(snapshot) => Some(snapshot.revision),
            _ => None,
        })
        .collect();
    assert_eq!(revisions, vec![2, 1]);

    for event in events {
        let msg = match event {
            EngineEvent::Progress(snapshot) => Msg::TransferProgress(snapshot),
            EngineEvent::Completed { run_id } => Msg::TransferCompleted { run_id },
            EngineEvent::Exhausted { run_id } => Msg::TransferExhausted { run_id },
        };
        state = update(state, msg).0;
    }

    let engine_item = handle.snapshot().item(TransferItemId(1)).cloned();
    assert_eq!(engine_item.as_ref().map(|item| item.status), Some(TransferStatus::Failed));
    assert_eq!(state.transfer_items().first(), engine_item.as_ref());
}

#[test]
fn tick_ceiling_reports_exhaustion() {
    init_logging();
    let settings = SimulationSettings {
        max_ticks: Some(3),
        ..fast(OverallProgress::Counter)
    };
    let engine = EngineHandle::new(settings).expect("valid settings");
    let handle = engine.start_transfer(8, &objects());

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut last = None;
    while Instant::now() < deadline {
        match engine.recv_timeout(Duration::from_millis(200)) {
            Some(event @ EngineEvent::Exhausted { .. }) => {
                last = Some(event);
                break;
            }
            _ => {}
        }
    }
    assert_eq!(last, Some(EngineEvent::Exhausted { run_id: 8 }));
    assert!(!handle.is_complete());
    assert_eq!(handle.snapshot().tick, 3);
}

#[test]
fn invalid_settings_fail_at_construction() {
    let settings = SimulationSettings {
        overall_step: 0,
        ..SimulationSettings::default()
    };
    assert!(matches!(
        EngineHandle::new(settings),
        Err(SettingsError::Step {
            field: "overall_step",
            value: 0
        })
    ));
}
