//! Migrator engine: transfer simulation, timer-driven runner and report export.
mod engine;
mod persist;
mod report;
mod settings;
mod simulation;
mod sink;
mod types;

pub use engine::{EngineHandle, TransferHandle};
pub use persist::{ensure_report_dir, AtomicFileWriter, PersistError};
pub use report::{
    build_manifest, build_markdown_report, export_report, report_base_name, ReportError,
    ReportPaths,
};
pub use settings::{OverallProgress, SettingsError, SimulationSettings};
pub use simulation::{CompletionLatch, Simulation};
pub use sink::{ChannelProgressSink, ProgressSink};
pub use types::{EngineEvent, TickOutcome, TransferError};
