#![deny(missing_docs)]
//! Shared logging utilities for the migrator workspace.
//!
//! This crate provides the `migrator_*` logging macros used across the
//! codebase. Every line is tagged with the simulation tick of the calling
//! thread, so timer-driven engine output can be correlated with the
//! session messages it produced.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the current simulation tick count.
    static SIM_TICK: Cell<u64> = const { Cell::new(0) };
}

/// Sets the simulation tick count for the current thread.
/// The engine runner calls this once per tick before advancing a run.
pub fn set_sim_tick(tick: u64) {
    SIM_TICK.with(|v| v.set(tick));
}

/// Retrieves the simulation tick count for the current thread.
/// Returns 0 if the tick has not been set.
pub fn get_sim_tick() -> u64 {
    SIM_TICK.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current simulation tick.
#[macro_export]
macro_rules! migrator_trace {
    ($($arg:tt)*) => {{
        log::trace!("[t{}] {}", $crate::get_sim_tick(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current simulation tick.
#[macro_export]
macro_rules! migrator_info {
    ($($arg:tt)*) => {{
        log::info!("[t{}] {}", $crate::get_sim_tick(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current simulation tick.
#[macro_export]
macro_rules! migrator_debug {
    ($($arg:tt)*) => {{
        log::debug!("[t{}] {}", $crate::get_sim_tick(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current simulation tick.
#[macro_export]
macro_rules! migrator_warn {
    ($($arg:tt)*) => {{
        log::warn!("[t{}] {}", $crate::get_sim_tick(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current simulation tick.
#[macro_export]
macro_rules! migrator_error {
    ($($arg:tt)*) => {{
        log::error!("[t{}] {}", $crate::get_sim_tick(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_tick_is_per_thread() {
        set_sim_tick(7);
        assert_eq!(get_sim_tick(), 7);

        let other = std::thread::spawn(get_sim_tick).join().unwrap();
        assert_eq!(other, 0);
    }
}
