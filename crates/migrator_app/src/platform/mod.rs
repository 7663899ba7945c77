mod app;
mod config;
mod effects;
mod input;
pub mod logging;
mod ui;

pub use app::run_app;
