use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use migrator_engine::{OverallProgress, SimulationSettings};
use serde::Deserialize;

use super::logging::LogDestination;
use crate::cli::Cli;

const DEFAULT_CONFIG_FILE: &str = "migrator.ron";

/// RON form of [`SimulationSettings`]; the tick interval is in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationSettingsConfig {
    pub tick_ms: u64,
    pub progress_step: u8,
    pub promotion_probability: f64,
    pub overall_step: u8,
    pub overall_policy: OverallProgress,
    pub seconds_per_percent: u64,
    pub seed: Option<u64>,
    pub max_ticks: Option<u64>,
}

impl Default for SimulationSettingsConfig {
    fn default() -> Self {
        let defaults = SimulationSettings::default();
        Self {
            tick_ms: u64::try_from(defaults.tick_interval.as_millis()).unwrap_or(1000),
            progress_step: defaults.progress_step,
            promotion_probability: defaults.promotion_probability,
            overall_step: defaults.overall_step,
            overall_policy: defaults.overall_policy,
            seconds_per_percent: defaults.seconds_per_percent,
            seed: defaults.seed,
            max_ticks: defaults.max_ticks,
        }
    }
}

impl SimulationSettingsConfig {
    pub fn to_settings(&self) -> SimulationSettings {
        SimulationSettings {
            tick_interval: Duration::from_millis(self.tick_ms),
            progress_step: self.progress_step,
            promotion_probability: self.promotion_probability,
            overall_step: self.overall_step,
            overall_policy: self.overall_policy,
            seconds_per_percent: self.seconds_per_percent,
            seed: self.seed,
            max_ticks: self.max_ticks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationSettingsConfig,
    pub report_dir: PathBuf,
    pub log_destination: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationSettingsConfig::default(),
            report_dir: PathBuf::from("reports"),
            log_destination: LogDestination::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, or `./migrator.ron` when no path is given and the file
    /// exists. Missing fields take their defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.is_file() {
                    return Ok(Self::default());
                }
                fallback
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Command-line flags win over the file.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(seed) = cli.seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(tick_ms) = cli.tick_ms {
            self.simulation.tick_ms = tick_ms;
        }
        if let Some(destination) = cli.log {
            self.log_destination = destination;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::parse(
            "(simulation: (tick_ms: 50, overall_policy: MeanOfItems), log_destination: Both)",
        )
        .expect("valid ron");
        assert_eq!(config.simulation.tick_ms, 50);
        assert_eq!(config.simulation.overall_policy, OverallProgress::MeanOfItems);
        assert_eq!(config.simulation.progress_step, 5);
        assert_eq!(config.report_dir, PathBuf::from("reports"));
        assert_eq!(config.log_destination, LogDestination::Both);

        let settings = config.simulation.to_settings();
        assert_eq!(settings.tick_interval, Duration::from_millis(50));
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn default_round_trips_to_engine_defaults() {
        assert_eq!(
            SimulationSettingsConfig::default().to_settings(),
            SimulationSettings::default()
        );
    }

    #[test]
    fn cli_overrides_file() {
        let mut config = AppConfig::parse("(simulation: (seed: Some(1), tick_ms: 500))").expect("valid ron");
        let cli = Cli::try_parse_from(["migrator", "--seed", "9", "--tick-ms", "20", "--log", "terminal"])
            .expect("valid arguments");
        config.apply_cli(&cli);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.tick_ms, 20);
        assert_eq!(config.log_destination, LogDestination::Terminal);
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.ron");
        fs::write(&path, "(simulation: (tick_ms: \"fast\"))").expect("write config");

        let err = AppConfig::load(Some(&path)).expect_err("invalid config");
        assert!(err.to_string().contains("parsing config"));
        assert!(AppConfig::load(Some(&dir.path().join("missing.ron"))).is_err());
    }
}
