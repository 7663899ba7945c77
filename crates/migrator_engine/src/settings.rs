use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the run-level progress figure is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverallProgress {
    /// Independent counter advanced by `overall_step` every tick.
    #[default]
    Counter,
    /// Floor of the mean item progress, terminal items counting as 100.
    MeanOfItems,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSettings {
    pub tick_interval: Duration,
    /// Percentage points an in-progress item gains per tick.
    pub progress_step: u8,
    /// Chance per tick that a pending item starts.
    pub promotion_probability: f64,
    pub overall_step: u8,
    pub overall_policy: OverallProgress,
    pub seconds_per_percent: u64,
    /// Fixed seed for reproducible runs; fresh entropy when unset.
    pub seed: Option<u64>,
    /// Safety ceiling on the number of ticks a run may take.
    pub max_ticks: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            progress_step: 5,
            promotion_probability: 0.3,
            overall_step: 2,
            overall_policy: OverallProgress::Counter,
            seconds_per_percent: 3,
            seed: None,
            max_ticks: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("promotion probability must be in (0, 1], got {0}")]
    PromotionProbability(f64),
    #[error("{field} must be between 1 and 100, got {value}")]
    Step { field: &'static str, value: u8 },
    #[error("tick interval must be non-zero")]
    ZeroInterval,
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let p = self.promotion_probability;
        if !(p > 0.0 && p <= 1.0) {
            return Err(SettingsError::PromotionProbability(p));
        }
        for (field, value) in [
            ("progress_step", self.progress_step),
            ("overall_step", self.overall_step),
        ] {
            if !(1..=100).contains(&value) {
                return Err(SettingsError::Step { field, value });
            }
        }
        if self.tick_interval.is_zero() {
            return Err(SettingsError::ZeroInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimulationSettings::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad_p = SimulationSettings {
            promotion_probability: 0.0,
            ..SimulationSettings::default()
        };
        assert_eq!(bad_p.validate(), Err(SettingsError::PromotionProbability(0.0)));

        let nan_p = SimulationSettings {
            promotion_probability: f64::NAN,
            ..SimulationSettings::default()
        };
        assert!(nan_p.validate().is_err());

        let bad_step = SimulationSettings {
            progress_step: 0,
            ..SimulationSettings::default()
        };
        assert_eq!(
            bad_step.validate(),
            Err(SettingsError::Step {
                field: "progress_step",
                value: 0
            })
        );

        let bad_tick = SimulationSettings {
            tick_interval: std::time::Duration::ZERO,
            ..SimulationSettings::default()
        };
        assert_eq!(bad_tick.validate(), Err(SettingsError::ZeroInterval));
    }
}
