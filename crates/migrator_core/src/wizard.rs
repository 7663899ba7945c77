use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub enum WizardStep {
    #[default]
    Selection,
    Configuration,
    Preview,
    Transfer,
    Complete,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Selection,
        WizardStep::Configuration,
        WizardStep::Preview,
        WizardStep::Transfer,
        WizardStep::Complete,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Selection => "Database Selection",
            WizardStep::Configuration => "MySQL Configuration",
            WizardStep::Preview => "Database Preview",
            WizardStep::Transfer => "Transfer Progress",
            WizardStep::Complete => "Complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("already at the last step")]
    AtLastStep,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("a transfer is in progress")]
    TransferInProgress,
    #[error("nothing is selected for transfer")]
    NothingSelected,
}

/// Facts about the session that gate leaving the preview and transfer steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepGuard {
    pub selected_count: usize,
    pub transfer_finished: bool,
}

/// Strictly ordered step sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Wizard {
    current: WizardStep,
    completed: BTreeSet<WizardStep>,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    pub fn completed_steps(&self) -> &BTreeSet<WizardStep> {
        &self.completed
    }

    pub fn is_completed(&self, step: WizardStep) -> bool {
        self.completed.contains(&step)
    }

    pub fn advance(&mut self, guard: StepGuard) -> Result<WizardStep, NavigationError> {
        let next = self.current.next().ok_or(NavigationError::AtLastStep)?;
        if self.current == WizardStep::Preview && guard.selected_count == 0 {
            return Err(NavigationError::NothingSelected);
        }
        if !self.can_advance(guard) {
            return Err(NavigationError::TransferInProgress);
        }
        self.completed.insert(self.current);
        self.current = next;
        Ok(next)
    }

    /// Back-navigation; never allowed out of a running transfer.
    pub fn retreat(&mut self) -> Result<WizardStep, NavigationError> {
        if self.current == WizardStep::Transfer {
            return Err(NavigationError::TransferInProgress);
        }
        let previous = self.current.previous().ok_or(NavigationError::AtFirstStep)?;
        self.current = previous;
        Ok(previous)
    }

    pub fn reset(&mut self) {
        self.current = WizardStep::Selection;
        self.completed.clear();
    }

    pub fn can_retreat(&self) -> bool {
        !matches!(self.current, WizardStep::Selection | WizardStep::Transfer)
    }

    /// Whether Next is offered. The transfer step is left only once its run
    /// has finished.
    pub fn can_advance(&self, guard: StepGuard) -> bool {
        match self.current {
            WizardStep::Complete => false,
            WizardStep::Transfer => guard.transfer_finished,
            _ => true,
        }
    }
}
