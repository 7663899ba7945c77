use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Context};
use migrator_core::{AppViewModel, Msg, ObjectKind, TargetField, TransferItemId, TransferStatus, WizardStep};
use migrator_logging::{migrator_info, migrator_warn};

use crate::cli::FaultSpec;

pub const HELP: &str = "\
commands:
  source <file>                      choose the Access database (.mdb/.accdb)
  set <host|port|database|username|password> <value>
  toggle <table|query|procedure> <name>
  next | back                        move between steps
  fail <item id> <message>           fail a running transfer item
  export                             write the migration report
  new                                start a new migration
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Core(Msg),
    Help,
    Quit,
}

/// Parses one line typed at the prompt. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let command = match word.to_ascii_lowercase().as_str() {
        "next" | "n" => Command::Core(Msg::NextClicked),
        "back" | "previous" | "b" => Command::Core(Msg::PreviousClicked),
        "export" => Command::Core(Msg::ExportReportClicked),
        "new" => Command::Core(Msg::StartNewMigrationClicked),
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        "source" => {
            if rest.is_empty() {
                bail!("usage: source <file>");
            }
            Command::Core(Msg::SourceChosen(rest.to_string()))
        }
        "set" => {
            let (field, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field: TargetField = field.parse()?;
            Command::Core(Msg::TargetFieldChanged {
                field,
                value: value.trim().to_string(),
            })
        }
        "toggle" => {
            let (kind, name) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: toggle <table|query|procedure> <name>"))?;
            let kind: ObjectKind = kind.parse()?;
            Command::Core(Msg::SelectionToggled {
                kind,
                name: name.trim().to_string(),
            })
        }
        "fail" => {
            let (id, message) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| anyhow!("usage: fail <item id> <message>"))?;
            let id: u64 = id.parse().with_context(|| format!("bad item id {id:?}"))?;
            Command::Core(Msg::ItemFailed {
                item_id: TransferItemId(id),
                error: message.trim().to_string(),
            })
        }
        other => bail!("unknown command {other:?}; type help"),
    };
    Ok(Some(command))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoAction {
    Send(Vec<Msg>),
    Wait,
    Quit,
}

/// Scripted user for `--auto`: fills each step once, injects the requested
/// faults while the transfer runs, exports the report and quits.
pub struct AutoPilot {
    source: String,
    faults: Vec<FaultSpec>,
    injected: BTreeSet<String>,
    visited: BTreeSet<WizardStep>,
    exported: bool,
}

impl AutoPilot {
    pub fn new(source: impl Into<String>, faults: Vec<FaultSpec>) -> Self {
        Self {
            source: source.into(),
            faults,
            injected: BTreeSet::new(),
            visited: BTreeSet::new(),
            exported: false,
        }
    }

    pub fn step(&mut self, view: &AppViewModel) -> AutoAction {
        match view.step {
            WizardStep::Transfer => self.inject_faults(view),
            WizardStep::Complete if !self.exported => {
                self.exported = true;
                AutoAction::Send(vec![Msg::ExportReportClicked])
            }
            WizardStep::Complete => AutoAction::Quit,
            step => {
                if !self.visited.insert(step) {
                    return AutoAction::Wait;
                }
                let mut msgs = self.fill(step);
                msgs.push(Msg::NextClicked);
                AutoAction::Send(msgs)
            }
        }
    }

    fn fill(&self, step: WizardStep) -> Vec<Msg> {
        match step {
            WizardStep::Selection => vec![Msg::SourceChosen(self.source.clone())],
            WizardStep::Configuration => [
                (TargetField::Host, "localhost"),
                (TargetField::Database, "migrated"),
                (TargetField::Username, "root"),
            ]
            .into_iter()
            .map(|(field, value)| Msg::TargetFieldChanged {
                field,
                value: value.to_string(),
            })
            .collect(),
            _ => Vec::new(),
        }
    }

    fn inject_faults(&mut self, view: &AppViewModel) -> AutoAction {
        let Some(transfer) = view.transfer.as_ref() else {
            return AutoAction::Wait;
        };
        let mut msgs = Vec::new();
        for fault in &self.faults {
            if self.injected.contains(&fault.name) {
                continue;
            }
            let Some(row) = transfer.rows.iter().find(|row| row.name == fault.name) else {
                migrator_warn!("No transfer item named {:?}; skipping fault", fault.name);
                self.injected.insert(fault.name.clone());
                continue;
            };
            if row.status == TransferStatus::InProgress {
                migrator_info!("Injecting fault into {} ({})", row.name, row.id);
                msgs.push(Msg::ItemFailed {
                    item_id: row.id,
                    error: fault.message.clone(),
                });
                self.injected.insert(fault.name.clone());
            } else if row.status != TransferStatus::Pending {
                self.injected.insert(fault.name.clone());
            }
        }
        if msgs.is_empty() {
            AutoAction::Wait
        } else {
            AutoAction::Send(msgs)
        }
    }
}
