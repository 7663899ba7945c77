use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use migrator_core::{update, AppState, Msg};
use migrator_logging::{migrator_debug, migrator_info, migrator_warn};
use serde::Serialize;

use super::config::AppConfig;
use super::effects::{EffectRunner, Notice};
use super::input::{parse_command, AutoAction, AutoPilot, Command, HELP};
use super::{logging, ui};
use crate::cli::Cli;

const RENDER_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the message loop consumes.
pub enum Inbound {
    Core(Msg),
    Quit,
    /// Standard input reached end of file.
    InputClosed,
}

pub fn run_app(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli(&cli);
    logging::initialize(config.log_destination);

    let settings = config.simulation.to_settings();
    settings.validate()?;
    migrator_info!(
        "Starting migrator: tick {:?}, seed {:?}, reports in {}",
        settings.tick_interval,
        settings.seed,
        config.report_dir.display()
    );

    let (tx, rx) = mpsc::channel::<Inbound>();
    let runner = EffectRunner::new(settings, config.report_dir.clone(), tx.clone())?;

    // Background tick to coalesce rendering.
    let tick_tx = tx.clone();
    thread::spawn(move || {
        while tick_tx.send(Inbound::Core(Msg::Tick)).is_ok() {
            thread::sleep(RENDER_INTERVAL);
        }
    });

    let pilot = if cli.auto {
        Some(AutoPilot::new(cli.source.clone(), cli.faults.clone()))
    } else {
        spawn_stdin_reader(tx.clone());
        None
    };
    drop(tx);

    let mut session = Session::new(runner, pilot, cli.json, Box::new(io::stdout()));
    session.redraw();
    session.run(rx);
    Ok(())
}

fn spawn_stdin_reader(tx: mpsc::Sender<Inbound>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(Command::Core(msg))) => {
                    if tx.send(Inbound::Core(msg)).is_err() {
                        return;
                    }
                }
                Ok(Some(Command::Help)) => print_line(HELP),
                Ok(Some(Command::Quit)) => {
                    let _ = tx.send(Inbound::Quit);
                    return;
                }
                Ok(None) => {}
                Err(err) => print_line(&err.to_string()),
            }
        }
        let _ = tx.send(Inbound::InputClosed);
    });
}

fn print_line(line: &str) {
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{line}").and_then(|()| stdout.flush());
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    pilot: Option<AutoPilot>,
    json: bool,
    out: Box<dyn Write>,
    input_closed: bool,
}

impl Session {
    fn new(runner: EffectRunner, pilot: Option<AutoPilot>, json: bool, out: Box<dyn Write>) -> Self {
        Self {
            state: AppState::new(),
            runner,
            pilot,
            json,
            out,
            input_closed: false,
        }
    }

    fn run(&mut self, rx: mpsc::Receiver<Inbound>) {
        if !self.drive_pilot() {
            return;
        }
        while let Ok(inbound) = rx.recv() {
            let msg = match inbound {
                Inbound::Quit => break,
                Inbound::InputClosed => {
                    if !self.state.transfer_running() {
                        break;
                    }
                    migrator_info!("Input closed; waiting for the transfer to finish");
                    self.input_closed = true;
                    continue;
                }
                Inbound::Core(msg) => msg,
            };
            if msg == Msg::Tick {
                if self.state.consume_dirty() {
                    self.redraw();
                }
                continue;
            }
            if let (true, Msg::TransferProgress(snapshot)) = (self.json, &msg) {
                if self.write_json(snapshot).is_err() {
                    break;
                }
            }
            let exhausted = match msg {
                Msg::TransferExhausted { run_id } => Some(run_id),
                _ => None,
            };
            self.dispatch(msg);
            if let (Some(run_id), Some(_)) = (exhausted, &self.pilot) {
                migrator_warn!("Run {} gave up before completing; stopping", run_id);
                break;
            }
            if self.input_closed && !self.state.transfer_running() {
                break;
            }
            if !self.drive_pilot() {
                break;
            }
        }
        if self.state.consume_dirty() {
            self.redraw();
        }
        if self.json {
            if let Some(summary) = self.state.summary().cloned() {
                let _ = self.write_json(&summary);
            }
        }
        migrator_info!("Session ended at step {:?}", self.state.current_step());
    }

    /// One JSON document per line. Fails once the output is gone.
    fn write_json<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        let line = match serde_json::to_string(value) {
            Ok(line) => line,
            Err(err) => {
                migrator_warn!("Could not encode JSON output: {}", err);
                return Ok(());
            }
        };
        let written = writeln!(self.out, "{line}").and_then(|()| self.out.flush());
        if let Err(err) = &written {
            migrator_debug!("Output closed: {}", err);
        }
        written
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        for notice in self.runner.run(effects) {
            self.announce(&notice);
        }
    }

    /// Feeds scripted input until the pilot waits. False once it wants to quit.
    fn drive_pilot(&mut self) -> bool {
        loop {
            let Some(pilot) = self.pilot.as_mut() else {
                return true;
            };
            match pilot.step(&self.state.view()) {
                AutoAction::Send(msgs) => {
                    for msg in msgs {
                        self.dispatch(msg);
                    }
                }
                AutoAction::Wait => return true,
                AutoAction::Quit => return false,
            }
        }
    }

    fn announce(&mut self, notice: &Notice) {
        if self.json {
            return;
        }
        let _ = writeln!(self.out, "{}", ui::render::render_notice(notice));
    }

    fn redraw(&mut self) {
        if self.json {
            return;
        }
        let text = ui::render::render(&self.state.view());
        let _ = writeln!(self.out, "\n{text}").and_then(|()| self.out.flush());
    }
}
