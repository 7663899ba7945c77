use migrator_logging::migrator_debug;

use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourceChosen(path) => {
            state.choose_source(&path);
            Vec::new()
        }
        Msg::TargetFieldChanged { field, value } => {
            state.set_target_field(field, value);
            Vec::new()
        }
        Msg::SelectionToggled { kind, name } => {
            state.toggle_selection(kind, &name);
            Vec::new()
        }
        Msg::NextClicked => state.advance().unwrap_or_else(|err| {
            migrator_debug!("Next rejected at {:?}: {}", state.current_step(), err);
            Vec::new()
        }),
        Msg::PreviousClicked => {
            if let Err(err) = state.retreat() {
                migrator_debug!("Previous rejected at {:?}: {}", state.current_step(), err);
            }
            Vec::new()
        }
        Msg::StartNewMigrationClicked => state.reset(),
        Msg::ItemFailed { item_id, error } => {
            state.request_item_failure(item_id, error).into_iter().collect()
        }
        Msg::ExportReportClicked => state.export_request().into_iter().collect(),
        Msg::TransferProgress(snapshot) => {
            state.apply_snapshot(snapshot);
            Vec::new()
        }
        Msg::TransferCompleted { run_id } => {
            state.apply_completion(run_id);
            Vec::new()
        }
        Msg::TransferExhausted { run_id } => {
            state.apply_exhausted(run_id);
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}
