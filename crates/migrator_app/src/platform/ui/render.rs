use std::fmt::Write as _;

use migrator_core::{AppViewModel, MigrationSummary, ObjectKind, TransferView, WizardStep};

use crate::platform::effects::Notice;

/// Full text screen for the current view.
pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", stepper(view));
    let _ = writeln!(out, "{}", "-".repeat(72));
    match view.step {
        WizardStep::Selection => render_selection(&mut out, view),
        WizardStep::Configuration => render_configuration(&mut out, view),
        WizardStep::Preview => render_preview(&mut out, view),
        WizardStep::Transfer => {
            if let Some(transfer) = &view.transfer {
                render_transfer(&mut out, transfer);
            }
        }
        WizardStep::Complete => match &view.summary {
            Some(summary) => render_summary(&mut out, summary),
            None => out.push_str("Migration complete.\n"),
        },
    }
    let _ = writeln!(out, "{}", actions(view));
    out
}

/// `✓` marks completed steps, `>` the current one.
pub fn stepper(view: &AppViewModel) -> String {
    view.steps
        .iter()
        .enumerate()
        .map(|(i, step)| {
            let marker = if step.current {
                '>'
            } else if step.completed {
                '✓'
            } else {
                ' '
            };
            format!("{marker} {}. {}", i + 1, step.title)
        })
        .collect::<Vec<_>>()
        .join("   ")
}

fn render_selection(out: &mut String, view: &AppViewModel) {
    let _ = writeln!(out, "Source database: {}", view.source_name);
    out.push_str("Choose an Access database (.mdb or .accdb) with `source <file>`.\n");
}

fn render_configuration(out: &mut String, view: &AppViewModel) {
    let target = &view.target;
    let _ = writeln!(out, "Host:     {}", target.host);
    let _ = writeln!(out, "Port:     {}", target.port);
    let _ = writeln!(out, "Database: {}", target.database);
    let _ = writeln!(out, "Username: {}", target.username);
    let _ = writeln!(out, "Password: {}", target.password_masked);
}

fn render_preview(out: &mut String, view: &AppViewModel) {
    for tab in &view.catalog {
        let _ = writeln!(out, "{}", tab.title);
        for object in &tab.objects {
            let check = if object.selected { "[x]" } else { "[ ]" };
            if tab.kind == ObjectKind::Procedure {
                let _ = writeln!(out, "  {check} {}", object.name);
            } else {
                let _ = writeln!(out, "  {check} {} ({} records)", object.name, object.record_count);
            }
        }
    }
    let _ = writeln!(out, "{} of {} selected", view.selected_count, view.total_count);
}

fn render_transfer(out: &mut String, transfer: &TransferView) {
    for row in &transfer.rows {
        let _ = write!(
            out,
            "{:>3}. {:<22} {:<9} {:<11} {:>3}%",
            row.id.0,
            row.name,
            row.kind.label(),
            row.status.label(),
            row.progress
        );
        if let (Some(done), Some(total)) = (row.records_transferred, row.record_count) {
            let _ = write!(out, "  {done} of {total} transferred");
        }
        if let Some(error) = &row.error {
            let _ = write!(out, "  error: {error}");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "Overall: {}%   Remaining: {}   {} of {} completed",
        transfer.overall_progress,
        transfer.eta_text(),
        transfer.completed_count,
        transfer.total_count
    );
}

fn render_summary(out: &mut String, summary: &MigrationSummary) {
    let _ = writeln!(out, "Migrated {} to {}", summary.source_name, summary.target);
    let _ = writeln!(out, "Tables migrated:            {}", summary.tables_migrated);
    let _ = writeln!(out, "Queries migrated:           {}", summary.queries_migrated);
    let _ = writeln!(out, "Stored procedures migrated: {}", summary.procedures_migrated);
    let _ = writeln!(out, "Failed:                     {}", summary.failed);
    if summary.not_started > 0 {
        let _ = writeln!(out, "Not started:                {}", summary.not_started);
    }
    let _ = writeln!(out, "Records transferred:        {}", summary.records_transferred);
}

fn actions(view: &AppViewModel) -> String {
    let mut actions = Vec::new();
    if view.can_go_back {
        actions.push("back");
    }
    if view.can_go_next {
        actions.push("next");
    }
    if view.can_start_new {
        actions.push("export");
        actions.push("new");
    }
    actions.push("help");
    actions.push("quit");
    format!("[{}]", actions.join(" | "))
}

pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::ReportWritten { markdown, manifest } => format!(
            "Report written to {} (manifest {})",
            markdown.display(),
            manifest.display()
        ),
        Notice::ReportFailed(reason) => format!("Report export failed: {reason}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_core::{update, AppState, Msg, TargetField, TransferSnapshot};
    use pretty_assertions::assert_eq;

    fn at_preview() -> AppState {
        let state = AppState::new();
        let (state, _) = update(state, Msg::NextClicked);
        let (state, _) = update(
            state,
            Msg::TargetFieldChanged {
                field: TargetField::Password,
                value: "hunter2".into(),
            },
        );
        let (state, _) = update(state, Msg::NextClicked);
        state
    }

    #[test]
    fn stepper_marks_completed_and_current() {
        let view = at_preview().view();
        assert_eq!(
            stepper(&view),
            concat!(
                "✓ 1. Database Selection   ✓ 2. MySQL Configuration   > 3. Database Preview",
                "     4. Transfer Progress     5. Complete"
            )
        );
    }

    #[test]
    fn preview_lists_tabs_and_selection_count() {
        let text = render(&at_preview().view());
        assert!(text.contains("Tables (7)"));
        assert!(text.contains("Stored Procedures (3)"));
        assert!(text.contains("  [x] Orders (830 records)"));
        assert!(text.contains("  [ ] TopCustomers (10 records)"));
        assert!(text.contains("  [x] CalculateOrderTotal\n"));
        assert!(text.contains("11 of 15 selected"));
        assert!(text.ends_with("[back | next | help | quit]\n"));
    }

    #[test]
    fn configuration_masks_password() {
        let (state, _) = update(AppState::new(), Msg::NextClicked);
        let (state, _) = update(
            state,
            Msg::TargetFieldChanged {
                field: TargetField::Password,
                value: "hunter2".into(),
            },
        );
        let text = render(&state.view());
        assert!(text.contains("Password: •••••••"));
        assert!(!text.contains("hunter2"));
    }

    #[test]
    fn transfer_shows_records_eta_and_counts() {
        let (state, _) = update(at_preview(), Msg::NextClicked);
        let run_id = state.active_run().expect("run started");
        let mut items = state.transfer_items().to_vec();
        items[1].status = migrator_core::TransferStatus::InProgress;
        items[1].progress = 40;
        items[1].records_transferred = Some(332);
        let (state, _) = update(
            state,
            Msg::TransferProgress(TransferSnapshot {
                run_id,
                tick: 20,
                revision: 20,
                items,
                overall_progress: 40,
                estimated_seconds_remaining: 180,
            }),
        );

        let text = render(&state.view());
        assert!(text.contains("332 of 830 transferred"));
        assert!(text.contains("Overall: 40%   Remaining: 3 minutes   0 of 11 completed"));
        assert!(text.ends_with("[help | quit]\n"));
    }
}
