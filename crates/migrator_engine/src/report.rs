use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use migrator_core::{MigrationSummary, ObjectKind, TransferItem};
use migrator_logging::migrator_info;
use serde_json::json;
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("could not encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub markdown: PathBuf,
    pub manifest: PathBuf,
}

/// `{source stem}--migration-report`, safe to use as a file name on Windows.
pub fn report_base_name(source_name: &str) -> String {
    let stem = source_name
        .rsplit_once('.')
        .map_or(source_name, |(stem, _)| stem);
    format!("{}--migration-report", sanitize_stem(stem))
}

fn sanitize_stem(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        let c = if is_forbidden(c) || c.is_whitespace() { '_' } else { c };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let mut out = out.trim_matches(&['_', '.'][..]).to_string();
    if out.is_empty() {
        out = "database".to_string();
    }
    if out.len() > 64 {
        let mut cut = 64;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }
    if is_reserved_windows_name(&out) {
        out.push('_');
    }
    out
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &["CON", "PRN", "AUX", "NUL"];
    let numbered_device = match (name.get(..3), name.get(3..)) {
        (Some(prefix), Some(digit)) => {
            (prefix.eq_ignore_ascii_case("COM") || prefix.eq_ignore_ascii_case("LPT"))
                && matches!(digit, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9")
        }
        _ => false,
    };
    numbered_device || RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Markdown report with a front-matter header.
pub fn build_markdown_report(
    summary: &MigrationSummary,
    items: &[TransferItem],
    generated_utc: &str,
) -> String {
    let migrated = summary.tables_migrated + summary.queries_migrated + summary.procedures_migrated;
    let mut doc = format!(
        "---\nsource: {source}\ntarget: {target}\ngenerated_utc: {generated_utc}\ntotal_items: {total}\nmigrated: {migrated}\nfailed: {failed}\nrecords_transferred: {records}\n---\n\n",
        source = summary.source_name,
        target = summary.target,
        total = summary.total_items,
        failed = summary.failed,
        records = summary.records_transferred,
    );

    let _ = writeln!(doc, "# Migration report: {}\n", summary.source_name);
    let _ = writeln!(doc, "| Kind | Migrated |\n|---|---|");
    for (kind, count) in [
        (ObjectKind::Table, summary.tables_migrated),
        (ObjectKind::Query, summary.queries_migrated),
        (ObjectKind::Procedure, summary.procedures_migrated),
    ] {
        let _ = writeln!(doc, "| {} | {} |", kind.plural_label(), count);
    }
    let _ = writeln!(
        doc,
        "\n{} failed, {} not started, {} records transferred in {} ticks.\n",
        summary.failed, summary.not_started, summary.records_transferred, summary.ticks_elapsed
    );

    let _ = writeln!(doc, "## Items\n");
    let _ = writeln!(doc, "| # | Name | Kind | Status | Progress | Records | Error |");
    let _ = writeln!(doc, "|---|---|---|---|---|---|---|");
    for item in items {
        let records = match (item.records_transferred, item.record_count) {
            (Some(done), Some(total)) => format!("{done} of {total}"),
            _ => "-".to_string(),
        };
        let _ = writeln!(
            doc,
            "| {} | {} | {} | {} | {}% | {} | {} |",
            item.id,
            table_cell(&item.name),
            item.kind,
            item.status.label(),
            item.progress,
            records,
            table_cell(item.error.as_deref().unwrap_or(""))
        );
    }
    doc
}

/// Keeps free text inside one Markdown table cell.
fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

pub fn build_manifest(
    summary: &MigrationSummary,
    items: &[TransferItem],
    generated_utc: &str,
) -> serde_json::Value {
    json!({
        "generated_utc": generated_utc,
        "summary": summary,
        "items": items.iter().map(|item| {
            json!({
                "id": item.id.0,
                "name": item.name,
                "kind": item.kind.label(),
                "status": item.status.label(),
                "progress": item.progress,
                "record_count": item.record_count,
                "records_transferred": item.records_transferred,
                "error": item.error,
            })
        }).collect::<Vec<_>>()
    })
}

/// Writes `{base}.md` and `{base}.json` into `dir`.
pub fn export_report(
    dir: &Path,
    summary: &MigrationSummary,
    items: &[TransferItem],
    generated_utc: &str,
) -> Result<ReportPaths, ReportError> {
    let base = report_base_name(&summary.source_name);
    let writer = AtomicFileWriter::new(dir);
    let markdown = writer.write(
        &format!("{base}.md"),
        &build_markdown_report(summary, items, generated_utc),
    )?;
    let manifest_text = serde_json::to_string_pretty(&build_manifest(summary, items, generated_utc))?;
    let manifest = writer.write(&format!("{base}.json"), &manifest_text)?;
    migrator_info!("Report written to {}", markdown.display());
    Ok(ReportPaths { markdown, manifest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_uses_sanitized_stem() {
        assert_eq!(report_base_name("Sample.accdb"), "Sample--migration-report");
        assert_eq!(report_base_name("My Orders:2024.mdb"), "My_Orders_2024--migration-report");
        assert_eq!(report_base_name(".accdb"), "database--migration-report");
        assert_eq!(report_base_name("com1.mdb"), "com1_--migration-report");
        assert_eq!(report_base_name("COMX.mdb"), "COMX--migration-report");
    }

    #[test]
    fn error_text_cannot_split_a_table_row() {
        assert_eq!(table_cell("a | b\nc"), "a \\| b c");
        assert_eq!(table_cell("plain"), "plain");
    }
}
