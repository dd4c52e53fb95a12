use rowfile_core::types::{MutationReport, Record};
use serde_json::json;

use crate::executor::CommandResult;

/// Output mode for rendering command results.
pub enum OutputMode {
    /// Human-readable aligned table output.
    Pretty,
    /// Machine-parseable JSON (one object per result on stdout).
    Json,
}

/// Render a command result to stdout in the given mode.
pub fn render(result: &CommandResult, mode: &OutputMode) {
    match (result, mode) {
        (CommandResult::Rows { columns, rows }, OutputMode::Pretty) => {
            print!("{}", format_rows(columns, rows));
        }
        (CommandResult::Rows { columns, rows }, OutputMode::Json) => {
            println!("{}", json!({ "columns": columns, "rows": rows, "count": rows.len() }));
        }
        (CommandResult::Mutation { action, report }, OutputMode::Pretty) => {
            print!("{}", format_report(action, report));
        }
        (CommandResult::Mutation { action, report }, OutputMode::Json) => {
            println!(
                "{}",
                json!({ "action": action, "written": report.written, "rejected": report.rejected })
            );
        }
        (CommandResult::Keys(keys), OutputMode::Pretty) => {
            for key in keys {
                println!("{key}");
            }
        }
        (CommandResult::Keys(keys), OutputMode::Json) => {
            println!("{}", json!({ "keys": keys }));
        }
        (CommandResult::Dump(text), OutputMode::Pretty) => print!("{text}"),
        (CommandResult::Dump(text), OutputMode::Json) => {
            println!("{}", json!({ "content": text }));
        }
    }
}

/// Column-aligned rows with a header line.
fn format_rows(columns: &[String], rows: &[Record]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
    for row in rows {
        for (i, field) in row.fields().iter().enumerate() {
            let w = display_field(field).chars().count();
            match widths.get_mut(i) {
                Some(slot) => *slot = (*slot).max(w),
                None => widths.push(w),
            }
        }
    }

    let mut out = String::new();
    // Rows wider than the declared columns get blank headers.
    let header = columns
        .iter()
        .map(String::as_str)
        .chain(std::iter::repeat(""))
        .take(widths.len());
    push_line(&mut out, header, &widths);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in rows {
        let cells: Vec<String> = row.fields().iter().map(|f| display_field(f)).collect();
        push_line(&mut out, cells.iter().map(String::as_str), &widths);
    }
    out.push_str(&format!(
        "({} row{})\n",
        rows.len(),
        if rows.len() == 1 { "" } else { "s" }
    ));
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, &w)| format!("{cell:<w$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Fields may hold newlines; keep each row on one terminal line.
fn display_field(field: &str) -> String {
    field.replace('\n', "\\n")
}

fn format_report(action: &str, report: &MutationReport) -> String {
    let mut out = format!(
        "{} row{} {action}\n",
        report.written,
        if report.written == 1 { "" } else { "s" }
    );
    for rejection in &report.rejected {
        out.push_str(&format!("skipped {:?}: {}\n", rejection.key, rejection.reason));
    }
    out
}
