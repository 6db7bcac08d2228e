//! Plain-text rendering of controller views for the terminal.

use client_core::{
    render::{
        ResultEntryView, ResultOutcome, TableView, ALIGNMENT_FAILED_TEXT, NO_DATA_TEXT,
        SEQUENCE_LINK_TEXT, SEQUENCE_UNAVAILABLE_TEXT,
    },
    HelperLogView, LogPanel, StatusMessage, StatusSeverity,
};
use shared::protocol::SelectOption;

pub fn status_line(status: &StatusMessage) -> String {
    let label = match status.severity {
        StatusSeverity::Success => "ok",
        StatusSeverity::Warning => "warning",
        StatusSeverity::Error => "error",
    };
    format!("[{label}] {}", status.text)
}

pub fn log_panel(panel: &LogPanel) -> String {
    match panel {
        LogPanel::Placeholder(text) => text.clone(),
        LogPanel::Lines(lines) => lines.join("\n"),
    }
}

pub fn result_line(entry: &ResultEntryView) -> String {
    match &entry.outcome {
        ResultOutcome::Aligned {
            sequence_url,
            alignment_id,
        } => {
            let mut line = match sequence_url {
                Some(url) => format!("✓ {} - {SEQUENCE_LINK_TEXT}: {url}", entry.tube_name),
                None => format!("✓ {} - {SEQUENCE_UNAVAILABLE_TEXT}", entry.tube_name),
            };
            if let Some(id) = alignment_id {
                line.push_str(&format!(" (Alignment ID: {id})"));
            }
            line
        }
        ResultOutcome::Failed {
            detail,
            sequence_url,
        } => {
            let mut line = format!("✗ {} - {ALIGNMENT_FAILED_TEXT}", entry.tube_name);
            if let Some(detail) = detail {
                line.push_str(&format!(" ({detail})"));
            }
            if let Some(url) = sequence_url {
                line.push_str(&format!(" {SEQUENCE_LINK_TEXT}: {url}"));
            }
            line
        }
    }
}

pub fn results(entries: &[ResultEntryView]) -> String {
    if entries.is_empty() {
        return "No results yet.".to_string();
    }
    entries
        .iter()
        .map(result_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tab-separated table with a header line.
pub fn table(view: &TableView) -> String {
    if view.is_empty() {
        return NO_DATA_TEXT.to_string();
    }
    let mut lines = vec![view.columns.join("\t")];
    lines.extend(view.rows.iter().map(|row| row.join("\t")));
    lines.join("\n")
}

pub fn options(options: &[SelectOption]) -> String {
    options
        .iter()
        .map(|option| format!("{}\t{}", option.value, option.label))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn helper_logs(view: &HelperLogView) -> String {
    match view {
        HelperLogView::NotLoaded => String::new(),
        HelperLogView::Lines(lines) => lines.join("\n"),
        HelperLogView::Error(message) => format!("error: {message}"),
    }
}

#[cfg(test)]
#[path = "tests/output_tests.rs"]
mod tests;
