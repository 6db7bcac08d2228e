//! View models for results and primer tables, and their HTML rendering.
//!
//! Every dynamic value goes through [`escape_html`] before it is placed in markup.

use serde_json::Value;
use shared::protocol::{ResultRecord, Row};
use tracing::warn;
use url::Url;

pub const SEQUENCE_LINK_TEXT: &str = "View Sequence in Benchling";
pub const SEQUENCE_UNAVAILABLE_TEXT: &str = "Sequence URL unavailable";
pub const ALIGNMENT_FAILED_TEXT: &str = "Failed to create alignment";
pub const NO_DATA_TEXT: &str = "No data.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultOutcome {
    Aligned {
        sequence_url: Option<String>,
        alignment_id: Option<String>,
    },
    Failed {
        detail: Option<String>,
        sequence_url: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntryView {
    pub tube_name: String,
    pub outcome: ResultOutcome,
}

impl ResultEntryView {
    pub fn sequence_url(&self) -> Option<&str> {
        match &self.outcome {
            ResultOutcome::Aligned { sequence_url, .. }
            | ResultOutcome::Failed { sequence_url, .. } => sequence_url.as_deref(),
        }
    }
}

/// Builds the view of one result.
///
/// The explicit `sequence_url` wins; with an `alignment_url_base` configured, a
/// missing URL is derived from the alignment id.
pub fn result_entry(record: &ResultRecord, alignment_url_base: Option<&str>) -> ResultEntryView {
    let alignment_id = record.alignment_id.as_ref().map(ToString::to_string);
    let sequence_url = record
        .sequence_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .or_else(|| {
            let base = alignment_url_base?;
            derived_alignment_url(base, alignment_id.as_deref()?)
        });

    let outcome = if record.success {
        ResultOutcome::Aligned {
            sequence_url,
            alignment_id,
        }
    } else {
        ResultOutcome::Failed {
            detail: record.error.clone().filter(|detail| !detail.is_empty()),
            sequence_url,
        }
    };

    ResultEntryView {
        tube_name: record.tube_name.clone(),
        outcome,
    }
}

pub fn result_entries(
    records: &[ResultRecord],
    alignment_url_base: Option<&str>,
) -> Vec<ResultEntryView> {
    records
        .iter()
        .map(|record| result_entry(record, alignment_url_base))
        .collect()
}

fn derived_alignment_url(base: &str, alignment_id: &str) -> Option<String> {
    let mut url = match Url::parse(base) {
        Ok(url) => url,
        Err(err) => {
            warn!(base, "ignoring unparsable alignment url base: {err}");
            return None;
        }
    };
    match url.fragment() {
        // Fragment-routed bases such as `https://host/#/alignment/` take the id in the fragment.
        Some(fragment) => {
            let fragment = format!(
                "{}/{}",
                fragment.trim_end_matches('/'),
                encoded_segment(alignment_id)?
            );
            url.set_fragment(Some(&fragment));
        }
        None => {
            url.path_segments_mut()
                .ok()?
                .pop_if_empty()
                .push(alignment_id);
        }
    }
    Some(url.into())
}

/// `segment` percent-encoded the way a single path segment is.
fn encoded_segment(segment: &str) -> Option<String> {
    let mut scratch = Url::parse("http://localhost/").ok()?;
    scratch.path_segments_mut().ok()?.clear().push(segment);
    Some(scratch.path().trim_start_matches('/').to_string())
}

/// Whether `url` is safe to open as a link: an absolute `http` or `https` URL.
pub fn is_web_link(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Anchor for `http`/`https` URLs; any other scheme is shown as plain text.
fn link_html(url: &str) -> String {
    if !is_web_link(url) {
        return format!(
            r#"<span class="sequence-url">{SEQUENCE_LINK_TEXT}: {}</span>"#,
            escape_html(url)
        );
    }
    format!(
        r#"<a href="{}" target="_blank" rel="noopener" class="benchling-link">{SEQUENCE_LINK_TEXT}</a>"#,
        escape_html(url)
    )
}

pub fn result_entry_html(entry: &ResultEntryView) -> String {
    let tube = escape_html(&entry.tube_name);
    match &entry.outcome {
        ResultOutcome::Aligned {
            sequence_url,
            alignment_id,
        } => {
            let link = match sequence_url {
                Some(url) => link_html(url),
                None => format!(r#"<span class="error-text">{SEQUENCE_UNAVAILABLE_TEXT}</span>"#),
            };
            let badge = alignment_id
                .as_deref()
                .map(|id| {
                    format!(
                        r#" <span class="result-id">Alignment ID: {}</span>"#,
                        escape_html(id)
                    )
                })
                .unwrap_or_default();
            format!(
                r#"<div class="result-entry"><div class="result-success"><strong>{tube}</strong> - {link}{badge}</div></div>"#
            )
        }
        ResultOutcome::Failed {
            detail,
            sequence_url,
        } => {
            let detail = detail
                .as_deref()
                .map(|detail| {
                    format!(
                        r#" <span class="error-details">({})</span>"#,
                        escape_html(detail)
                    )
                })
                .unwrap_or_default();
            let link = sequence_url
                .as_deref()
                .map(|url| format!(" {}", link_html(url)))
                .unwrap_or_default();
            format!(
                r#"<div class="result-entry"><div class="result-error"><strong>{tube}</strong> - <span class="error-text">{ALIGNMENT_FAILED_TEXT}</span>{detail}{link}</div></div>"#
            )
        }
    }
}

pub fn results_html(entries: &[ResultEntryView]) -> String {
    entries.iter().map(result_entry_html).collect()
}

/// Text shown for one cell: strings as-is, null or missing as empty, other JSON serialized.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// A rectangular rendering of uniform row objects, columns taken from the first row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn from_rows(rows: &[Row]) -> Self {
        let Some(first) = rows.first() else {
            return Self::default();
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| cell_text(row.get(column)))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_html(&self) -> String {
        if self.is_empty() {
            return format!(r#"<p class="help-text">{NO_DATA_TEXT}</p>"#);
        }

        let mut html = String::from("<table><thead><tr>");
        for column in &self.columns {
            html.push_str(&format!("<th>{}</th>", escape_html(column)));
        }
        html.push_str("</tr></thead><tbody>");
        for row in &self.rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td>{}</td>", escape_html(cell)));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    }
}

/// Wraps rendered fragments into a standalone page, one `<section>` per fragment.
pub fn html_document(title: &str, sections: &[(&str, String)]) -> String {
    let title = escape_html(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head><body><h1>{title}</h1>"
    );
    for (heading, body) in sections {
        html.push_str(&format!(
            "<section><h2>{}</h2>{body}</section>",
            escape_html(heading)
        ));
    }
    html.push_str("</body></html>\n");
    html
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
