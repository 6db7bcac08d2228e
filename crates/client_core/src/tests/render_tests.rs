use super::*;
use serde_json::json;
use shared::domain::AlignmentId;

fn record(value: serde_json::Value) -> ResultRecord {
    serde_json::from_value(value).expect("result record")
}

fn rows(value: serde_json::Value) -> Vec<Row> {
    serde_json::from_value(value).expect("rows")
}

#[test]
fn escapes_markup_significant_characters() {
    assert_eq!(
        escape_html(r#"<img src=x onerror="alert('x')">&"#),
        "&lt;img src=x onerror=&quot;alert(&#39;x&#39;)&quot;&gt;&amp;"
    );
}

#[test]
fn successful_result_prefers_explicit_sequence_url() {
    let entry = result_entry(
        &record(json!({
            "tube_name": "T1",
            "success": true,
            "alignment_id": "seqanl_1",
            "sequence_url": "https://tenant.benchling.com/s/seq_1",
        })),
        Some("https://tenant.benchling.com/alignments"),
    );

    assert_eq!(
        entry.outcome,
        ResultOutcome::Aligned {
            sequence_url: Some("https://tenant.benchling.com/s/seq_1".to_string()),
            alignment_id: Some("seqanl_1".to_string()),
        }
    );
}

#[test]
fn derives_url_from_alignment_id_only_when_base_is_configured() {
    let input = ResultRecord {
        tube_name: "T2".to_string(),
        success: true,
        alignment_id: Some(AlignmentId::Text("seqanl 2".to_string())),
        alignment_name: None,
        sequence_url: None,
        error: None,
        response_data: None,
    };

    assert_eq!(result_entry(&input, None).sequence_url(), None);
    assert_eq!(
        result_entry(&input, Some("https://tenant.benchling.com/alignments/")).sequence_url(),
        Some("https://tenant.benchling.com/alignments/seqanl%202")
    );
}

#[test]
fn fragment_routed_base_takes_the_id_in_its_fragment() {
    let input = record(json!({"tube_name": "T9", "success": true, "alignment_id": "seqanl_9"}));

    assert_eq!(
        result_entry(&input, Some("https://tenant.benchling.com/#/alignment/")).sequence_url(),
        Some("https://tenant.benchling.com/#/alignment/seqanl_9")
    );
    assert_eq!(
        result_entry(&input, Some("https://tenant.benchling.com/#/alignment")).sequence_url(),
        Some("https://tenant.benchling.com/#/alignment/seqanl_9")
    );

    let spaced = record(json!({"tube_name": "T9", "success": true, "alignment_id": "a b/c"}));
    assert_eq!(
        result_entry(&spaced, Some("https://tenant.benchling.com/#/alignment/")).sequence_url(),
        Some("https://tenant.benchling.com/#/alignment/a%20b%2Fc")
    );
}

#[test]
fn unavailable_link_is_rendered_as_text() {
    let entry = result_entry(&record(json!({"tube_name": "T3", "success": true})), None);
    let html = result_entry_html(&entry);

    assert!(html.contains(SEQUENCE_UNAVAILABLE_TEXT));
    assert!(!html.contains("<a "));
    assert!(!html.contains("Alignment ID"));
}

#[test]
fn failed_result_keeps_detail_and_sequence_link() {
    let entry = result_entry(
        &record(json!({
            "tube_name": "T4",
            "success": false,
            "error": "template <missing>",
            "sequence_url": "https://tenant.benchling.com/s/seq_4",
        })),
        None,
    );
    assert!(matches!(entry.outcome, ResultOutcome::Failed { .. }));

    let html = result_entry_html(&entry);
    assert!(html.contains(ALIGNMENT_FAILED_TEXT));
    assert!(html.contains("(template &lt;missing&gt;)"));
    assert!(html.contains(r#"href="https://tenant.benchling.com/s/seq_4""#));
}

#[test]
fn tube_names_are_escaped_in_results_markup() {
    let entries = result_entries(
        &[record(json!({
            "tube_name": "<script>alert(1)</script>",
            "success": true,
            "sequence_url": "javascript:\"x\"",
        }))],
        None,
    );
    let html = results_html(&entries);

    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("javascript:&quot;x&quot;"));
    assert!(!html.contains("href="));
}

#[test]
fn only_web_urls_become_links() {
    let link = |url: &str| {
        result_entry_html(&result_entry(
            &record(json!({"tube_name": "T5", "success": true, "sequence_url": url})),
            None,
        ))
    };

    assert!(link("http://tenant.benchling.com/s/seq_5").contains("<a href="));
    assert!(link("https://tenant.benchling.com/s/seq_5").contains("<a href="));
    let scripted = link("javascript:alert(1)");
    assert!(!scripted.contains("<a "));
    assert!(scripted.contains("javascript:alert(1)"));
    assert!(!link("not a url").contains("<a "));
}

#[test]
fn table_columns_come_from_first_row() {
    let table = TableView::from_rows(&rows(json!([
        {"Oligo Name": "P1", "Sequence": "ACGT"},
        {"Sequence": "TTTT", "Extra": 5},
    ])));

    assert_eq!(table.columns, ["Oligo Name", "Sequence"]);
    assert_eq!(table.rows, vec![vec!["P1", "ACGT"], vec!["", "TTTT"]]);
}

#[test]
fn table_cells_render_scalars_and_nulls() {
    let table = TableView::from_rows(&rows(json!([
        {"a": null, "b": 3, "c": true, "d": "x"},
    ])));
    assert_eq!(table.rows[0], ["", "3", "true", "x"]);
}

#[test]
fn empty_table_renders_placeholder() {
    assert_eq!(TableView::from_rows(&[]).to_html(), r#"<p class="help-text">No data.</p>"#);
}

#[test]
fn table_html_escapes_headers_and_cells() {
    let html = TableView::from_rows(&rows(json!([{"<b>": "a&b"}]))).to_html();
    assert!(html.contains("<th>&lt;b&gt;</th>"));
    assert!(html.contains("<td>a&amp;b</td>"));
}

#[test]
fn document_wraps_sections() {
    let html = html_document("Run <1>", &[("Results", "<p>ok</p>".to_string())]);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Run &lt;1&gt;</title>"));
    assert!(html.contains("<section><h2>Results</h2><p>ok</p></section>"));
}
