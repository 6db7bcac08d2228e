use super::*;
use anyhow::Result;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{AlignmentId, DirectionOptionId, UserId};
use std::collections::HashMap;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    uploads: Arc<Mutex<Vec<(String, String, usize)>>>,
    run_requests: Arc<Mutex<Vec<Value>>>,
    register_requests: Arc<Mutex<Vec<Value>>>,
    eurofins_requests: Arc<Mutex<Vec<Value>>>,
    helper_tails: Arc<Mutex<Vec<String>>>,
}

async fn handle_upload(State(state): State<ServerState>, mut multipart: Multipart) -> AxumResponse {
    let mut received = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        received.push((name, file_name, bytes.len()));
    }

    if received.iter().any(|(_, file_name, _)| file_name.ends_with(".exe")) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Unsupported file type: tool.exe"})),
        )
            .into_response();
    }

    let count = received.len();
    state.uploads.lock().await.extend(received);
    Json(json!({
        "success": true,
        "upload_dir": "/srv/uploads/20261019_101500",
        "message": format!("Successfully uploaded {count} file(s)"),
    }))
    .into_response()
}

async fn handle_run(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.run_requests.lock().await.push(body);
    Json(json!({"success": true, "message": "Alignment completed", "results_count": 2}))
}

async fn handle_logs() -> Json<Value> {
    Json(json!({"logs": ["Found 2 FASTA files", "Uploading T1 to Benchling"]}))
}

async fn handle_results() -> Json<Value> {
    Json(json!({"results": [
        {"tube_name": "T1", "success": true, "alignment_id": "seqanl_1",
         "alignment_name": "T1 alignment", "sequence_url": "https://tenant.benchling.com/s/T1"},
        {"tube_name": "T2", "success": false, "alignment_id": 42, "error": "no template"},
    ]}))
}

async fn handle_users() -> Json<Value> {
    Json(json!({"users": [{"value": "ent_1", "label": "Ada"}]}))
}

async fn handle_options() -> Json<Value> {
    Json(json!({"options": [{"value": "sfso_fwd", "label": "Forward"}]}))
}

async fn handle_preview(mut multipart: Multipart) -> AxumResponse {
    let mut file_name = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            file_name = field.file_name().unwrap_or_default().to_string();
        }
    }
    if file_name.ends_with(".txt") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Unsupported primer sheet"})),
        )
            .into_response();
    }
    Json(json!({"rows": [{"Oligo Name": "P1", "Sequence": "ACGT", "Direction": "fwd"}]}))
        .into_response()
}

async fn handle_register(State(state): State<ServerState>, Json(body): Json<Value>) -> Json<Value> {
    state.register_requests.lock().await.push(body);
    Json(json!({"results": [{"Oligo Name": "P1", "Registry ID": "bfi_1"}]}))
}

async fn handle_eurofins(State(state): State<ServerState>, Json(body): Json<Value>) -> AxumResponse {
    state.eurofins_requests.lock().await.push(body);
    (
        StatusCode::OK,
        [(
            "content-type",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )],
        vec![0x50_u8, 0x4b, 0x03, 0x04, 0x00],
    )
        .into_response()
}

async fn handle_helper_logs(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> AxumResponse {
    let tail = query.get("tail").cloned().unwrap_or_default();
    state.helper_tails.lock().await.push(tail.clone());
    if tail == "13" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "helper container not running"})),
        )
            .into_response();
    }
    Json(json!({"lines": ["helper started", format!("tail={tail}")]})).into_response()
}

async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn spawn_aligner_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState::default();
    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/run", post(handle_run))
        .route("/api/logs", get(handle_logs))
        .route("/api/results", get(handle_results))
        .route("/api/users", get(handle_users))
        .route("/api/dropdown/options", get(handle_options))
        .route("/api/primer/preview", post(handle_preview))
        .route("/api/primer/register", post(handle_register))
        .route("/api/primer/eurofins", post(handle_eurofins))
        .route("/api/benchling-helper/logs", get(handle_helper_logs))
        .route("/health", get(handle_health))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

#[test]
fn base_url_gains_trailing_slash_and_rejects_garbage() {
    let client = HttpAlignerClient::new("http://aligner.lab:8080/prefix").expect("client");
    assert_eq!(client.base_url().as_str(), "http://aligner.lab:8080/prefix/");
    assert_eq!(
        client.endpoint("api/logs").expect("endpoint").as_str(),
        "http://aligner.lab:8080/prefix/api/logs"
    );

    let err = HttpAlignerClient::new("not a url").err().expect("must fail");
    assert!(matches!(err, AlignerError::InvalidUrl { .. }));
}

#[tokio::test]
async fn upload_sends_each_file_as_multipart_files_field() {
    let (server_url, state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    let response = client
        .upload(&[
            UploadFile::new("T1.fasta", b">T1\nACGT\n".to_vec()),
            UploadFile::new("batch.zip", vec![0_u8; 16]),
        ])
        .await
        .expect("upload");

    assert!(response.success);
    assert_eq!(
        response.upload_dir,
        Some(UploadDir::new("/srv/uploads/20261019_101500"))
    );
    let uploads = state.uploads.lock().await;
    assert_eq!(
        *uploads,
        [
            ("files".to_string(), "T1.fasta".to_string(), 9),
            ("files".to_string(), "batch.zip".to_string(), 16),
        ]
    );
}

#[tokio::test]
async fn rejected_upload_decodes_error_body() {
    let (server_url, _state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    let response = client
        .upload(&[UploadFile::new("tool.exe", vec![1_u8])])
        .await
        .expect("4xx upload still decodes");

    assert!(!response.success);
    assert_eq!(
        response.error.as_deref(),
        Some("Unsupported file type: tool.exe")
    );
}

#[tokio::test]
async fn run_posts_upload_dir() {
    let (server_url, state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    let response = client
        .run(&UploadDir::new("/srv/uploads/20261019_101500"))
        .await
        .expect("run");

    assert!(response.success);
    assert_eq!(response.results_count, Some(2));
    assert_eq!(
        state.run_requests.lock().await[0],
        json!({"upload_dir": "/srv/uploads/20261019_101500"})
    );
}

#[tokio::test]
async fn polling_endpoints_decode_their_payloads() {
    let (server_url, _state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    assert_eq!(
        client.logs().await.expect("logs"),
        ["Found 2 FASTA files", "Uploading T1 to Benchling"]
    );

    let results = client.results().await.expect("results");
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].alignment_id,
        Some(AlignmentId::Text("seqanl_1".to_string()))
    );
    assert_eq!(results[1].alignment_id, Some(AlignmentId::Number(42)));
    assert_eq!(results[1].error.as_deref(), Some("no template"));

    assert_eq!(
        client.users().await.expect("users"),
        [SelectOption::new("ent_1", "Ada")]
    );
    assert_eq!(
        client.direction_options().await.expect("options"),
        [SelectOption::new("sfso_fwd", "Forward")]
    );
    assert_eq!(client.health().await.expect("health").status, "ok");
}

#[tokio::test]
async fn preview_returns_rows_or_server_message() {
    let (server_url, _state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    let rows = client
        .preview_primers(&UploadFile::new("primers.csv", b"Oligo Name,Sequence\n".to_vec()))
        .await
        .expect("preview");
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["Oligo Name", "Sequence", "Direction"]);

    let err = client
        .preview_primers(&UploadFile::new("notes.txt", b"x".to_vec()))
        .await
        .expect_err("bad sheet");
    match err {
        AlignerError::Server { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message.as_deref(), Some("Unsupported primer sheet"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn register_posts_camel_case_payload() {
    let (server_url, state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");
    let rows: Vec<Row> =
        serde_json::from_value(json!([{"Oligo Name": "P1", "Sequence": "ACGT"}])).expect("rows");

    let results = client
        .register_primers(&RegisterRequest {
            user_id: UserId::new("ent_1"),
            rows: rows.clone(),
            direction_option_id: Some(DirectionOptionId::new("sfso_fwd")),
        })
        .await
        .expect("register");

    assert_eq!(results[0]["Registry ID"], json!("bfi_1"));
    assert_eq!(
        state.register_requests.lock().await[0],
        json!({
            "userId": "ent_1",
            "rows": [{"Oligo Name": "P1", "Sequence": "ACGT"}],
            "directionOptionId": "sfso_fwd",
        })
    );
}

#[tokio::test]
async fn eurofins_export_returns_raw_bytes() {
    let (server_url, state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");
    let rows: Vec<Row> = serde_json::from_value(json!([{"Oligo Name": "P1"}])).expect("rows");

    let bytes = client.export_eurofins(&rows).await.expect("export");

    assert_eq!(bytes, [0x50, 0x4b, 0x03, 0x04, 0x00]);
    assert_eq!(
        state.eurofins_requests.lock().await[0],
        json!({"rows": [{"Oligo Name": "P1"}]})
    );
}

#[tokio::test]
async fn helper_logs_pass_tail_query_and_surface_failures() {
    let (server_url, state) = spawn_aligner_server().await.expect("spawn server");
    let client = HttpAlignerClient::new(&server_url).expect("client");

    let lines = client.helper_logs(200).await.expect("helper logs");
    assert_eq!(lines, ["helper started", "tail=200"]);

    let err = client.helper_logs(13).await.expect_err("helper down");
    assert_eq!(
        err.user_message("Unable to fetch logs"),
        "helper container not running"
    );
    assert_eq!(*state.helper_tails.lock().await, ["200", "13"]);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let client = HttpAlignerClient::new(&format!("http://{addr}")).expect("client");

    let err = client.logs().await.expect_err("nothing listening");

    assert!(matches!(err, AlignerError::Transport(_)));
    assert_eq!(err.user_message("Unable to fetch logs"), "Unable to fetch logs");
}

#[tokio::test]
async fn upload_file_reads_name_and_bytes_from_disk() {
    let dir = std::env::temp_dir().join(format!("aligner_upload_test_{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.expect("dir");
    let path = dir.join("T9.fasta");
    tokio::fs::write(&path, b">T9\nGG\n").await.expect("write");

    let file = UploadFile::from_path(&path).await.expect("read");
    assert_eq!(file.filename, "T9.fasta");
    assert_eq!(file.bytes, b">T9\nGG\n");

    let err = UploadFile::from_path(&dir.join("missing.fasta"))
        .await
        .expect_err("missing");
    assert!(matches!(err, AlignerError::Io { .. }));

    tokio::fs::remove_dir_all(&dir).await.expect("cleanup");
}
