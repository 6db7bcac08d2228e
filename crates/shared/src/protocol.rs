use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AlignmentId, DirectionOptionId, UploadDir, UserId};

/// A generic primer row as parsed by the server. Key order follows the server's JSON.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<UploadDir>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub upload_dir: UploadDir,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub tube_name: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_id: Option<AlignmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultsResponse {
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// Entry of the user and direction dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersResponse {
    #[serde(default)]
    pub users: Vec<SelectOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsResponse {
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_id: UserId,
    pub rows: Vec<Row>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_option_id: Option<DirectionOptionId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub results: Vec<Row>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EurofinsExportRequest {
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelperLogsResponse {
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn register_request_uses_camel_case_and_omits_empty_direction() {
        let request = RegisterRequest {
            user_id: UserId::new("ent_42"),
            rows: Vec::new(),
            direction_option_id: None,
        };
        let encoded = serde_json::to_value(&request).expect("encode");
        assert_eq!(encoded, json!({"userId": "ent_42", "rows": []}));

        let request = RegisterRequest {
            direction_option_id: Some(DirectionOptionId::new("sfso_fwd")),
            ..request
        };
        let encoded = serde_json::to_value(&request).expect("encode");
        assert_eq!(encoded["directionOptionId"], json!("sfso_fwd"));
    }

    #[test]
    fn result_record_accepts_numeric_task_ids_and_missing_fields() {
        let record: ResultRecord = serde_json::from_value(json!({
            "tube_name": "T-17",
            "success": true,
            "alignment_id": 9001,
        }))
        .expect("decode");
        assert_eq!(record.alignment_id, Some(AlignmentId::Number(9001)));
        assert_eq!(record.sequence_url, None);

        let record: ResultRecord = serde_json::from_value(json!({
            "tube_name": "T-18",
            "success": false,
            "alignment_id": null,
            "error": "timeout",
        }))
        .expect("decode");
        assert!(!record.success);
        assert_eq!(record.alignment_id, None);
    }

    #[test]
    fn preview_rows_keep_server_key_order() {
        let response: PreviewResponse = serde_json::from_str(
            r#"{"rows":[{"Oligo Name":"P1","Sequence":"ACGT","Direction":"fwd"}]}"#,
        )
        .expect("decode");
        let keys: Vec<&str> = response.rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, ["Oligo Name", "Sequence", "Direction"]);
    }

    #[test]
    fn upload_error_body_decodes_as_failed_upload() {
        let response: UploadResponse =
            serde_json::from_str(r#"{"error":"No files selected"}"#).expect("decode");
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("No files selected"));
        assert!(response.upload_dir.is_none());
    }
}
