use serde::{Deserialize, Serialize};

/// Body the server sends alongside a non-OK status, e.g. `{"error": "No files selected"}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// Parses an error body leniently; anything that is not the envelope yields no message.
    pub fn message_from_body(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.error)
            .filter(|message| !message.trim().is_empty())
    }
}
