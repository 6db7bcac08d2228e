//! Error taxonomy for aligner client operations.

use std::path::PathBuf;

use thiserror::Error;

/// Problems caught before any request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select at least one file to upload.")]
    NoFilesSelected,
    #[error("An alignment run is already in progress.")]
    RunInProgress,
    #[error("Choose a CSV or XLSX file.")]
    NoPrimerFile,
    #[error("Select user first.")]
    NoUserSelected,
    #[error("Preview primers before registering.")]
    NothingToRegister,
    #[error("Register primers before exporting.")]
    NothingToExport,
}

#[derive(Debug, Error)]
pub enum AlignerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server answered but reported a failure.
    #[error("server reported failure (status {status}): {}", message.as_deref().unwrap_or("no details"))]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid server url '{url}': {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

impl AlignerError {
    pub fn server(status: u16, message: Option<String>) -> Self {
        Self::Server { status, message }
    }

    /// The message a user should see for this error.
    ///
    /// Validation and server-reported messages are shown verbatim; anything else
    /// collapses to `fallback` and is left for the logs.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            AlignerError::Validation(err) => err.to_string(),
            AlignerError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            _ => fallback.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AlignerError::Validation(_))
    }
}

pub type AlignerResult<T> = std::result::Result<T, AlignerError>;
