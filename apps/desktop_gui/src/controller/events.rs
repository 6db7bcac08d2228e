//! UI/backend events and error modeling for desktop GUI controller.

use std::path::PathBuf;

use client_core::{ControllerEvent, Download};

pub enum UiEvent {
    Info(String),
    Error(UiError),
    Controller(ControllerEvent),
    UploadSelectionRead {
        filenames: Vec<String>,
    },
    DownloadReady(Download),
    DownloadSaved(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Filesystem,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    ReadFiles,
    SaveDownload,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("failed to access")
            || message_lower.contains("no such file")
            || message_lower.contains("permission denied")
            || message_lower.contains("read-only")
        {
            UiErrorCategory::Filesystem
        } else if message_lower.contains("invalid")
            || message_lower.contains("missing")
            || message_lower.contains("select")
            || message_lower.contains("choose")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("request failed")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnected")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Banner text prefixed with what the user was doing.
    pub fn banner_text(&self) -> String {
        let prefix = match self.context {
            UiErrorContext::BackendStartup => "Backend unavailable",
            UiErrorContext::ReadFiles => "Could not read files",
            UiErrorContext::SaveDownload => "Could not save file",
        };
        format!("{prefix}: {}", self.message)
    }
}
