//! Backend commands queued from UI to backend worker.

use client_core::{Download, Tab};
use std::path::PathBuf;

pub enum BackendCommand {
    SelectTab(Tab),
    SetUploadSelection {
        paths: Vec<PathBuf>,
    },
    RunAlignment,
    ClearLogs,
    RefreshUsers,
    RefreshDirectionOptions,
    SelectUser {
        value: String,
    },
    SelectDirection {
        value: String,
    },
    SetPrimerFile {
        path: Option<PathBuf>,
    },
    PreviewPrimers,
    RegisterPrimers,
    ExportIdt,
    ExportEurofins,
    SaveDownload {
        download: Download,
        path: PathBuf,
    },
    SetHelperTail {
        input: String,
    },
    RefreshHelperLogs,
}
