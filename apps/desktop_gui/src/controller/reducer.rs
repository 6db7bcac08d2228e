//! Folds backend events into the state the window draws from.

use std::path::PathBuf;

use client_core::{
    controller::WAITING_PLACEHOLDER, render::ResultEntryView, render::TableView, ControllerEvent,
    Download, HelperLogView, LogPanel, RunPhase, StatusMessage, Tab,
};
use shared::protocol::SelectOption;

use super::events::{UiError, UiEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerSeverity {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub severity: BannerSeverity,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ViewState {
    pub active_tab: Tab,
    pub run_phase: RunPhase,
    pub selected_files: Vec<String>,
    pub status: Option<StatusMessage>,
    pub log_panel: LogPanel,
    pub results_visible: bool,
    pub results: Vec<ResultEntryView>,
    pub users: Vec<SelectOption>,
    pub direction_options: Vec<SelectOption>,
    pub selected_user: String,
    pub selected_direction: String,
    pub primer_file: Option<String>,
    pub preview: TableView,
    pub can_register: bool,
    pub registered: TableView,
    pub can_export: bool,
    pub helper_tail_input: String,
    pub helper_logs: HelperLogView,
    pub banner: Option<StatusBanner>,
    pub pending_download: Option<Download>,
    pub last_saved: Option<PathBuf>,
}

impl ViewState {
    pub fn new(helper_tail: u32) -> Self {
        Self {
            active_tab: Tab::default(),
            run_phase: RunPhase::Idle,
            selected_files: Vec::new(),
            status: None,
            log_panel: LogPanel::placeholder(WAITING_PLACEHOLDER),
            results_visible: false,
            results: Vec::new(),
            users: Vec::new(),
            direction_options: Vec::new(),
            selected_user: String::new(),
            selected_direction: String::new(),
            primer_file: None,
            preview: TableView::default(),
            can_register: false,
            registered: TableView::default(),
            can_export: false,
            helper_tail_input: helper_tail.to_string(),
            helper_logs: HelperLogView::NotLoaded,
            banner: None,
            pending_download: None,
            last_saved: None,
        }
    }

    /// Status line for `tab`, if the current message belongs to it.
    pub fn status_for(&self, tab: Tab) -> Option<&StatusMessage> {
        self.status.as_ref().filter(|status| status.panel == tab)
    }

    /// The run button stays enabled while idle so an empty selection reaches the
    /// controller's "select at least one file" check.
    pub fn can_run(&self) -> bool {
        !self.run_phase.is_busy()
    }
}

pub fn reduce(state: &mut ViewState, event: UiEvent) {
    match event {
        UiEvent::Info(message) => {
            state.banner = Some(StatusBanner {
                severity: BannerSeverity::Info,
                message,
            });
        }
        UiEvent::Error(err) => show_error(state, &err),
        UiEvent::UploadSelectionRead { filenames } => state.selected_files = filenames,
        UiEvent::DownloadReady(download) => state.pending_download = Some(download),
        UiEvent::DownloadSaved(path) => {
            state.banner = Some(StatusBanner {
                severity: BannerSeverity::Info,
                message: format!("Saved {}", path.display()),
            });
            state.last_saved = Some(path);
        }
        UiEvent::Controller(event) => reduce_controller(state, event),
    }
}

fn show_error(state: &mut ViewState, err: &UiError) {
    tracing::warn!(category = ?err.category(), context = ?err.context(), "{}", err.message());
    state.banner = Some(StatusBanner {
        severity: BannerSeverity::Error,
        message: err.banner_text(),
    });
}

fn reduce_controller(state: &mut ViewState, event: ControllerEvent) {
    match event {
        ControllerEvent::TabChanged(tab) => state.active_tab = tab,
        ControllerEvent::RunPhaseChanged(phase) => state.run_phase = phase,
        ControllerEvent::SelectionChanged { file_count } => {
            if file_count == 0 {
                state.selected_files.clear();
            }
        }
        ControllerEvent::StatusChanged(status) => state.status = status,
        ControllerEvent::LogsReplaced(panel) => state.log_panel = panel,
        ControllerEvent::ResultsCleared => {
            state.results_visible = false;
            state.results.clear();
        }
        ControllerEvent::ResultsRendered(entries) => {
            state.results_visible = true;
            state.results = entries;
        }
        ControllerEvent::UsersLoaded(users) => state.users = users,
        ControllerEvent::DirectionOptionsLoaded(options) => state.direction_options = options,
        ControllerEvent::PrimerFileChanged(name) => state.primer_file = name,
        ControllerEvent::PreviewUpdated {
            table,
            can_register,
        } => {
            state.preview = table;
            state.can_register = can_register;
        }
        ControllerEvent::RegistrationUpdated { table, can_export } => {
            state.registered = table;
            state.can_export = can_export;
        }
        ControllerEvent::HelperLogsUpdated(view) => state.helper_logs = view,
    }
}
