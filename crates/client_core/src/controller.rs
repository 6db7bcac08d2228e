//! The aligner UI controller: tab state, the upload/run workflow, polling
//! timers, the primer workflow and the helper-log viewer.
//!
//! Front ends own an `Arc<AlignerController>`, drive it through its async
//! operations and redraw from the [`ControllerEvent`]s it broadcasts.

use std::{
    future::Future,
    sync::{Arc, Mutex as StdMutex, PoisonError, Weak},
    time::Duration,
};

use chrono::{NaiveDate, Utc};
use shared::{
    domain::{DirectionOptionId, UserId},
    protocol::{RegisterRequest, Row, SelectOption},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    error::{AlignerError, AlignerResult, ValidationError},
    export::{self, Download},
    render::{self, ResultEntryView, TableView},
    tracker::{ResultTracker, ResultUpdate},
    AlignerApi, UploadFile,
};

pub const UPLOADING_PLACEHOLDER: &str = "Uploading files...";
pub const UPLOADED_PLACEHOLDER: &str = "Files uploaded. Starting alignment...";
pub const LOGS_CLEARED_PLACEHOLDER: &str = "Logs cleared...";
pub const WAITING_PLACEHOLDER: &str = "Waiting for logs...";
pub const RUN_SUCCESS_TEXT: &str =
    "✓ Alignment completed successfully! Results uploaded to Benchling.";
pub const RUN_PARTIAL_TEXT: &str =
    "⚠ Alignment completed but no files were processed. Check the log for details.";
pub const NO_DIRECTION_LABEL: &str = "No Direction";

const UPLOAD_FAILED_FALLBACK: &str = "Upload failed";
const PREVIEW_FAILED: &str = "Preview failed";
const REGISTER_FAILED: &str = "Registration failed";
const EUROFINS_FAILED: &str = "Eurofins export failed";
const IDT_FAILED: &str = "IDT export failed";
const HELPER_UNAVAILABLE: &str = "Unable to fetch logs";
const HELPER_LOAD_FAILED: &str = "Failed to load logs";
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Aligner,
    Primers,
    HelperLogs,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Aligner, Tab::Primers, Tab::HelperLogs];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Aligner => "Auto Aligner",
            Tab::Primers => "Primer Registration",
            Tab::HelperLogs => "Helper Logs",
        }
    }

    /// Short identifier used on the command line.
    pub fn key(self) -> &'static str {
        match self {
            Tab::Aligner => "aligner",
            Tab::Primers => "next",
            Tab::HelperLogs => "helper",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Uploading,
    Running,
}

impl RunPhase {
    pub fn is_busy(self) -> bool {
        self != RunPhase::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSeverity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub panel: Tab,
    pub severity: StatusSeverity,
    pub text: String,
    /// Set for messages that disappear on their own.
    pub auto_hide_after: Option<Duration>,
}

impl StatusMessage {
    pub fn error(panel: Tab, text: impl Into<String>) -> Self {
        Self {
            panel,
            severity: StatusSeverity::Error,
            text: text.into(),
            auto_hide_after: None,
        }
    }

    pub fn warning(panel: Tab, text: impl Into<String>) -> Self {
        Self {
            panel,
            severity: StatusSeverity::Warning,
            text: text.into(),
            auto_hide_after: None,
        }
    }

    pub fn success(panel: Tab, text: impl Into<String>, auto_hide_after: Duration) -> Self {
        Self {
            panel,
            severity: StatusSeverity::Success,
            text: text.into(),
            auto_hide_after: Some(auto_hide_after),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogPanel {
    Placeholder(String),
    Lines(Vec<String>),
}

impl LogPanel {
    pub fn placeholder(text: impl Into<String>) -> Self {
        LogPanel::Placeholder(text.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HelperLogView {
    #[default]
    NotLoaded,
    Lines(Vec<String>),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// Upload succeeded but the run reported no processed files.
    PartialFailure,
    UploadRejected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPurpose {
    Logs,
    Results,
    HelperLogs,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    TabChanged(Tab),
    RunPhaseChanged(RunPhase),
    SelectionChanged { file_count: usize },
    StatusChanged(Option<StatusMessage>),
    LogsReplaced(LogPanel),
    ResultsCleared,
    ResultsRendered(Vec<ResultEntryView>),
    UsersLoaded(Vec<SelectOption>),
    DirectionOptionsLoaded(Vec<SelectOption>),
    PrimerFileChanged(Option<String>),
    PreviewUpdated { table: TableView, can_register: bool },
    RegistrationUpdated { table: TableView, can_export: bool },
    HelperLogsUpdated(HelperLogView),
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub log_poll_interval: Duration,
    pub result_poll_interval: Duration,
    pub helper_poll_interval: Duration,
    pub default_helper_tail: u32,
    pub success_status_ttl: Duration,
    pub benchling_alignment_url_base: Option<String>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ControllerOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            log_poll_interval: settings.log_poll_interval,
            result_poll_interval: settings.result_poll_interval,
            helper_poll_interval: settings.helper_poll_interval,
            default_helper_tail: settings.helper_tail,
            success_status_ttl: Duration::from_secs(5),
            benchling_alignment_url_base: settings.benchling_alignment_url_base.clone(),
        }
    }
}

/// Point-in-time copy of everything a front end draws.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub active_tab: Tab,
    pub run_phase: RunPhase,
    pub selected_files: usize,
    pub status: Option<StatusMessage>,
    pub log_panel: LogPanel,
    pub results_visible: bool,
    pub results: Vec<ResultEntryView>,
    pub users: Vec<SelectOption>,
    pub direction_options: Vec<SelectOption>,
    pub selected_user: Option<UserId>,
    pub selected_direction: Option<DirectionOptionId>,
    pub primer_file: Option<String>,
    pub preview: TableView,
    pub registered: TableView,
    pub can_register: bool,
    pub can_export: bool,
    pub helper_tail_input: String,
    pub helper_logs: HelperLogView,
}

struct ControllerState {
    active_tab: Tab,
    run_phase: RunPhase,
    selection: Vec<UploadFile>,
    status: Option<StatusMessage>,
    status_seq: u64,
    log_panel: LogPanel,
    results: ResultTracker,
    results_generation: u64,
    rendered_results: Vec<ResultEntryView>,
    users: Vec<SelectOption>,
    direction_options: Vec<SelectOption>,
    selected_user: Option<UserId>,
    selected_direction: Option<DirectionOptionId>,
    primer_file: Option<UploadFile>,
    preview_rows: Vec<Row>,
    result_rows: Vec<Row>,
    helper_tail_input: String,
    helper_logs: HelperLogView,
}

#[derive(Default)]
struct PollTimers {
    logs: Option<JoinHandle<()>>,
    results: Option<JoinHandle<()>>,
    helper_logs: Option<JoinHandle<()>>,
    status_hide: Option<JoinHandle<()>>,
}

impl PollTimers {
    fn slot(&mut self, purpose: PollPurpose) -> &mut Option<JoinHandle<()>> {
        match purpose {
            PollPurpose::Logs => &mut self.logs,
            PollPurpose::Results => &mut self.results,
            PollPurpose::HelperLogs => &mut self.helper_logs,
        }
    }

    fn abort_all(&mut self) {
        for handle in [
            self.logs.take(),
            self.results.take(),
            self.helper_logs.take(),
            self.status_hide.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

pub struct AlignerController {
    api: Arc<dyn AlignerApi>,
    options: ControllerOptions,
    inner: Mutex<ControllerState>,
    timers: StdMutex<PollTimers>,
    events: broadcast::Sender<ControllerEvent>,
}

impl AlignerController {
    pub fn new(api: Arc<dyn AlignerApi>, options: ControllerOptions) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let helper_tail_input = options.default_helper_tail.to_string();
        Arc::new(Self {
            api,
            options,
            inner: Mutex::new(ControllerState {
                active_tab: Tab::default(),
                run_phase: RunPhase::Idle,
                selection: Vec::new(),
                status: None,
                status_seq: 0,
                log_panel: LogPanel::placeholder(WAITING_PLACEHOLDER),
                results: ResultTracker::new(),
                results_generation: 0,
                rendered_results: Vec::new(),
                users: Vec::new(),
                direction_options: Vec::new(),
                selected_user: None,
                selected_direction: None,
                primer_file: None,
                preview_rows: Vec::new(),
                result_rows: Vec::new(),
                helper_tail_input,
                helper_logs: HelperLogView::NotLoaded,
            }),
            timers: StdMutex::new(PollTimers::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    fn with_timers<R>(&self, f: impl FnOnce(&mut PollTimers) -> R) -> R {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut timers)
    }

    /// Starts log and result polling and loads the dropdown lists.
    pub async fn mount(self: &Arc<Self>) {
        info!("mounting aligner controller");
        self.start_poller(PollPurpose::Logs);
        self.start_poller(PollPurpose::Results);
        if self.inner.lock().await.active_tab == Tab::HelperLogs {
            self.fetch_helper_logs().await;
            self.start_poller(PollPurpose::HelperLogs);
        }

        if let Err(err) = self.refresh_users().await {
            warn!("failed to load users: {err}");
        }
        if let Err(err) = self.refresh_direction_options().await {
            warn!("failed to load direction options: {err}");
        }
    }

    /// Cancels every timer. The controller can be mounted again afterwards.
    pub fn unmount(&self) {
        info!("unmounting aligner controller");
        self.with_timers(PollTimers::abort_all);
    }

    pub fn is_polling(&self, purpose: PollPurpose) -> bool {
        self.with_timers(|timers| {
            timers
                .slot(purpose)
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
        })
    }

    fn start_poller(self: &Arc<Self>, purpose: PollPurpose) {
        let handle = match purpose {
            PollPurpose::Logs => self.spawn_poller(self.options.log_poll_interval, |c| async move {
                if let Err(err) = c.poll_logs_once().await {
                    warn!("log poll failed: {err}");
                }
            }),
            PollPurpose::Results => {
                self.spawn_poller(self.options.result_poll_interval, |c| async move {
                    if let Err(err) = c.poll_results_once().await {
                        warn!("result poll failed: {err}");
                    }
                })
            }
            PollPurpose::HelperLogs => {
                self.spawn_poller(self.options.helper_poll_interval, |c| async move {
                    c.fetch_helper_logs().await;
                })
            }
        };
        let previous = self.with_timers(|timers| timers.slot(purpose).replace(handle));
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(?purpose, "poll timer started");
    }

    fn stop_poller(&self, purpose: PollPurpose) {
        if let Some(handle) = self.with_timers(|timers| timers.slot(purpose).take()) {
            handle.abort();
            debug!(?purpose, "poll timer stopped");
        }
    }

    /// Recurring task that first fires one `period` from now; exits once the controller is gone.
    fn spawn_poller<F, Fut>(self: &Arc<Self>, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                tick(controller).await;
            }
        })
    }

    pub async fn snapshot(&self) -> ControllerSnapshot {
        let state = self.inner.lock().await;
        ControllerSnapshot {
            active_tab: state.active_tab,
            run_phase: state.run_phase,
            selected_files: state.selection.len(),
            status: state.status.clone(),
            log_panel: state.log_panel.clone(),
            results_visible: state.results.is_displayed(),
            results: state.rendered_results.clone(),
            users: state.users.clone(),
            direction_options: state.direction_options.clone(),
            selected_user: state.selected_user.clone(),
            selected_direction: state.selected_direction.clone(),
            primer_file: state.primer_file.as_ref().map(|f| f.filename.clone()),
            preview: TableView::from_rows(&state.preview_rows),
            registered: TableView::from_rows(&state.result_rows),
            can_register: !state.preview_rows.is_empty(),
            can_export: !state.result_rows.is_empty(),
            helper_tail_input: state.helper_tail_input.clone(),
            helper_logs: state.helper_logs.clone(),
        }
    }

    // ---- status -------------------------------------------------------------

    fn set_status(self: &Arc<Self>, state: &mut ControllerState, status: Option<StatusMessage>) {
        state.status_seq += 1;
        let seq = state.status_seq;
        let ttl = status.as_ref().and_then(|status| status.auto_hide_after);
        state.status = status.clone();
        self.emit(ControllerEvent::StatusChanged(status));

        let hide_task = ttl.map(|ttl| {
            let weak = Arc::downgrade(self);
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                if let Some(controller) = weak.upgrade() {
                    controller.expire_status(seq).await;
                }
            })
        });
        let previous = self.with_timers(|timers| std::mem::replace(&mut timers.status_hide, hide_task));
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn expire_status(&self, seq: u64) {
        let mut state = self.inner.lock().await;
        if state.status_seq == seq && state.status.is_some() {
            state.status = None;
            self.emit(ControllerEvent::StatusChanged(None));
        }
    }

    /// Shows `err` on `panel` and hands it back for propagation.
    async fn report(self: &Arc<Self>, panel: Tab, err: AlignerError, fallback: &str) -> AlignerError {
        if err.is_validation() {
            debug!("rejected before request: {err}");
        } else {
            warn!("{fallback}: {err}");
        }
        let mut state = self.inner.lock().await;
        self.set_status(
            &mut state,
            Some(StatusMessage::error(panel, err.user_message(fallback))),
        );
        err
    }

    // ---- tabs ---------------------------------------------------------------

    /// Activates `tab`. The helper-log timer is torn down first and restarted,
    /// with an immediate fetch, only when the helper tab is entered.
    pub async fn select_tab(self: &Arc<Self>, tab: Tab) {
        {
            let mut state = self.inner.lock().await;
            state.active_tab = tab;
        }
        self.emit(ControllerEvent::TabChanged(tab));

        self.stop_poller(PollPurpose::HelperLogs);
        if tab == Tab::HelperLogs {
            self.fetch_helper_logs().await;
            self.start_poller(PollPurpose::HelperLogs);
        }
    }

    pub async fn active_tab(&self) -> Tab {
        self.inner.lock().await.active_tab
    }

    // ---- alignment workflow -------------------------------------------------

    pub async fn set_upload_selection(&self, files: Vec<UploadFile>) {
        let mut state = self.inner.lock().await;
        state.selection = files;
        self.emit(ControllerEvent::SelectionChanged {
            file_count: state.selection.len(),
        });
    }

    pub async fn clear_logs(&self) {
        let mut state = self.inner.lock().await;
        state.log_panel = LogPanel::placeholder(LOGS_CLEARED_PLACEHOLDER);
        self.emit(ControllerEvent::LogsReplaced(state.log_panel.clone()));
    }

    async fn replace_log_panel(&self, panel: LogPanel) {
        let mut state = self.inner.lock().await;
        state.log_panel = panel.clone();
        self.emit(ControllerEvent::LogsReplaced(panel));
    }

    async fn set_run_phase(&self, phase: RunPhase) {
        let mut state = self.inner.lock().await;
        state.run_phase = phase;
        self.emit(ControllerEvent::RunPhaseChanged(phase));
    }

    /// Uploads the current selection and starts the alignment.
    ///
    /// Whatever happens after the guards, the run phase returns to idle and
    /// the selection is cleared.
    pub async fn run_alignment(self: &Arc<Self>) -> AlignerResult<RunOutcome> {
        let files = {
            let mut state = self.inner.lock().await;
            let rejection = if state.run_phase.is_busy() {
                Some(ValidationError::RunInProgress)
            } else if state.selection.is_empty() {
                Some(ValidationError::NoFilesSelected)
            } else {
                None
            };
            if let Some(rejection) = rejection {
                self.set_status(
                    &mut state,
                    Some(StatusMessage::error(Tab::Aligner, rejection.to_string())),
                );
                return Err(rejection.into());
            }

            state.run_phase = RunPhase::Uploading;
            self.emit(ControllerEvent::RunPhaseChanged(RunPhase::Uploading));
            self.set_status(&mut state, None);

            state.log_panel = LogPanel::placeholder(UPLOADING_PLACEHOLDER);
            self.emit(ControllerEvent::LogsReplaced(state.log_panel.clone()));

            state.results.reset();
            state.results_generation += 1;
            state.rendered_results.clear();
            self.emit(ControllerEvent::ResultsCleared);

            state.selection.clone()
        };

        info!(files = files.len(), "starting alignment run");
        let outcome = self.upload_and_run(&files).await;

        {
            let mut state = self.inner.lock().await;
            state.run_phase = RunPhase::Idle;
            self.emit(ControllerEvent::RunPhaseChanged(RunPhase::Idle));
            state.selection.clear();
            self.emit(ControllerEvent::SelectionChanged { file_count: 0 });

            let status = match &outcome {
                Ok(RunOutcome::Completed) => StatusMessage::success(
                    Tab::Aligner,
                    RUN_SUCCESS_TEXT,
                    self.options.success_status_ttl,
                ),
                Ok(RunOutcome::PartialFailure) => {
                    StatusMessage::warning(Tab::Aligner, RUN_PARTIAL_TEXT)
                }
                Ok(RunOutcome::UploadRejected(reason)) => {
                    StatusMessage::error(Tab::Aligner, format!("✗ {reason}"))
                }
                Err(err) => {
                    error!("error running alignment: {err}");
                    StatusMessage::error(Tab::Aligner, format!("✗ Error running alignment: {err}"))
                }
            };
            self.set_status(&mut state, Some(status));
        }

        if matches!(outcome, Ok(RunOutcome::Completed)) {
            if let Err(err) = self.poll_results_once().await {
                warn!("result refresh after run failed: {err}");
            }
        }
        outcome
    }

    async fn upload_and_run(&self, files: &[UploadFile]) -> AlignerResult<RunOutcome> {
        let upload = self.api.upload(files).await?;
        let upload_dir = match upload.upload_dir {
            Some(dir) if upload.success => dir,
            _ => {
                let reason = upload
                    .error
                    .unwrap_or_else(|| UPLOAD_FAILED_FALLBACK.to_string());
                warn!("upload rejected: {reason}");
                return Ok(RunOutcome::UploadRejected(reason));
            }
        };

        self.replace_log_panel(LogPanel::placeholder(UPLOADED_PLACEHOLDER))
            .await;
        self.set_run_phase(RunPhase::Running).await;

        let run = self.api.run(&upload_dir).await?;
        if run.success {
            info!(upload_dir = %upload_dir, "alignment completed");
            Ok(RunOutcome::Completed)
        } else {
            warn!(upload_dir = %upload_dir, "alignment finished without processed files");
            Ok(RunOutcome::PartialFailure)
        }
    }

    /// Replaces the log panel when the server has any lines; an empty list leaves it alone.
    pub async fn poll_logs_once(&self) -> AlignerResult<()> {
        let logs = self.api.logs().await?;
        if logs.is_empty() {
            return Ok(());
        }
        self.replace_log_panel(LogPanel::Lines(logs)).await;
        Ok(())
    }

    /// Fetches results and re-renders only when the set changed. Returns whether it rendered.
    pub async fn poll_results_once(&self) -> AlignerResult<bool> {
        let generation = self.inner.lock().await.results_generation;
        let results = self.api.results().await?;

        let mut state = self.inner.lock().await;
        if state.results_generation != generation {
            debug!("discarding results fetched before the current run started");
            return Ok(false);
        }
        match state.results.observe(results) {
            ResultUpdate::Render(records) => {
                let entries = render::result_entries(
                    &records,
                    self.options.benchling_alignment_url_base.as_deref(),
                );
                state.rendered_results = entries.clone();
                self.emit(ControllerEvent::ResultsRendered(entries));
                Ok(true)
            }
            ResultUpdate::Unchanged => Ok(false),
        }
    }

    // ---- dropdowns ----------------------------------------------------------

    pub async fn refresh_users(&self) -> AlignerResult<()> {
        let users = self.api.users().await?;
        let mut state = self.inner.lock().await;
        state.users = users.clone();
        self.emit(ControllerEvent::UsersLoaded(users));
        Ok(())
    }

    /// Loads direction options, with a leading empty "No Direction" choice.
    pub async fn refresh_direction_options(&self) -> AlignerResult<()> {
        let mut options = vec![SelectOption::new("", NO_DIRECTION_LABEL)];
        options.extend(self.api.direction_options().await?);
        let mut state = self.inner.lock().await;
        state.direction_options = options.clone();
        self.emit(ControllerEvent::DirectionOptionsLoaded(options));
        Ok(())
    }

    /// An empty value clears the selection.
    pub async fn select_user(&self, value: &str) {
        self.inner.lock().await.selected_user =
            (!value.is_empty()).then(|| UserId::new(value));
    }

    /// An empty value means "No Direction".
    pub async fn select_direction(&self, value: &str) {
        self.inner.lock().await.selected_direction =
            (!value.is_empty()).then(|| DirectionOptionId::new(value));
    }

    // ---- primer workflow ----------------------------------------------------

    pub async fn set_primer_file(&self, file: Option<UploadFile>) {
        let mut state = self.inner.lock().await;
        let name = file.as_ref().map(|f| f.filename.clone());
        state.primer_file = file;
        self.emit(ControllerEvent::PrimerFileChanged(name));
    }

    pub async fn can_register(&self) -> bool {
        !self.inner.lock().await.preview_rows.is_empty()
    }

    pub async fn can_export(&self) -> bool {
        !self.inner.lock().await.result_rows.is_empty()
    }

    /// Sends the chosen sheet for parsing and shows the rows. Returns the row count.
    pub async fn preview_primers(self: &Arc<Self>) -> AlignerResult<usize> {
        let file = self.inner.lock().await.primer_file.clone();
        let Some(file) = file else {
            return Err(self
                .report(Tab::Primers, ValidationError::NoPrimerFile.into(), PREVIEW_FAILED)
                .await);
        };

        match self.api.preview_primers(&file).await {
            Ok(rows) => {
                let mut state = self.inner.lock().await;
                state.preview_rows = rows;
                let count = state.preview_rows.len();
                self.emit(ControllerEvent::PreviewUpdated {
                    table: TableView::from_rows(&state.preview_rows),
                    can_register: count > 0,
                });
                debug!(rows = count, file = %file.filename, "primer preview loaded");
                Ok(count)
            }
            Err(err) => Err(self.report(Tab::Primers, err, PREVIEW_FAILED).await),
        }
    }

    /// Registers the previewed rows for the selected user. Returns the result row count.
    pub async fn register_primers(self: &Arc<Self>) -> AlignerResult<usize> {
        let request = {
            let state = self.inner.lock().await;
            match (&state.selected_user, state.preview_rows.is_empty()) {
                (None, _) => Err(ValidationError::NoUserSelected),
                (Some(_), true) => Err(ValidationError::NothingToRegister),
                (Some(user_id), false) => Ok(RegisterRequest {
                    user_id: user_id.clone(),
                    rows: state.preview_rows.clone(),
                    direction_option_id: state.selected_direction.clone(),
                }),
            }
        };
        let request = match request {
            Ok(request) => request,
            Err(rejection) => {
                return Err(self
                    .report(Tab::Primers, rejection.into(), REGISTER_FAILED)
                    .await)
            }
        };

        match self.api.register_primers(&request).await {
            Ok(rows) => {
                let mut state = self.inner.lock().await;
                state.result_rows = rows;
                let count = state.result_rows.len();
                self.emit(ControllerEvent::RegistrationUpdated {
                    table: TableView::from_rows(&state.result_rows),
                    can_export: count > 0,
                });
                info!(rows = count, user = %request.user_id, "primers registered");
                Ok(count)
            }
            Err(err) => Err(self.report(Tab::Primers, err, REGISTER_FAILED).await),
        }
    }

    async fn registered_rows(self: &Arc<Self>, fallback: &str) -> AlignerResult<Vec<Row>> {
        let rows = self.inner.lock().await.result_rows.clone();
        if rows.is_empty() {
            return Err(self
                .report(Tab::Primers, ValidationError::NothingToExport.into(), fallback)
                .await);
        }
        Ok(rows)
    }

    pub async fn export_idt(self: &Arc<Self>) -> AlignerResult<Download> {
        self.export_idt_on(Utc::now().date_naive()).await
    }

    pub async fn export_idt_on(self: &Arc<Self>, date: NaiveDate) -> AlignerResult<Download> {
        let rows = self.registered_rows(IDT_FAILED).await?;
        match export::idt_download(&rows, date) {
            Ok(download) => Ok(download),
            Err(err) => Err(self.report(Tab::Primers, err, IDT_FAILED).await),
        }
    }

    pub async fn export_eurofins(self: &Arc<Self>) -> AlignerResult<Download> {
        let rows = self.registered_rows(EUROFINS_FAILED).await?;
        match self.api.export_eurofins(&rows).await {
            Ok(bytes) => Ok(export::eurofins_download(bytes)),
            Err(err) => Err(self.report(Tab::Primers, err, EUROFINS_FAILED).await),
        }
    }

    // ---- helper logs --------------------------------------------------------

    pub async fn set_helper_tail(&self, input: impl Into<String>) {
        self.inner.lock().await.helper_tail_input = input.into();
    }

    /// Fetches the helper log tail and replaces the view; failures are shown inline.
    pub async fn fetch_helper_logs(&self) {
        let tail = {
            let state = self.inner.lock().await;
            parse_helper_tail(&state.helper_tail_input, self.options.default_helper_tail)
        };

        let view = match self.api.helper_logs(tail).await {
            Ok(lines) => HelperLogView::Lines(lines),
            Err(err @ AlignerError::Server { .. }) => {
                warn!("helper log endpoint reported failure: {err}");
                HelperLogView::Error(err.user_message(HELPER_UNAVAILABLE))
            }
            Err(err) => {
                warn!("failed to load helper logs: {err}");
                HelperLogView::Error(HELPER_LOAD_FAILED.to_string())
            }
        };

        let mut state = self.inner.lock().await;
        state.helper_logs = view.clone();
        self.emit(ControllerEvent::HelperLogsUpdated(view));
    }
}

impl Drop for AlignerController {
    fn drop(&mut self) {
        self.with_timers(PollTimers::abort_all);
    }
}

/// Reads the leading integer of the tail field; anything unusable falls back to `default`.
pub fn parse_helper_tail(input: &str, default: u32) -> u32 {
    let digits: String = input
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    match digits.parse::<u32>() {
        Ok(tail) if tail > 0 => tail,
        _ => default,
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
