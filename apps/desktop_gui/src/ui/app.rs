use std::path::PathBuf;

use client_core::{
    config::Settings,
    render::{
        self, ResultEntryView, ResultOutcome, TableView, ALIGNMENT_FAILED_TEXT, NO_DATA_TEXT,
        SEQUENCE_LINK_TEXT, SEQUENCE_UNAVAILABLE_TEXT,
    },
    HelperLogView, LogPanel, RunPhase, StatusMessage, StatusSeverity, Tab,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::protocol::SelectOption;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::UiEvent,
    orchestration::dispatch_backend_command,
    reducer::{reduce, BannerSeverity, ViewState},
};

const SEQUENCE_EXTENSIONS: [&str; 5] = ["ab1", "seq", "fasta", "fa", "zip"];
const PRIMER_EXTENSIONS: [&str; 3] = ["csv", "xlsx", "xls"];

pub struct AlignerApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    view: ViewState,
    server_url: String,
    download_dir: PathBuf,
    queue_status: String,
}

impl AlignerApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>, settings: &Settings) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            view: ViewState::new(settings.helper_tail),
            server_url: settings.server_url.clone(),
            download_dir: settings.download_dir.clone(),
            queue_status: String::new(),
        }
    }

    fn send(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.queue_status);
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            reduce(&mut self.view, event);
        }
    }

    fn handle_pending_download(&mut self) {
        let Some(download) = self.view.pending_download.take() else {
            return;
        };
        if let Some(path) = rfd::FileDialog::new()
            .set_directory(&self.download_dir)
            .set_file_name(&download.filename)
            .save_file()
        {
            self.send(BackendCommand::SaveDownload { download, path });
        }
    }

    fn show_tab_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("aligner_tab_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Microsynth/Bacta Auto Aligner");
                ui.separator();
                for tab in Tab::ALL {
                    let selected = self.view.active_tab == tab;
                    if ui.selectable_label(selected, tab.label()).clicked() && !selected {
                        self.view.active_tab = tab;
                        self.send(BackendCommand::SelectTab(tab));
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.small(egui::RichText::new(&self.server_url).weak());
                });
            });
        });
    }

    fn show_bottom_bar(&mut self, ctx: &egui::Context) {
        if self.view.banner.is_none() && self.queue_status.is_empty() {
            return;
        }
        egui::TopBottomPanel::bottom("aligner_status_bar").show(ctx, |ui| {
            if let Some(banner) = self.view.banner.clone() {
                let fill = match banner.severity {
                    BannerSeverity::Info => egui::Color32::from_rgb(45, 70, 100),
                    BannerSeverity::Error => egui::Color32::from_rgb(111, 53, 53),
                };
                egui::Frame::NONE
                    .fill(fill)
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(10, 6))
                    .show(ui, |ui| {
                        ui.horizontal_wrapped(|ui| {
                            ui.label(
                                egui::RichText::new(&banner.message).color(egui::Color32::WHITE),
                            );
                            ui.with_layout(
                                egui::Layout::right_to_left(egui::Align::Center),
                                |ui| {
                                    if ui.button("Dismiss").clicked() {
                                        self.view.banner = None;
                                    }
                                },
                            );
                        });
                    });
            }
            if !self.queue_status.is_empty() {
                ui.horizontal(|ui| {
                    ui.small(egui::RichText::new(&self.queue_status).weak());
                    if ui.small_button("✕").clicked() {
                        self.queue_status.clear();
                    }
                });
            }
        });
    }

    fn show_aligner_tab(&mut self, ui: &mut egui::Ui) {
        let busy = self.view.run_phase.is_busy();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Select files…"))
                .clicked()
            {
                if let Some(paths) = rfd::FileDialog::new()
                    .add_filter("Sequencing files", &SEQUENCE_EXTENSIONS)
                    .pick_files()
                {
                    self.send(BackendCommand::SetUploadSelection { paths });
                }
            }
            match self.view.selected_files.len() {
                0 => ui.label("No files selected"),
                1 => ui.label(&self.view.selected_files[0]),
                n => ui.label(format!("{n} files selected")),
            };
        });

        ui.horizontal(|ui| {
            let label = match self.view.run_phase {
                RunPhase::Idle => "Run Alignment",
                RunPhase::Uploading => "Uploading…",
                RunPhase::Running => "Running…",
            };
            if ui
                .add_enabled(self.view.can_run(), egui::Button::new(label))
                .clicked()
            {
                self.send(BackendCommand::RunAlignment);
            }
            if busy {
                ui.spinner();
            }
        });

        if let Some(status) = self.view.status_for(Tab::Aligner) {
            show_status(ui, status);
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Log").strong());
            if ui.small_button("Clear").clicked() {
                self.send(BackendCommand::ClearLogs);
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("aligner_log")
            .max_height(260.0)
            .stick_to_bottom(true)
            .auto_shrink([false, true])
            .show(ui, |ui| match &self.view.log_panel {
                LogPanel::Placeholder(text) => {
                    ui.label(egui::RichText::new(text).weak().italics());
                }
                LogPanel::Lines(lines) => {
                    for line in lines {
                        ui.monospace(line);
                    }
                }
            });

        if self.view.results_visible {
            ui.separator();
            ui.label(egui::RichText::new("Alignment Results").strong());
            egui::ScrollArea::vertical()
                .id_salt("aligner_results")
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    for entry in &self.view.results {
                        show_result_entry(ui, entry);
                    }
                });
        }
    }

    fn show_primers_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Choose primer sheet…").clicked() {
                if let Some(path) = rfd::FileDialog::new()
                    .add_filter("Primer sheets", &PRIMER_EXTENSIONS)
                    .pick_file()
                {
                    self.send(BackendCommand::SetPrimerFile { path: Some(path) });
                }
            }
            ui.label(self.view.primer_file.as_deref().unwrap_or("No file chosen"));
            if ui.button("Preview").clicked() {
                self.send(BackendCommand::PreviewPrimers);
            }
        });

        ui.horizontal(|ui| {
            ui.label("User");
            if let Some(value) = option_combo(
                ui,
                "primer_user",
                &self.view.users,
                &self.view.selected_user,
                "Select user",
            ) {
                self.view.selected_user = value.clone();
                self.send(BackendCommand::SelectUser { value });
            }
            ui.label("Direction");
            if let Some(value) = option_combo(
                ui,
                "primer_direction",
                &self.view.direction_options,
                &self.view.selected_direction,
                "No Direction",
            ) {
                self.view.selected_direction = value.clone();
                self.send(BackendCommand::SelectDirection { value });
            }
            if ui.small_button("⟳").on_hover_text("Reload lists").clicked() {
                self.send(BackendCommand::RefreshUsers);
                self.send(BackendCommand::RefreshDirectionOptions);
            }
        });

        if let Some(status) = self.view.status_for(Tab::Primers) {
            show_status(ui, status);
        }

        ui.separator();
        ui.label(egui::RichText::new("Preview").strong());
        show_table(ui, "primer_preview", &self.view.preview);
        if ui
            .add_enabled(self.view.can_register, egui::Button::new("Register in Benchling"))
            .clicked()
        {
            self.send(BackendCommand::RegisterPrimers);
        }

        ui.separator();
        ui.label(egui::RichText::new("Registered").strong());
        show_table(ui, "primer_registered", &self.view.registered);
        ui.horizontal(|ui| {
            if ui
                .add_enabled(self.view.can_export, egui::Button::new("Export IDT CSV"))
                .clicked()
            {
                self.send(BackendCommand::ExportIdt);
            }
            if ui
                .add_enabled(self.view.can_export, egui::Button::new("Export Eurofins XLSX"))
                .clicked()
            {
                self.send(BackendCommand::ExportEurofins);
            }
        });
    }

    fn show_helper_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Lines");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.view.helper_tail_input).desired_width(80.0),
            );
            if edit.changed() {
                let input = self.view.helper_tail_input.clone();
                self.send(BackendCommand::SetHelperTail { input });
            }
            if ui.button("Refresh").clicked() {
                self.send(BackendCommand::RefreshHelperLogs);
            }
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .id_salt("helper_logs")
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| match &self.view.helper_logs {
                HelperLogView::NotLoaded => {
                    ui.label(egui::RichText::new("Loading…").weak().italics());
                }
                HelperLogView::Lines(lines) => {
                    for line in lines {
                        ui.monospace(line);
                    }
                }
                HelperLogView::Error(message) => {
                    ui.colored_label(severity_color(StatusSeverity::Error), message);
                }
            });
    }
}

impl eframe::App for AlignerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.handle_pending_download();

        self.show_tab_bar(ctx);
        self.show_bottom_bar(ctx);
        egui::CentralPanel::default().show(ctx, |ui| match self.view.active_tab {
            Tab::Aligner => self.show_aligner_tab(ui),
            Tab::Primers => self.show_primers_tab(ui),
            Tab::HelperLogs => self.show_helper_tab(ui),
        });

        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}

fn severity_color(severity: StatusSeverity) -> egui::Color32 {
    match severity {
        StatusSeverity::Success => egui::Color32::from_rgb(76, 175, 80),
        StatusSeverity::Warning => egui::Color32::from_rgb(230, 160, 40),
        StatusSeverity::Error => egui::Color32::from_rgb(220, 80, 80),
    }
}

fn show_status(ui: &mut egui::Ui, status: &StatusMessage) {
    ui.colored_label(severity_color(status.severity), &status.text);
}

fn show_result_entry(ui: &mut egui::Ui, entry: &ResultEntryView) {
    ui.horizontal_wrapped(|ui| {
        ui.label(egui::RichText::new(&entry.tube_name).strong());
        ui.label("-");
        match &entry.outcome {
            ResultOutcome::Aligned {
                sequence_url,
                alignment_id,
            } => {
                match sequence_url {
                    Some(url) => show_sequence_link(ui, url),
                    None => {
                        ui.colored_label(
                            severity_color(StatusSeverity::Error),
                            SEQUENCE_UNAVAILABLE_TEXT,
                        );
                    }
                }
                if let Some(id) = alignment_id {
                    ui.small(format!("Alignment ID: {id}"));
                }
            }
            ResultOutcome::Failed {
                detail,
                sequence_url,
            } => {
                ui.colored_label(severity_color(StatusSeverity::Error), ALIGNMENT_FAILED_TEXT);
                if let Some(detail) = detail {
                    ui.small(format!("({detail})"));
                }
                if let Some(url) = sequence_url {
                    show_sequence_link(ui, url);
                }
            }
        }
    });
}

fn show_sequence_link(ui: &mut egui::Ui, url: &str) {
    if render::is_web_link(url) {
        ui.hyperlink_to(SEQUENCE_LINK_TEXT, url);
    } else {
        ui.label(format!("{SEQUENCE_LINK_TEXT}: {url}"));
    }
}

fn show_table(ui: &mut egui::Ui, id: &str, table: &TableView) {
    if table.is_empty() {
        ui.label(egui::RichText::new(NO_DATA_TEXT).weak());
        return;
    }
    egui::ScrollArea::both()
        .id_salt(id)
        .max_height(220.0)
        .auto_shrink([false, true])
        .show(ui, |ui| {
            egui::Grid::new(id).striped(true).show(ui, |ui| {
                for column in &table.columns {
                    ui.strong(column);
                }
                ui.end_row();
                for row in &table.rows {
                    for cell in row {
                        ui.label(cell);
                    }
                    ui.end_row();
                }
            });
        });
}

/// Dropdown over `options`; returns the newly picked value.
fn option_combo(
    ui: &mut egui::Ui,
    id: &str,
    options: &[SelectOption],
    selected: &str,
    empty_text: &str,
) -> Option<String> {
    let selected_text = options
        .iter()
        .find(|option| option.value == selected)
        .map(|option| option.label.as_str())
        .filter(|label| !label.is_empty())
        .unwrap_or(empty_text);

    let mut picked = None;
    egui::ComboBox::from_id_salt(id)
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            for option in options {
                if ui
                    .selectable_label(option.value == selected, &option.label)
                    .clicked()
                    && option.value != selected
                {
                    picked = Some(option.value.clone());
                }
            }
        });
    picked
}
