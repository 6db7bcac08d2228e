//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{
    config::Settings, AlignerController, AlignerError, ControllerOptions, HttpAlignerClient,
    UploadFile,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiErrorContext, UiEvent},
    orchestration::command_name,
};

/// Starts the backend worker thread with its own tokio runtime.
pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                deliver(&ui_tx, UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let client = match HttpAlignerClient::with_timeout(
                &settings.server_url,
                settings.request_timeout,
            ) {
                Ok(client) => client,
                Err(err) => {
                    deliver(&ui_tx, UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        err.to_string(),
                    )));
                    tracing::error!("failed to create aligner client: {err}");
                    return;
                }
            };
            let controller = AlignerController::new(client, ControllerOptions::from(&settings));

            let mut events = controller.subscribe_events();
            let ui_tx_clone = ui_tx.clone();
            let forward_task = tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) => {
                            deliver(&ui_tx_clone, UiEvent::Controller(event));
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "controller event stream lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });

            controller.mount().await;
            deliver(&ui_tx, UiEvent::Info(format!(
                "Connected to {}",
                settings.server_url
            )));

            while let Ok(cmd) = cmd_rx.recv() {
                tracing::debug!(command = command_name(&cmd), "handling ui command");
                handle_command(&controller, &ui_tx, cmd).await;
            }

            tracing::info!("ui command queue closed; stopping backend worker");
            controller.unmount();
            forward_task.abort();
        });
    });
}

async fn handle_command(
    controller: &Arc<AlignerController>,
    ui_tx: &Sender<UiEvent>,
    cmd: BackendCommand,
) {
    // Controller operations report their own failures through status events;
    // the results here only feed the log.
    match cmd {
        BackendCommand::SelectTab(tab) => controller.select_tab(tab).await,
        BackendCommand::SetUploadSelection { paths } => {
            match UploadFile::from_paths(&paths).await {
                Ok(files) => {
                    let filenames = files.iter().map(|file| file.filename.clone()).collect();
                    controller.set_upload_selection(files).await;
                    deliver(ui_tx, UiEvent::UploadSelectionRead { filenames });
                }
                Err(err) => send_error(ui_tx, UiErrorContext::ReadFiles, &err),
            }
        }
        BackendCommand::RunAlignment => {
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                if let Err(err) = controller.run_alignment().await {
                    tracing::debug!("alignment run ended with error: {err}");
                }
            });
        }
        BackendCommand::ClearLogs => controller.clear_logs().await,
        BackendCommand::RefreshUsers => log_failure("refresh users", controller.refresh_users().await),
        BackendCommand::RefreshDirectionOptions => log_failure(
            "refresh direction options",
            controller.refresh_direction_options().await,
        ),
        BackendCommand::SelectUser { value } => controller.select_user(&value).await,
        BackendCommand::SelectDirection { value } => controller.select_direction(&value).await,
        BackendCommand::SetPrimerFile { path } => match path {
            None => controller.set_primer_file(None).await,
            Some(path) => match UploadFile::from_path(&path).await {
                Ok(file) => controller.set_primer_file(Some(file)).await,
                Err(err) => send_error(ui_tx, UiErrorContext::ReadFiles, &err),
            },
        },
        BackendCommand::PreviewPrimers => {
            log_failure("preview primers", controller.preview_primers().await)
        }
        BackendCommand::RegisterPrimers => {
            log_failure("register primers", controller.register_primers().await)
        }
        BackendCommand::ExportIdt => {
            if let Ok(download) = controller.export_idt().await {
                deliver(ui_tx, UiEvent::DownloadReady(download));
            }
        }
        BackendCommand::ExportEurofins => {
            if let Ok(download) = controller.export_eurofins().await {
                deliver(ui_tx, UiEvent::DownloadReady(download));
            }
        }
        BackendCommand::SaveDownload { download, path } => {
            match download.save_as(&path).await {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "saved download");
                    deliver(ui_tx, UiEvent::DownloadSaved(path));
                }
                Err(err) => send_error(ui_tx, UiErrorContext::SaveDownload, &err),
            }
        }
        BackendCommand::SetHelperTail { input } => controller.set_helper_tail(input).await,
        BackendCommand::RefreshHelperLogs => controller.fetch_helper_logs().await,
    }
}

fn send_error(ui_tx: &Sender<UiEvent>, context: UiErrorContext, err: &AlignerError) {
    tracing::warn!(?context, "{err}");
    deliver(ui_tx, UiEvent::Error(UiError::from_message(
        context,
        err.to_string(),
    )));
}

/// Hands an event to the UI thread. Returns false, after logging, when it was dropped.
fn deliver(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            tracing::warn!(event = event_name(&event), "ui event queue full; dropping event");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::debug!("ui event queue closed; dropping event");
            false
        }
    }
}

fn event_name(event: &UiEvent) -> &'static str {
    match event {
        UiEvent::Info(_) => "info",
        UiEvent::Error(_) => "error",
        UiEvent::Controller(_) => "controller",
        UiEvent::UploadSelectionRead { .. } => "upload_selection_read",
        UiEvent::DownloadReady(_) => "download_ready",
        UiEvent::DownloadSaved(_) => "download_saved",
    }
}

fn log_failure<T>(operation: &str, result: Result<T, AlignerError>) {
    if let Err(err) = result {
        tracing::debug!("{operation} failed: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::deliver;
    use crate::controller::events::UiEvent;
    use crossbeam_channel::bounded;

    #[test]
    fn full_or_closed_ui_queue_drops_events() {
        let (tx, rx) = bounded(1);
        assert!(deliver(&tx, UiEvent::Info("first".to_string())));
        assert!(!deliver(&tx, UiEvent::Info("second".to_string())));
        assert!(matches!(rx.try_recv(), Ok(UiEvent::Info(message)) if message == "first"));

        drop(rx);
        assert!(!deliver(&tx, UiEvent::Info("late".to_string())));
    }
}
