//! Command orchestration helpers from UI actions to backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

pub fn command_name(cmd: &BackendCommand) -> &'static str {
    match cmd {
        BackendCommand::SelectTab(_) => "select_tab",
        BackendCommand::SetUploadSelection { .. } => "set_upload_selection",
        BackendCommand::RunAlignment => "run_alignment",
        BackendCommand::ClearLogs => "clear_logs",
        BackendCommand::RefreshUsers => "refresh_users",
        BackendCommand::RefreshDirectionOptions => "refresh_direction_options",
        BackendCommand::SelectUser { .. } => "select_user",
        BackendCommand::SelectDirection { .. } => "select_direction",
        BackendCommand::SetPrimerFile { .. } => "set_primer_file",
        BackendCommand::PreviewPrimers => "preview_primers",
        BackendCommand::RegisterPrimers => "register_primers",
        BackendCommand::ExportIdt => "export_idt",
        BackendCommand::ExportEurofins => "export_eurofins",
        BackendCommand::SaveDownload { .. } => "save_download",
        BackendCommand::SetHelperTail { .. } => "set_helper_tail",
        BackendCommand::RefreshHelperLogs => "refresh_helper_logs",
    }
}

pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let cmd_name = command_name(&cmd);

    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = cmd_name, "queued ui->backend command"),
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
        }
        Err(TrySendError::Disconnected(_)) => {
            *status = "Backend command processor disconnected (possible startup failure); restart the app"
                .to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::dispatch_backend_command;
    use crate::backend_bridge::commands::BackendCommand;
    use crossbeam_channel::bounded;

    #[test]
    fn queued_command_leaves_status_untouched() {
        let (tx, rx) = bounded(1);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::RunAlignment, &mut status);
        assert!(status.is_empty());
        assert!(matches!(rx.try_recv(), Ok(BackendCommand::RunAlignment)));
    }

    #[test]
    fn full_queue_and_dead_backend_are_reported() {
        let (tx, rx) = bounded(1);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::ClearLogs, &mut status);
        dispatch_backend_command(&tx, BackendCommand::ClearLogs, &mut status);
        assert_eq!(status, "UI command queue is full; please retry");

        drop(rx);
        dispatch_backend_command(&tx, BackendCommand::ClearLogs, &mut status);
        assert!(status.starts_with("Backend command processor disconnected"));
    }
}
