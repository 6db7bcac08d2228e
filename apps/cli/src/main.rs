mod output;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::load_settings,
    render::{html_document, results_html},
    AlignerApi, AlignerController, AlignerResult, ControllerEvent, ControllerOptions, Download,
    HttpAlignerClient, Tab, UploadFile,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "aligner", about = "Client for the Auto Aligner server")]
struct Args {
    /// Overrides the server URL from aligner.toml and the environment.
    #[arg(long, global = true)]
    server_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks that the server is up.
    Health,
    /// Uploads sequencing files and runs the alignment.
    Align {
        files: Vec<PathBuf>,
        /// Keep printing logs and results for this many seconds after the run.
        #[arg(long, default_value_t = 0)]
        watch_secs: u64,
        /// Also write the results as an HTML page.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Prints the server's run log.
    Logs {
        #[arg(long)]
        follow: bool,
    },
    /// Prints the latest alignment results.
    Results {
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Prints the tail of the Benchling helper log.
    HelperLogs {
        #[arg(long, default_value = "")]
        tail: String,
        #[arg(long)]
        follow: bool,
    },
    /// Lists Benchling users for primer registration.
    Users,
    /// Lists primer direction options.
    Directions,
    /// Primer preview, registration and order sheets.
    #[command(subcommand)]
    Primers(PrimerCommand),
}

#[derive(Subcommand, Debug)]
enum PrimerCommand {
    /// Parses a CSV or XLSX primer sheet and prints its rows.
    Preview {
        file: PathBuf,
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Previews, registers and optionally exports order sheets in one go.
    Order {
        file: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "")]
        direction: String,
        #[arg(long)]
        idt: bool,
        #[arg(long)]
        eurofins: bool,
        /// Directory for order sheets; defaults to the configured download dir.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    info!(server_url = %settings.server_url, "using aligner server");

    let client = HttpAlignerClient::with_timeout(&settings.server_url, settings.request_timeout)?;
    let controller = AlignerController::new(client.clone(), ControllerOptions::from(&settings));

    match args.command {
        Command::Health => {
            let health = client.health().await?;
            println!("server status: {}", health.status);
        }
        Command::Align {
            files,
            watch_secs,
            html,
        } => {
            let files = UploadFile::from_paths(&files).await?;
            controller.set_upload_selection(files).await;
            let outcome = controller.run_alignment().await;
            print_status(&controller).await;
            outcome?;

            if let Err(err) = controller.poll_logs_once().await {
                warn!("failed to fetch logs: {err}");
            }
            let snapshot = controller.snapshot().await;
            println!("{}", output::log_panel(&snapshot.log_panel));
            println!("{}", output::results(&snapshot.results));

            if watch_secs > 0 {
                let rx = controller.subscribe_events();
                controller.mount().await;
                follow_events(rx, Some(Duration::from_secs(watch_secs)), print_run_event).await;
                controller.unmount();
            }
            if let Some(path) = html {
                write_results_html(&controller, path).await?;
            }
        }
        Command::Logs { follow } => {
            checked(&controller, controller.poll_logs_once().await).await?;
            println!("{}", output::log_panel(&controller.snapshot().await.log_panel));
            if follow {
                let rx = controller.subscribe_events();
                controller.mount().await;
                follow_events(rx, None, |event| {
                    if let ControllerEvent::LogsReplaced(panel) = event {
                        println!("{}", output::log_panel(panel));
                    }
                })
                .await;
                controller.unmount();
            }
        }
        Command::Results { html } => {
            checked(&controller, controller.poll_results_once().await).await?;
            println!("{}", output::results(&controller.snapshot().await.results));
            if let Some(path) = html {
                write_results_html(&controller, path).await?;
            }
        }
        Command::HelperLogs { tail, follow } => {
            if !tail.is_empty() {
                controller.set_helper_tail(tail).await;
            }
            if follow {
                let rx = controller.subscribe_events();
                controller.select_tab(Tab::HelperLogs).await;
                println!("{}", output::helper_logs(&controller.snapshot().await.helper_logs));
                follow_events(rx, None, |event| {
                    if let ControllerEvent::HelperLogsUpdated(view) = event {
                        println!("{}", output::helper_logs(view));
                    }
                })
                .await;
                controller.unmount();
            } else {
                controller.fetch_helper_logs().await;
                println!("{}", output::helper_logs(&controller.snapshot().await.helper_logs));
            }
        }
        Command::Users => {
            controller.refresh_users().await?;
            println!("{}", output::options(&controller.snapshot().await.users));
        }
        Command::Directions => {
            controller.refresh_direction_options().await?;
            println!(
                "{}",
                output::options(&controller.snapshot().await.direction_options)
            );
        }
        Command::Primers(PrimerCommand::Preview { file, html }) => {
            controller
                .set_primer_file(Some(UploadFile::from_path(&file).await?))
                .await;
            checked(&controller, controller.preview_primers().await).await?;
            let preview = controller.snapshot().await.preview;
            println!("{}", output::table(&preview));
            if let Some(path) = html {
                let page = html_document("Primer Preview", &[("Preview", preview.to_html())]);
                write_file(&path, page.as_bytes()).await?;
            }
        }
        Command::Primers(PrimerCommand::Order {
            file,
            user,
            direction,
            idt,
            eurofins,
            out,
        }) => {
            controller
                .set_primer_file(Some(UploadFile::from_path(&file).await?))
                .await;
            checked(&controller, controller.preview_primers().await).await?;
            controller.select_user(&user).await;
            controller.select_direction(&direction).await;
            let registered = checked(&controller, controller.register_primers().await).await?;
            println!("{}", output::table(&controller.snapshot().await.registered));
            info!(rows = registered, "registration finished");

            let out_dir = out.unwrap_or_else(|| settings.download_dir.clone());
            if idt {
                let download = checked(&controller, controller.export_idt().await).await?;
                save_download(&download, &out_dir).await?;
            }
            if eurofins {
                let download = checked(&controller, controller.export_eurofins().await).await?;
                save_download(&download, &out_dir).await?;
            }
        }
    }

    Ok(())
}

/// Prints the controller's status line for a failed operation before handing the error on.
async fn checked<T>(controller: &AlignerController, result: AlignerResult<T>) -> Result<T> {
    if result.is_err() {
        print_status(controller).await;
    }
    Ok(result?)
}

async fn print_status(controller: &AlignerController) {
    if let Some(status) = controller.snapshot().await.status {
        eprintln!("{}", output::status_line(&status));
    }
}

fn print_run_event(event: &ControllerEvent) {
    match event {
        ControllerEvent::LogsReplaced(panel) => println!("{}", output::log_panel(panel)),
        ControllerEvent::ResultsRendered(entries) => println!("{}", output::results(entries)),
        _ => {}
    }
}

/// Prints events until `limit` elapses or Ctrl-C is pressed.
async fn follow_events(
    mut rx: broadcast::Receiver<ControllerEvent>,
    limit: Option<Duration>,
    on_event: impl Fn(&ControllerEvent),
) {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Ok(event) => on_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

async fn write_results_html(controller: &Arc<AlignerController>, path: PathBuf) -> Result<()> {
    let results = controller.snapshot().await.results;
    let page = html_document(
        "Alignment Results",
        &[("Alignment Results", results_html(&results))],
    );
    write_file(&path, page.as_bytes()).await
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn save_download(download: &Download, dir: &Path) -> Result<()> {
    let path = download.save_into(dir).await?;
    println!("saved {}", path.display());
    Ok(())
}
