use anyhow::{bail, Context, Result};
use arani_client::{DetectionReport, HttpBackend};
use arani_core::{CaptureOutcome, EventStatus, ExportFilter};
use arani_dashboard::bus::signal_bus;
use arani_dashboard::export::save_report;
use arani_dashboard::poller::snapshot_once;
use arani_dashboard::{Config, EnrollmentSession, SessionTimings, SharedCamera};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::pin::pin;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod watch;

#[derive(Parser)]
#[command(name = "arani", about = "Arani biometric access dashboard")]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides the config file and ARANI_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live dashboard; operator commands are read from stdin
    Watch,
    /// Print the current event log
    Logs {
        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export the event log as CSV
    Export {
        /// all, authorized or breaches
        #[arg(short, long, default_value = "all")]
        filter: ExportFilter,
        /// Add a leading ID column
        #[arg(long)]
        include_id: bool,
        /// Output directory (defaults to the configured export_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Enroll a new biometric subject
    Enroll {
        /// Subject name
        name: String,
    },
    /// Push a detection event into the backend log
    Report {
        #[arg(short, long)]
        name: String,
        /// authorized or unauthorized
        #[arg(short, long)]
        status: EventStatus,
        /// ISO-8601 timestamp (default: now)
        #[arg(long)]
        timestamp: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout belongs to the dashboard; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout())
        .context("failed to build HTTP client")?;

    match cli.command {
        Commands::Watch => watch::run(config, backend).await?,
        Commands::Logs { json } => {
            let events = snapshot_once(&backend)
                .await
                .with_context(|| format!("failed to fetch event log from {}", backend.base_url()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&*events)?);
            } else if events.is_empty() {
                println!("No detections recorded");
            } else {
                for event in events.iter() {
                    println!(
                        "{:>5}  {:<20} {:<24} {}",
                        event.id, event.subject_name, event.timestamp, event.status
                    );
                }
            }
        }
        Commands::Export {
            filter,
            include_id,
            out,
        } => {
            let events = snapshot_once(&backend)
                .await
                .with_context(|| format!("failed to fetch event log from {}", backend.base_url()))?;
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let (path, report) = save_report(&dir, &events, filter, include_id)
                .await
                .with_context(|| format!("failed to write report to {}", dir.display()))?;
            println!("Wrote {} rows to {}", report.rows, path.display());
        }
        Commands::Enroll { name } => enroll(&config, backend, &name).await?,
        Commands::Report {
            name,
            status,
            timestamp,
        } => {
            let report = DetectionReport {
                name,
                status,
                timestamp: timestamp.unwrap_or_else(|| {
                    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
                }),
            };
            backend
                .report_detection(&report)
                .await
                .context("failed to report detection")?;
            println!("Reported {} ({})", report.name, report.status);
        }
    }

    Ok(())
}

/// Run one enrollment session to completion, printing its progress.
async fn enroll(config: &Config, backend: HttpBackend, name: &str) -> Result<()> {
    let bus = signal_bus();
    let camera = SharedCamera::new(bus.clone());
    let session = EnrollmentSession::new(
        Arc::new(backend),
        camera,
        bus.clone(),
        SessionTimings::from(config),
    );
    let mut signals = bus.subscribe();
    let mut progress = watch::ProgressPrinter::default();

    let task = session.start(name).context("enrollment not started")?;
    let mut settled = pin!(task.wait());
    let result = loop {
        tokio::select! {
            result = &mut settled => {
                while let Ok(signal) = signals.try_recv() {
                    progress.print(&signal);
                }
                break result;
            }
            Ok(signal) = signals.recv() => progress.print(&signal),
        }
    };

    match result.context("enrollment did not complete")? {
        CaptureOutcome::Enrolled { .. } => Ok(()),
        CaptureOutcome::Rejected { reason } => bail!("enrollment for {name} failed: {reason}"),
    }
}
