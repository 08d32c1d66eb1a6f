//! Interactive terminal dashboard.

use anyhow::Result;
use arani_client::HttpBackend;
use arani_core::{ExportFilter, Phase};
use arani_dashboard::{Config, Dashboard, Signal};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

const CLEAR: &str = "\x1b[2J\x1b[H";
const HELP: &str = "commands: enroll <name> | export <all|authorized|breaches> [--id] | help | quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Enroll(String),
    Export {
        filter: ExportFilter,
        include_id: bool,
    },
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    match verb {
        "enroll" => Ok(Command::Enroll(rest.trim().to_string())),
        "export" => {
            let mut filter = ExportFilter::All;
            let mut include_id = false;
            for arg in rest.split_whitespace() {
                if arg == "--id" {
                    include_id = true;
                } else {
                    filter = arg.parse()?;
                }
            }
            Ok(Command::Export { filter, include_id })
        }
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command '{other}'")),
    }
}

/// Mount the dashboard and run until `quit`, EOF or Ctrl-C.
pub async fn run(config: Config, backend: HttpBackend) -> Result<()> {
    let mut dashboard = Dashboard::mount(config, backend);
    let mut signals = dashboard.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frame = Frame::default();

    frame.status = Some(HELP.to_string());
    frame.render(&dashboard).await;

    let mut exit: Result<()> = Ok(());
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        exit = Err(e.into());
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => frame.status = Some(HELP.to_string()),
                    Ok(Command::Enroll(name)) => {
                        frame.status = Some(match dashboard.enroll(&name) {
                            Ok(()) => format!("enrolling {}", name.trim()),
                            Err(e) => format!("enrollment not started: {e}"),
                        });
                    }
                    Ok(Command::Export { filter, include_id }) => {
                        frame.status = Some(match dashboard.export(filter, include_id).await {
                            Ok((path, report)) => format!("wrote {} rows to {}", report.rows, path.display()),
                            Err(e) => format!("export failed: {e}"),
                        });
                    }
                    Err(msg) if msg.is_empty() => {}
                    Err(msg) => frame.status = Some(format!("{msg}; {HELP}")),
                }
                frame.render(&dashboard).await;
            }
            signal = signals.recv() => {
                match signal {
                    Ok(Signal::Notice(notice)) => frame.status = Some(notice.to_string()),
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "renderer lagged"),
                    Err(RecvError::Closed) => break,
                }
                frame.render(&dashboard).await;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.unmount().await;
    exit
}

/// Last drawn frame plus the operator status line under it.
#[derive(Default)]
struct Frame {
    last: String,
    status: Option<String>,
}

impl Frame {
    /// Redraw only when something visible changed.
    async fn render(&mut self, dashboard: &Dashboard<HttpBackend>) {
        let mut text = dashboard.view().await.to_string();
        if let Some(status) = &self.status {
            text.push('\n');
            text.push_str(status);
            text.push('\n');
        }
        if text != self.last {
            print!("{CLEAR}{text}");
            self.last = text;
        }
    }
}

/// Line-oriented progress output for one-shot enrollment.
#[derive(Default)]
pub struct ProgressPrinter {
    phase: Option<Phase>,
    countdown: Option<u32>,
    progress_decile: Option<u8>,
}

impl ProgressPrinter {
    pub fn print(&mut self, signal: &Signal) {
        if let Some(line) = self.describe(signal) {
            println!("{line}");
        }
    }

    fn describe(&mut self, signal: &Signal) -> Option<String> {
        match signal {
            Signal::Notice(notice) => Some(notice.to_string()),
            Signal::Camera(holder) => Some(format!("camera -> {holder}")),
            Signal::FeedUpdated { .. } => None,
            Signal::Session(state) => {
                let entered = self.phase != Some(state.phase);
                self.phase = Some(state.phase);
                match state.phase {
                    Phase::AwaitingCameraRelease if entered => {
                        Some("releasing camera for enrollment...".to_string())
                    }
                    Phase::Countdown if self.countdown != Some(state.countdown_remaining) => {
                        self.countdown = Some(state.countdown_remaining);
                        Some(format!("{}...", state.countdown_remaining))
                    }
                    Phase::Capturing => {
                        let decile = state.capture_progress / 10;
                        if entered || self.progress_decile != Some(decile) {
                            self.progress_decile = Some(decile);
                            Some(format!("capturing {}%", state.capture_progress))
                        } else {
                            None
                        }
                    }
                    _ => None,
                }
            }
        }
    }
}
