//! Headless desktop shell: a line-oriented front end over the control core.
//!
//! The shell thread reads commands from stdin and forwards them over a
//! crossbeam queue to a backend worker thread that owns the tokio runtime
//! and the control session; notifications stream back on a second queue.

use std::{fs, io::BufRead, path::PathBuf, sync::Arc, thread};

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use gateway::{notification_channel, RestGateway};
use shared::protocol::{ReplayEntry, ToolbarAction};
use url::Url;

use control_core::{ControlSession, FixedSurface, PointerEvent, PointerEventKind};
use shared::domain::Extent;

mod config;

#[derive(Parser, Debug)]
struct Args {
    /// Replay file to load and play on startup.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Initial speed slider position, 0..=150.
    #[arg(long)]
    speed: Option<f64>,
}

#[derive(Debug)]
enum ShellCommand {
    Toolbar(ToolbarAction),
    LoadReplay(PathBuf),
    RecordStart,
    RecordStop(PathBuf),
    Click { x: f64, y: f64 },
    Text(String),
    BackgroundColor(String),
    Relayout,
}

fn parse_line(line: &str) -> Option<ShellCommand> {
    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    match head {
        "play" => Some(ShellCommand::Toolbar(ToolbarAction::Play)),
        "pause" => Some(ShellCommand::Toolbar(ToolbarAction::Pause)),
        "reset" => Some(ShellCommand::Toolbar(ToolbarAction::Reset)),
        "step" => Some(ShellCommand::Toolbar(ToolbarAction::Step)),
        "speed" => {
            let value = parts.next()?.parse().ok()?;
            Some(ShellCommand::Toolbar(ToolbarAction::SimulationSpeed(value)))
        }
        "zoomin" => Some(ShellCommand::Toolbar(ToolbarAction::ZoomIn)),
        "zoomout" => Some(ShellCommand::Toolbar(ToolbarAction::ZoomOut)),
        "zoomfit" => Some(ShellCommand::Toolbar(ToolbarAction::ZoomToFit)),
        "zoomreset" => Some(ShellCommand::Toolbar(ToolbarAction::ResetZoom)),
        "reverse" => match parts.next()? {
            "on" => Some(ShellCommand::Toolbar(ToolbarAction::Reverse(true))),
            "off" => Some(ShellCommand::Toolbar(ToolbarAction::Reverse(false))),
            _ => None,
        },
        "replay" => Some(ShellCommand::LoadReplay(PathBuf::from(parts.next()?))),
        "record" => match parts.next()? {
            "start" => Some(ShellCommand::RecordStart),
            "stop" => Some(ShellCommand::RecordStop(PathBuf::from(parts.next()?))),
            _ => None,
        },
        "click" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            Some(ShellCommand::Click { x, y })
        }
        "text" => {
            let rest = line.strip_prefix("text")?.trim();
            (!rest.is_empty()).then(|| ShellCommand::Text(rest.to_string()))
        }
        "bgcolor" => Some(ShellCommand::BackgroundColor(parts.next()?.to_string())),
        "relayout" => Some(ShellCommand::Relayout),
        _ => None,
    }
}

fn load_replay_file(path: &PathBuf) -> Result<Vec<ReplayEntry>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("malformed replay file {}", path.display()))
}

fn start_backend_worker(
    gateway: Arc<RestGateway>,
    settings: config::Settings,
    args: Args,
    cmd_rx: Receiver<ShellCommand>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let (notify_tx, notify_rx) = notification_channel(256);
            thread::spawn(move || {
                while let Ok(notification) = notify_rx.recv() {
                    match serde_json::to_string(&notification) {
                        Ok(line) => println!("{line}"),
                        Err(err) => tracing::warn!("unprintable notification: {err}"),
                    }
                }
            });

            let surface = Arc::new(FixedSurface::primary(Extent::new(
                settings.surface_width,
                settings.surface_height,
            )));
            let mut session = ControlSession::new(gateway, notify_tx, surface);
            session.relayout();
            session
                .playback()
                .set_speed(args.speed.unwrap_or(settings.initial_speed))
                .await;

            if let Some(path) = &args.replay {
                match load_replay_file(path) {
                    Ok(entries) => session.load_replay(entries).await,
                    Err(err) => tracing::error!("{err:#}"),
                }
            }

            while let Ok(cmd) = cmd_rx.recv() {
                handle_shell_command(&mut session, cmd).await;
            }
        });
    });
}

async fn handle_shell_command(session: &mut ControlSession, cmd: ShellCommand) {
    match cmd {
        ShellCommand::Toolbar(action) => session.handle_toolbar(action).await,
        ShellCommand::LoadReplay(path) => match load_replay_file(&path) {
            Ok(entries) => session.load_replay(entries).await,
            Err(err) => tracing::error!("{err:#}"),
        },
        ShellCommand::RecordStart => session.dispatcher().recorder().start(),
        ShellCommand::RecordStop(path) => {
            let entries = session.dispatcher().recorder().stop();
            match serde_json::to_string_pretty(&entries) {
                Ok(raw) => {
                    if let Err(err) = fs::write(&path, raw) {
                        tracing::error!("failed to write recording {}: {err}", path.display());
                    }
                }
                Err(err) => tracing::error!("failed to serialize recording: {err}"),
            }
        }
        ShellCommand::Click { x, y } => {
            session
                .handle_pointer(PointerEvent::new(PointerEventKind::Down, x, y))
                .await;
            session
                .handle_pointer(PointerEvent::new(PointerEventKind::Up, x, y))
                .await;
        }
        ShellCommand::Text(input) => session.handle_text_capture_submitted(Some(input)).await,
        ShellCommand::BackgroundColor(color) => session.set_background_color(&color).await,
        ShellCommand::Relayout => session.relayout(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();
    let settings = config::load_settings();

    let connection_string = settings.connection_string.clone().context(
        "connection string missing: set connection_string in desktop.toml or APP__CONNECTION_STRING",
    )?;
    let base = Url::parse(&connection_string)
        .with_context(|| format!("invalid connection string: {connection_string}"))?;

    // The gateway (and its blocking probe client) is built on the shell
    // thread, before any runtime exists.
    let gateway = Arc::new(RestGateway::new(base));

    let (cmd_tx, cmd_rx) = bounded::<ShellCommand>(64);
    start_backend_worker(gateway, settings, args, cmd_rx);

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" {
            break;
        }
        match parse_line(trimmed) {
            Some(cmd) => forward(&cmd_tx, cmd),
            None => eprintln!("unrecognized command: {trimmed}"),
        }
    }
    Ok(())
}

fn forward(cmd_tx: &Sender<ShellCommand>, cmd: ShellCommand) {
    match cmd_tx.try_send(cmd) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => eprintln!("command queue is full; please retry"),
        Err(TrySendError::Disconnected(_)) => {
            eprintln!("backend worker disconnected; restart the application")
        }
    }
}
