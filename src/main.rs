//! Application entry point: read a text file aloud in the terminal.
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Initialise logging with the configured level.
//! 4. Open the progress store and look up where this file was left off.
//! 5. Spawn the playback controller with a [`PacedBackend`].
//! 6. Spawn the printer task (utterances and reader events → stdout).
//! 7. Read line commands from stdin until `q`, EOF or Ctrl-C.
//! 8. Stop playback, flush reading progress and remember the last settings
//!    as the new defaults.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use read_aloud::{
    config::{AppConfig, ReaderSettings, ViewMode, MAX_GROUP_SIZE, MIN_GROUP_SIZE},
    persist::JsonProgressStore,
    playback::{PlaybackController, ReaderCommand, ReaderEvent},
    source::{DocumentSource, FileSource},
    speech::{backend_channel, PacedBackend, Utterance},
    viewport::Viewport,
};

const RATE_STEP: f32 = 0.25;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "read-aloud",
    version,
    about = "Read a text document aloud, one chunk at a time"
)]
struct Cli {
    /// Text file to read
    file: PathBuf,

    /// Speaking rate (0.5 – 3.0)
    #[arg(long, env = "READ_ALOUD_RATE")]
    rate: Option<f32>,

    /// Voice identifier passed to the speech backend
    #[arg(long, env = "READ_ALOUD_VOICE")]
    voice: Option<String>,

    /// Sentences per chunk (1 – 200)
    #[arg(long)]
    group_size: Option<usize>,

    /// Chunk to start from, counted from 1 (overrides the saved position)
    #[arg(long)]
    start: Option<usize>,

    /// Settings file to use instead of the platform default
    #[arg(long, env = "READ_ALOUD_CONFIG")]
    config: Option<PathBuf>,
}

/// Layer command-line overrides on top of the saved settings and position.
fn apply_overrides(
    cli: &Cli,
    mut settings: ReaderSettings,
    mut resume_index: usize,
) -> (ReaderSettings, usize) {
    if let Some(rate) = cli.rate {
        settings.playback_rate = rate;
    }
    if let Some(voice) = &cli.voice {
        settings.voice_id = voice.clone();
    }
    if let Some(group_size) = cli.group_size {
        // Same approximate remap the controller uses for live regrouping.
        let old = settings.group_size.clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE);
        let new = group_size.clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE);
        resume_index = resume_index * old / new;
        settings.group_size = new;
    }
    if let Some(start) = cli.start {
        resume_index = start.saturating_sub(1);
    }
    (settings.clamped(), resume_index)
}

// ---------------------------------------------------------------------------
// Line commands
// ---------------------------------------------------------------------------

const HELP: &str = "\
commands:
  p | <enter>   pause / resume
  n / b         next / previous chunk
  j N           jump to chunk N
  + / -         faster / slower
  g+ / g-       more / fewer sentences per chunk
  v             switch continuous / paginated view
  s             stop
  q             quit";

#[derive(Debug)]
enum Input {
    Command(ReaderCommand),
    ToggleView,
    Help,
    Quit,
}

fn parse_input(line: &str) -> Input {
    let mut words = line.split_whitespace();
    match (words.next(), words.next()) {
        (None, _) | (Some("p"), None) => Input::Command(ReaderCommand::Toggle),
        (Some("n"), None) => Input::Command(ReaderCommand::Navigate(1)),
        (Some("b"), None) => Input::Command(ReaderCommand::Navigate(-1)),
        (Some("j"), Some(n)) => match n.parse() {
            Ok(target) => Input::Command(ReaderCommand::Jump(target)),
            Err(_) => Input::Help,
        },
        (Some("+"), None) => Input::Command(ReaderCommand::AdjustRate(RATE_STEP)),
        (Some("-"), None) => Input::Command(ReaderCommand::AdjustRate(-RATE_STEP)),
        (Some("g+"), None) => Input::Command(ReaderCommand::ChangeGroupSize(1)),
        (Some("g-"), None) => Input::Command(ReaderCommand::ChangeGroupSize(-1)),
        (Some("v"), None) => Input::ToggleView,
        (Some("s"), None) => Input::Command(ReaderCommand::Stop),
        (Some("q"), None) => Input::Quit,
        _ => Input::Help,
    }
}

// ---------------------------------------------------------------------------
// Printer
// ---------------------------------------------------------------------------

/// Print utterances as they are spoken and reader events as they happen.
async fn print_events(
    mut events: mpsc::UnboundedReceiver<ReaderEvent>,
    mut narration: mpsc::UnboundedReceiver<Utterance>,
    view_mode: ViewMode,
) {
    let mut viewport = Viewport::new(view_mode);

    loop {
        tokio::select! {
            Some(utterance) = narration.recv() => println!("  » {}", utterance.text),
            event = events.recv() => {
                let Some(event) = event else { break };
                viewport.apply(&event);
                match &event {
                    ReaderEvent::StateChanged(state) => println!("[{}]", state.label()),
                    ReaderEvent::IndexChanged { index, .. } => {
                        let visible = viewport.visible_range();
                        let page = viewport.page_label().unwrap_or_default();
                        println!(
                            "[chunk {}/{} · showing {}–{} {page}]",
                            index + 1,
                            viewport.count(),
                            visible.start + 1,
                            visible.end
                        );
                    }
                    ReaderEvent::DocumentChanged(document) => println!(
                        "[{} chunks, {} sentence(s) each]",
                        document.len(),
                        document.group_size()
                    ),
                    ReaderEvent::SettingsChanged(settings) => println!(
                        "[rate {:.2}× · volume {} · voice {} · group {}]",
                        settings.playback_rate,
                        settings.volume,
                        settings.voice_id,
                        settings.group_size
                    ),
                    ReaderEvent::Error(e) => eprintln!("error: {e}"),
                    ReaderEvent::Progress(_) => {}
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Command line
    let cli = Cli::parse();

    // 2. Configuration
    let loaded = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let (mut config, load_error) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // 3. Logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_level.as_str()),
    )
    .init();
    log::info!("read-aloud starting up");
    if let Some(e) = load_error {
        log::warn!("Failed to load config ({e:#}); using defaults");
    }

    // 4. Saved progress
    let store = Arc::new(JsonProgressStore::open_or_empty(config.progress_path()));
    let source = Arc::new(FileSource::new(&cli.file));
    let key = source.key();

    let mut settings = config.reader.clone();
    let mut resume_index = 0;
    if let Some(record) = store.load(&key) {
        log::info!("Resuming {key} at chunk {}", record.chunk_index + 1);
        settings = record.settings;
        resume_index = record.chunk_index;
    }
    let (settings, resume_index) = apply_overrides(&cli, settings, resume_index);

    // 5. Controller + paced backend
    let (backend_tx, backend_rx) = backend_channel();
    let (narration_tx, narration_rx) = mpsc::unbounded_channel();
    let backend = Arc::new(
        PacedBackend::new(backend_tx, config.speech.clone()).with_narration(narration_tx),
    );
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel::<ReaderCommand>(32);

    let controller = PlaybackController::new(
        backend,
        Arc::new(store.sink(key)),
        event_tx,
        settings.clone(),
    );
    let controller_task = tokio::spawn(controller.run(command_rx, backend_rx));

    // 6. Printer
    let printer = tokio::spawn(print_events(event_rx, narration_rx, settings.view_mode));

    command_tx
        .send(ReaderCommand::Open {
            source,
            progress: None,
            resume_index,
        })
        .await
        .context("controller stopped before the document was opened")?;
    command_tx
        .send(ReaderCommand::Play(None))
        .await
        .context("controller stopped unexpectedly")?;

    println!("{HELP}");

    // 7. Line commands
    let mut view_mode = settings.view_mode;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let command = match parse_input(&line) {
            Input::Command(command) => command,
            Input::ToggleView => {
                view_mode = match view_mode {
                    ViewMode::Continuous => ViewMode::Paginated,
                    ViewMode::Paginated => ViewMode::Continuous,
                };
                ReaderCommand::SetViewMode(view_mode)
            }
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
        };
        if command_tx.send(command).await.is_err() {
            log::warn!("Controller stopped; exiting");
            break;
        }
    }

    // 8. Shutdown
    drop(command_tx);
    let controller = controller_task
        .await
        .context("playback controller panicked")?;

    let flushed = tokio::task::spawn_blocking({
        let store = Arc::clone(&store);
        move || store.flush()
    })
    .await
    .context("progress flush panicked")?;
    if let Err(e) = flushed {
        log::warn!("Failed to save reading progress: {e}");
    }

    config.reader = controller.settings().clone();
    let saved = match &cli.config {
        Some(path) => config.save_to(path),
        None => config.save(),
    };
    if let Err(e) = saved {
        log::warn!("Failed to save settings: {e:#}");
    }

    drop(controller);
    let _ = printer.await;
    log::info!("read-aloud shut down");
    Ok(())
}
