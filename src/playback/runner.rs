//! Async driver for the [`PlaybackController`].
//!
//! [`PlaybackController::run`] owns the controller inside one tokio task and
//! multiplexes its three inputs:
//!
//! ```text
//!  ReaderCommand (mpsc) ──┐
//!  BackendEvent (mpsc) ───┼─▶ select! ─▶ PlaybackController ─▶ ReaderEvent (mpsc)
//!  progress ticker ───────┘
//! ```
//!
//! The ticker is a single `tokio::time::Interval` that exists only while the
//! progress estimator is armed. It is rebuilt whenever the estimator is
//! re-armed, so a chunk never inherits the phase of the previous one and no
//! tick is delivered after pause, stop, completion or failure.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::config::{ReaderSettings, ViewMode};
use crate::persist::ProgressSink;
use crate::source::DocumentSource;
use crate::speech::BackendEventReceiver;

use super::controller::PlaybackController;
use super::progress::{ProgressEstimator, TICK};

// ---------------------------------------------------------------------------
// ReaderCommand
// ---------------------------------------------------------------------------

/// User-facing commands accepted by the run loop.
#[derive(Debug)]
pub enum ReaderCommand {
    /// Resolve a source and load it. `progress`, when given, becomes the sink
    /// for this document.
    Open {
        source: Arc<dyn DocumentSource>,
        progress: Option<Arc<dyn ProgressSink>>,
        resume_index: usize,
    },
    Load {
        text: String,
        resume_index: usize,
    },
    /// Play the given chunk, or the current one.
    Play(Option<usize>),
    Pause,
    Resume,
    Toggle,
    Stop,
    Navigate(isize),
    /// 1-based chunk number.
    Jump(usize),
    ChangeGroupSize(isize),
    SetRate(f32),
    AdjustRate(f32),
    SetVolume(u8),
    SetVoice(String),
    SetViewMode(ViewMode),
    ApplySettings(ReaderSettings),
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

impl PlaybackController {
    /// Drive the controller until `commands` is closed, then stop playback
    /// and hand the controller back.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ReaderCommand>,
        mut backend_events: BackendEventReceiver,
    ) -> Self {
        let mut ticker: Option<(u64, Interval)> = None;

        loop {
            sync_ticker(self.progress(), &mut ticker);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = backend_events.recv() => self.on_backend_event(event),
                _ = next_tick(&mut ticker) => self.tick(),
            }
        }

        self.stop();
        log::info!("playback: command channel closed, controller shutting down");
        self
    }

    /// Apply one command.
    pub async fn handle_command(&mut self, command: ReaderCommand) {
        log::trace!("playback: command {command:?}");
        match command {
            ReaderCommand::Open {
                source,
                progress,
                resume_index,
            } => {
                if let Some(sink) = progress {
                    self.set_progress_sink(sink);
                }
                // Failures are already reported as ReaderEvent::Error.
                let _ = self.open(source.as_ref(), resume_index).await;
            }
            ReaderCommand::Load { text, resume_index } => self.load_text(text, resume_index),
            ReaderCommand::Play(index) => {
                let index = index.unwrap_or_else(|| self.index());
                self.play(index);
            }
            ReaderCommand::Pause => self.pause(),
            ReaderCommand::Resume => self.resume(),
            ReaderCommand::Toggle => self.toggle(),
            ReaderCommand::Stop => self.stop(),
            ReaderCommand::Navigate(offset) => self.navigate(offset),
            ReaderCommand::Jump(target) => self.jump(target),
            ReaderCommand::ChangeGroupSize(delta) => self.change_group_size(delta),
            ReaderCommand::SetRate(rate) => self.set_playback_rate(rate),
            ReaderCommand::AdjustRate(delta) => self.adjust_playback_rate(delta),
            ReaderCommand::SetVolume(volume) => self.set_volume(volume),
            ReaderCommand::SetVoice(voice) => self.set_voice(voice),
            ReaderCommand::SetViewMode(mode) => self.set_view_mode(mode),
            ReaderCommand::ApplySettings(settings) => self.apply_settings(settings),
        }
    }
}

/// Keep `ticker` in step with the estimator: absent while disarmed, rebuilt
/// on every new arming.
fn sync_ticker(progress: &ProgressEstimator, ticker: &mut Option<(u64, Interval)>) {
    if !progress.is_armed() {
        *ticker = None;
        return;
    }
    let generation = progress.generation();
    if ticker.as_ref().map(|(g, _)| *g) != Some(generation) {
        let mut interval = time::interval_at(Instant::now() + TICK, TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *ticker = Some((generation, interval));
    }
}

async fn next_tick(ticker: &mut Option<(u64, Interval)>) {
    match ticker {
        Some((_, interval)) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinHandle;

    use super::*;
    use crate::config::SpeechConfig;
    use crate::persist::RecordingSink;
    use crate::playback::{IndexChange, PlaybackState, ReaderEvent};
    use crate::source::StaticSource;
    use crate::speech::{
        backend_channel, BackendCall, BackendEvent, BackendEventKind, BackendEventSender,
        PacedBackend, RecordingBackend,
    };

    const TEXT: &str = "The first sentence is here. The second one follows. Third.";

    struct Running {
        commands: mpsc::Sender<ReaderCommand>,
        events: mpsc::UnboundedReceiver<ReaderEvent>,
        backend_tx: BackendEventSender,
        backend: Arc<RecordingBackend>,
        sink: Arc<RecordingSink>,
        task: JoinHandle<PlaybackController>,
    }

    impl Running {
        fn spawn() -> Self {
            let (backend_tx, backend_rx) = backend_channel();
            let backend = Arc::new(RecordingBackend::new());
            let sink = Arc::new(RecordingSink::new());
            let (events_tx, events) = mpsc::unbounded_channel();
            let (commands, commands_rx) = mpsc::channel(16);
            let reader = PlaybackController::new(
                backend.clone(),
                sink.clone(),
                events_tx,
                ReaderSettings::default(),
            );
            let task = tokio::spawn(reader.run(commands_rx, backend_rx));
            Self {
                commands,
                events,
                backend_tx,
                backend,
                sink,
                task,
            }
        }

        async fn send(&self, command: ReaderCommand) {
            self.commands.send(command).await.expect("controller alive");
        }

        async fn wait_for(&mut self, pred: impl Fn(&ReaderEvent) -> bool) -> ReaderEvent {
            loop {
                let event = self.events.recv().await.expect("event stream open");
                if pred(&event) {
                    return event;
                }
            }
        }

        fn finish_current(&self) {
            let ticket = self.backend.last_ticket();
            self.backend_tx
                .send(BackendEvent {
                    ticket,
                    kind: BackendEventKind::Finished,
                })
                .expect("backend channel open");
        }

        fn progress_values(&mut self) -> Vec<f32> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                if let ReaderEvent::Progress(p) = event {
                    out.push(p);
                }
            }
            out
        }

        async fn shutdown(self) -> PlaybackController {
            drop(self.commands);
            self.task.await.expect("controller task")
        }
    }

    #[tokio::test]
    async fn commands_drive_playback_and_completion_advances() {
        let mut r = Running::spawn();
        r.send(ReaderCommand::Load {
            text: TEXT.into(),
            resume_index: 0,
        })
        .await;
        r.send(ReaderCommand::Play(None)).await;
        r.wait_for(|e| {
            matches!(
                e,
                ReaderEvent::IndexChanged {
                    index: 0,
                    cause: IndexChange::Navigation
                }
            )
        })
        .await;

        r.finish_current();
        r.wait_for(|e| {
            matches!(
                e,
                ReaderEvent::IndexChanged {
                    index: 1,
                    cause: IndexChange::AutoAdvance
                }
            )
        })
        .await;
        assert_eq!(r.backend.last_request().text, "The second one follows.");
        assert!(!r.backend.last_request().cancel_previous);

        let backend = r.backend.clone();
        let reader = r.shutdown().await;
        assert_eq!(reader.state(), PlaybackState::Idle);
        assert_eq!(reader.index(), 1);
        assert_eq!(backend.count(&BackendCall::Stop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_runs_only_while_playing() {
        let mut r = Running::spawn();
        r.send(ReaderCommand::Load {
            text: TEXT.into(),
            resume_index: 0,
        })
        .await;
        r.send(ReaderCommand::Play(Some(0))).await;
        time::sleep(Duration::from_millis(1_050)).await;

        let values = r.progress_values();
        assert!(values.len() >= 10, "{values:?}");
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
        assert!(values.iter().all(|p| *p < 95.0));

        r.send(ReaderCommand::Pause).await;
        time::sleep(Duration::from_millis(50)).await;
        r.progress_values();
        time::sleep(Duration::from_secs(2)).await;
        assert!(r.progress_values().is_empty());

        r.send(ReaderCommand::Resume).await;
        time::sleep(Duration::from_millis(550)).await;
        assert!(!r.progress_values().is_empty());

        r.send(ReaderCommand::Stop).await;
        time::sleep(Duration::from_millis(50)).await;
        r.progress_values();
        time::sleep(Duration::from_secs(2)).await;
        assert!(r.progress_values().is_empty());

        r.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn completion_reports_exactly_100() {
        let mut r = Running::spawn();
        r.send(ReaderCommand::Load {
            text: "Just one sentence to read.".into(),
            resume_index: 0,
        })
        .await;
        r.send(ReaderCommand::Play(None)).await;
        time::sleep(Duration::from_millis(300)).await;
        assert!(r.progress_values().iter().all(|p| *p < 100.0));

        r.finish_current();
        r.wait_for(|e| matches!(e, ReaderEvent::Progress(p) if *p == 100.0))
            .await;
        r.wait_for(|e| matches!(e, ReaderEvent::StateChanged(PlaybackState::Idle)))
            .await;
        r.shutdown().await;
    }

    #[tokio::test]
    async fn open_switches_progress_sink() {
        let mut r = Running::spawn();
        let document_sink = Arc::new(RecordingSink::new());
        r.send(ReaderCommand::Open {
            source: Arc::new(StaticSource::new("doc", TEXT)),
            progress: Some(document_sink.clone()),
            resume_index: 2,
        })
        .await;
        r.wait_for(|e| matches!(e, ReaderEvent::DocumentChanged(d) if d.len() == 3))
            .await;

        assert_eq!(document_sink.indices(), [2]);
        assert!(r.sink.saves().is_empty());
        let reader = r.shutdown().await;
        assert_eq!(reader.index(), 2);
    }

    #[tokio::test]
    async fn settings_commands_reach_controller() {
        let mut r = Running::spawn();
        r.send(ReaderCommand::Load {
            text: TEXT.into(),
            resume_index: 0,
        })
        .await;
        r.send(ReaderCommand::AdjustRate(0.25)).await;
        r.send(ReaderCommand::SetVolume(55)).await;
        r.send(ReaderCommand::SetVoice("alt".into())).await;
        r.send(ReaderCommand::SetViewMode(ViewMode::Paginated)).await;
        r.send(ReaderCommand::ChangeGroupSize(2)).await;

        let reader = r.shutdown().await;
        let settings = reader.settings();
        assert_eq!(settings.playback_rate, 1.25);
        assert_eq!(settings.volume, 55);
        assert_eq!(settings.voice_id, "alt");
        assert_eq!(settings.view_mode, ViewMode::Paginated);
        assert_eq!(settings.group_size, 3);
        assert_eq!(reader.document().len(), 1);
    }

    // ── end to end with the paced backend ───────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn paced_backend_reads_document_to_the_end() {
        let (backend_tx, backend_rx) = backend_channel();
        let (narration_tx, mut narration) = mpsc::unbounded_channel();
        let backend = Arc::new(
            PacedBackend::new(backend_tx, SpeechConfig::default()).with_narration(narration_tx),
        );
        let sink = Arc::new(RecordingSink::new());
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (commands, commands_rx) = mpsc::channel(8);
        let reader =
            PlaybackController::new(backend, sink.clone(), events_tx, ReaderSettings::default());
        let task = tokio::spawn(reader.run(commands_rx, backend_rx));

        commands
            .send(ReaderCommand::Load {
                text: TEXT.into(),
                resume_index: 0,
            })
            .await
            .expect("send");
        commands.send(ReaderCommand::Play(None)).await.expect("send");

        let mut played = Vec::new();
        let mut playing = false;
        loop {
            match events.recv().await.expect("event") {
                ReaderEvent::StateChanged(PlaybackState::Playing) => playing = true,
                ReaderEvent::StateChanged(PlaybackState::Idle) if playing => break,
                ReaderEvent::IndexChanged { index, cause } if cause != IndexChange::Load => {
                    played.push(index)
                }
                ReaderEvent::Progress(p) => assert!((0.0..=100.0).contains(&p)),
                ReaderEvent::Error(e) => panic!("unexpected error: {e}"),
                _ => {}
            }
        }
        assert_eq!(played, [0, 1, 2]);

        let mut spoken = Vec::new();
        while let Ok(u) = narration.try_recv() {
            spoken.push(u.text);
        }
        assert_eq!(
            spoken,
            [
                "The first sentence is here.",
                "The second one follows.",
                "Third."
            ]
        );
        assert_eq!(sink.indices(), [0, 1, 2]);

        drop(commands);
        let reader = task.await.expect("controller task");
        assert_eq!(reader.index(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_chunk_suppresses_late_callbacks() {
        let (backend_tx, backend_rx) = backend_channel();
        let backend = Arc::new(PacedBackend::new(backend_tx, SpeechConfig::default()));
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (commands, commands_rx) = mpsc::channel(8);
        let reader = PlaybackController::new(
            backend,
            Arc::new(RecordingSink::new()),
            events_tx,
            ReaderSettings::default(),
        );
        let task = tokio::spawn(reader.run(commands_rx, backend_rx));

        commands
            .send(ReaderCommand::Load {
                text: TEXT.into(),
                resume_index: 0,
            })
            .await
            .expect("send");
        commands.send(ReaderCommand::Play(None)).await.expect("send");
        time::sleep(Duration::from_millis(400)).await;
        commands.send(ReaderCommand::Stop).await.expect("send");
        time::sleep(Duration::from_secs(10)).await;

        let mut after_stop = Vec::new();
        let mut stopped = false;
        while let Ok(event) = events.try_recv() {
            if stopped {
                after_stop.push(event);
            } else if matches!(event, ReaderEvent::StateChanged(PlaybackState::Idle)) {
                stopped = true;
            }
        }
        assert!(stopped);
        assert!(after_stop.is_empty(), "{after_stop:?}");

        drop(commands);
        let reader = task.await.expect("controller task");
        assert_eq!(reader.index(), 0);
        assert_eq!(reader.state(), PlaybackState::Idle);
    }
}
