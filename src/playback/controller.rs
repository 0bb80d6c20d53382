//! Playback controller: sequences chunks through a [`SpeechBackend`].
//!
//! [`PlaybackController`] owns the current [`Document`], chunk index,
//! [`ReaderSettings`] and the [`ProgressEstimator`]. Every method runs to
//! completion synchronously; the backend answers later through
//! [`PlaybackController::on_backend_event`], which the run loop feeds from the
//! backend's event channel.
//!
//! # Sessions
//!
//! ```text
//! play / navigate / jump / restart   → session += 1, cancel_previous = true
//! auto-advance after Finished        → session kept,  cancel_previous = false
//! stop                               → session += 1, backend.stop()
//! ```
//!
//! Each speak request gets a fresh [`SpeechTicket`]. Only events for the
//! ticket currently in flight are acted on, so a `Finished` or `Failed`
//! arriving late from a superseded request can never advance, stop or fail
//! the controller.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{clamp_rate, ReaderSettings, ViewMode, MAX_GROUP_SIZE, MIN_GROUP_SIZE};
use crate::persist::ProgressSink;
use crate::source::{DocumentSource, SourceError};
use crate::speech::{
    BackendEvent, BackendEventKind, SpeakRequest, SpeechBackend, SpeechError, SpeechTicket,
};
use crate::text::Document;

use super::progress::ProgressEstimator;
use super::state::{IndexChange, PlaybackState, PlaybackStatus, ReaderEvent};

// ---------------------------------------------------------------------------
// ReaderError
// ---------------------------------------------------------------------------

/// Failures surfaced to the user as [`ReaderEvent::Error`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReaderError {
    #[error("speech failed: {0}")]
    Speech(#[from] SpeechError),

    #[error("could not open document: {0}")]
    Source(#[from] SourceError),
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// The read-aloud state machine.
///
/// ```rust
/// use std::sync::Arc;
/// use read_aloud::config::{ReaderSettings, SpeechConfig};
/// use read_aloud::persist::NullProgressSink;
/// use read_aloud::playback::{PlaybackController, PlaybackState};
/// use read_aloud::speech::{backend_channel, PacedBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let (backend_tx, _backend_rx) = backend_channel();
/// let (events_tx, _events_rx) = tokio::sync::mpsc::unbounded_channel();
/// let backend = Arc::new(PacedBackend::new(backend_tx, SpeechConfig::default()));
///
/// let mut reader = PlaybackController::new(
///     backend,
///     Arc::new(NullProgressSink),
///     events_tx,
///     ReaderSettings::default(),
/// );
/// reader.load_text("First sentence. Second one.".into(), 0);
/// reader.play(1);
/// assert_eq!(reader.state(), PlaybackState::Playing);
/// assert_eq!(reader.index(), 1);
/// # }
/// ```
pub struct PlaybackController {
    backend: Arc<dyn SpeechBackend>,
    sink: Arc<dyn ProgressSink>,
    events: mpsc::UnboundedSender<ReaderEvent>,

    text: String,
    document: Arc<Document>,
    settings: ReaderSettings,

    state: PlaybackState,
    index: usize,
    progress: ProgressEstimator,

    session: u64,
    request: u64,
    in_flight: Option<SpeechTicket>,
    /// The current chunk completed while paused; resume moves on.
    finished_while_paused: bool,
    last_saved: Option<(usize, ReaderSettings)>,
}

impl PlaybackController {
    /// Create an idle controller with an empty document.
    ///
    /// `settings` are clamped into their valid ranges.
    pub fn new(
        backend: Arc<dyn SpeechBackend>,
        sink: Arc<dyn ProgressSink>,
        events: mpsc::UnboundedSender<ReaderEvent>,
        settings: ReaderSettings,
    ) -> Self {
        Self {
            backend,
            sink,
            events,
            text: String::new(),
            document: Arc::new(Document::empty()),
            settings: settings.clamped(),
            state: PlaybackState::Idle,
            index: 0,
            progress: ProgressEstimator::new(),
            session: 0,
            request: 0,
            in_flight: None,
            finished_while_paused: false,
            last_saved: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn progress(&self) -> &ProgressEstimator {
        &self.progress
    }

    pub fn snapshot(&self) -> PlaybackStatus {
        PlaybackStatus {
            state: self.state,
            index: self.index,
            chunk_count: self.document.len(),
            progress: self.progress.value(),
            settings: self.settings.clone(),
        }
    }

    /// Route future progress snapshots to `sink` (a different document).
    pub fn set_progress_sink(&mut self, sink: Arc<dyn ProgressSink>) {
        self.sink = sink;
        self.last_saved = None;
    }

    // -----------------------------------------------------------------------
    // Documents
    // -----------------------------------------------------------------------

    /// Replace the document with `text`, positioned at `resume_index`.
    ///
    /// Any playback is stopped first. The index is clamped to the new chunk
    /// count.
    pub fn load_text(&mut self, text: String, resume_index: usize) {
        self.stop();
        self.text = text;
        self.document = Arc::new(Document::new(&self.text, self.settings.group_size));
        self.index = self.document.clamp_index(resume_index);
        self.progress.reset();

        log::info!(
            "playback: loaded {} chunks (group size {}), at chunk {}",
            self.document.len(),
            self.settings.group_size,
            self.index
        );

        self.emit(ReaderEvent::DocumentChanged(Arc::clone(&self.document)));
        self.emit(ReaderEvent::IndexChanged {
            index: self.index,
            cause: IndexChange::Load,
        });
        self.emit(ReaderEvent::Progress(0.0));
        self.persist();
    }

    /// Resolve `source` and load its text.
    ///
    /// The controller sits in `Loading` while the source resolves. A failure
    /// is emitted as [`ReaderEvent::Error`], returned, and leaves the current
    /// document untouched.
    pub async fn open(
        &mut self,
        source: &dyn DocumentSource,
        resume_index: usize,
    ) -> Result<(), ReaderError> {
        self.stop();
        self.set_state(PlaybackState::Loading);
        log::info!("playback: opening {}", source.key());

        match source.load_text().await {
            Ok(text) => {
                self.set_state(PlaybackState::Idle);
                self.load_text(text, resume_index);
                Ok(())
            }
            Err(e) => {
                log::error!("playback: {e}");
                self.set_state(PlaybackState::Idle);
                let err = ReaderError::from(e);
                self.emit(ReaderEvent::Error(err.clone()));
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Transport
    // -----------------------------------------------------------------------

    /// Start speaking chunk `index` (clamped), cancelling whatever was
    /// speaking.
    pub fn play(&mut self, index: usize) {
        self.start_chunk(index, true, IndexChange::Navigation);
    }

    /// Pause the current chunk. No-op unless playing.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.backend.pause();
        self.progress.halt();
        self.set_state(PlaybackState::Paused);
    }

    /// Resume a paused chunk. No-op unless paused.
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.backend.resume();
        if self.finished_while_paused {
            self.finished_while_paused = false;
            self.advance();
        } else {
            self.progress.resume();
            self.set_state(PlaybackState::Playing);
        }
    }

    /// Playing → pause, Paused → resume, Idle → play the current chunk.
    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Paused => self.resume(),
            PlaybackState::Idle => self.play(self.index),
            PlaybackState::Loading => {}
        }
    }

    /// Cancel backend activity and the progress timer. The index is kept.
    ///
    /// Safe to call repeatedly; the backend is only told to stop when
    /// something was queued or speaking.
    pub fn stop(&mut self) {
        let busy = self.in_flight.is_some() || self.state.is_active();
        self.session = self.session.wrapping_add(1);
        self.in_flight = None;
        self.finished_while_paused = false;
        self.progress.halt();
        if busy {
            self.backend.stop();
        }
        self.set_state(PlaybackState::Idle);
    }

    /// Move `offset` chunks (clamped to the document) and play from there.
    pub fn navigate(&mut self, offset: isize) {
        if self.document.is_empty() {
            return;
        }
        let last = self.document.len() - 1;
        let target = self.index.saturating_add_signed(offset).min(last);
        self.stop();
        self.start_chunk(target, true, IndexChange::Navigation);
    }

    /// Play chunk `target` counted from 1. Out-of-range targets are ignored.
    pub fn jump(&mut self, target: usize) {
        if target == 0 || target > self.document.len() {
            log::debug!(
                "playback: ignoring jump to {target} (document has {} chunks)",
                self.document.len()
            );
            return;
        }
        self.stop();
        self.start_chunk(target - 1, true, IndexChange::Navigation);
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Replace all settings at once.
    ///
    /// Values are clamped. A rate, volume or voice change while playing
    /// restarts the current chunk; a group-size change re-segments the text.
    pub fn apply_settings(&mut self, settings: ReaderSettings) {
        let settings = settings.clamped();
        if settings == self.settings {
            return;
        }

        let restart =
            self.state == PlaybackState::Playing && self.settings.speech_differs(&settings);
        let old_group = self.settings.group_size;
        self.settings = settings;

        log::debug!("playback: settings → {:?}", self.settings);
        self.emit(ReaderEvent::SettingsChanged(self.settings.clone()));

        if self.settings.group_size != old_group {
            self.regroup(old_group);
        } else if restart {
            self.start_chunk(self.index, true, IndexChange::Navigation);
        }
        self.persist();
    }

    pub fn set_playback_rate(&mut self, rate: f32) {
        let mut settings = self.settings.clone();
        settings.playback_rate = clamp_rate(rate);
        self.apply_settings(settings);
    }

    /// Change the rate by `delta`, rounded to hundredths.
    pub fn adjust_playback_rate(&mut self, delta: f32) {
        let rate = ((self.settings.playback_rate + delta) * 100.0).round() / 100.0;
        self.set_playback_rate(rate);
    }

    pub fn set_volume(&mut self, volume: u8) {
        let mut settings = self.settings.clone();
        settings.volume = volume;
        self.apply_settings(settings);
    }

    pub fn set_voice(&mut self, voice_id: impl Into<String>) {
        let mut settings = self.settings.clone();
        settings.voice_id = voice_id.into();
        self.apply_settings(settings);
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        let mut settings = self.settings.clone();
        settings.view_mode = view_mode;
        self.apply_settings(settings);
    }

    /// Grow or shrink the group size by `delta`, clamped to 1 – 200.
    pub fn change_group_size(&mut self, delta: isize) {
        let size = self
            .settings
            .group_size
            .saturating_add_signed(delta)
            .clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE);
        self.set_group_size(size);
    }

    pub fn set_group_size(&mut self, group_size: usize) {
        let mut settings = self.settings.clone();
        settings.group_size = group_size;
        self.apply_settings(settings);
    }

    // -----------------------------------------------------------------------
    // Backend events and ticks
    // -----------------------------------------------------------------------

    /// React to an event from the speech backend.
    pub fn on_backend_event(&mut self, event: BackendEvent) {
        if self.in_flight != Some(event.ticket) {
            log::debug!(
                "playback: dropping stale {:?} for {:?}",
                event.kind,
                event.ticket
            );
            return;
        }

        match event.kind {
            BackendEventKind::Progress(_) if self.state == PlaybackState::Paused => {}
            BackendEventKind::Progress(value) => {
                let value = self.progress.report(value);
                self.emit(ReaderEvent::Progress(value));
            }
            BackendEventKind::Finished => {
                self.in_flight = None;
                let value = self.progress.complete();
                self.emit(ReaderEvent::Progress(value));
                if self.state == PlaybackState::Paused {
                    self.finished_while_paused = true;
                } else {
                    self.advance();
                }
            }
            BackendEventKind::Failed(e) if e.is_cancellation() => {
                log::debug!("playback: request {:?} cancelled ({e})", event.ticket);
                self.in_flight = None;
                self.progress.halt();
                self.set_state(PlaybackState::Idle);
            }
            BackendEventKind::Failed(e) => self.fail(e),
        }
    }

    /// Advance the simulated progress by one tick.
    pub fn tick(&mut self) {
        if let Some(value) = self.progress.tick() {
            self.emit(ReaderEvent::Progress(value));
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Issue a speak request for chunk `index`.
    ///
    /// `explicit` opens a new session and cancels queued speech; otherwise
    /// the request continues the current session.
    fn start_chunk(&mut self, index: usize, explicit: bool, cause: IndexChange) {
        if self.document.is_empty() {
            return;
        }
        let index = self.document.clamp_index(index);
        let Some(chunk) = self.document.get(index) else {
            return;
        };
        let text = chunk.text.clone();
        let char_len = chunk.char_len();

        if explicit {
            self.session = self.session.wrapping_add(1);
            self.finished_while_paused = false;
        }
        self.request = self.request.wrapping_add(1);
        let ticket = SpeechTicket {
            session: self.session,
            request: self.request,
        };

        self.index = index;
        self.in_flight = Some(ticket);
        self.progress.start(char_len, self.settings.playback_rate);
        self.set_state(PlaybackState::Playing);
        self.emit(ReaderEvent::IndexChanged { index, cause });
        self.emit(ReaderEvent::Progress(0.0));
        self.persist();

        log::debug!("playback: speaking chunk {index} ({cause:?}, {ticket:?})");
        let request = SpeakRequest {
            ticket,
            text,
            voice_id: self.settings.voice_id.clone(),
            rate: self.settings.playback_rate,
            volume: self.settings.volume,
            cancel_previous: explicit,
        };
        if let Err(e) = self.backend.speak(request) {
            self.fail(e);
        }
    }

    /// Move to the next chunk after a completion, or finish the document.
    fn advance(&mut self) {
        if self.index + 1 < self.document.len() {
            self.start_chunk(self.index + 1, false, IndexChange::AutoAdvance);
        } else {
            log::info!("playback: reached end of document");
            self.set_state(PlaybackState::Idle);
        }
    }

    fn fail(&mut self, error: SpeechError) {
        if error.is_cancellation() {
            self.in_flight = None;
            self.progress.halt();
            self.set_state(PlaybackState::Idle);
            return;
        }
        log::error!("playback: chunk {} failed: {error}", self.index);
        self.in_flight = None;
        self.finished_while_paused = false;
        self.progress.halt();
        self.set_state(PlaybackState::Idle);
        self.emit(ReaderEvent::Error(ReaderError::Speech(error)));
    }

    /// Re-segment after a group-size change, remapping the index.
    ///
    /// The new index is `index × old / new`, which lands near the same text
    /// but not exactly on it since sentence lengths vary.
    fn regroup(&mut self, old_group: usize) {
        let new_group = self.settings.group_size;
        let was_playing = self.state == PlaybackState::Playing;
        let remapped = self.index * old_group / new_group;

        self.stop();
        self.document = Arc::new(Document::new(&self.text, new_group));
        self.index = self.document.clamp_index(remapped);
        log::info!(
            "playback: regrouped {old_group} → {new_group}, {} chunks, at chunk {}",
            self.document.len(),
            self.index
        );
        self.emit(ReaderEvent::DocumentChanged(Arc::clone(&self.document)));

        if was_playing {
            self.start_chunk(self.index, true, IndexChange::Regroup);
        } else {
            self.emit(ReaderEvent::IndexChanged {
                index: self.index,
                cause: IndexChange::Regroup,
            });
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        log::debug!("playback: {} → {}", self.state.label(), state.label());
        self.state = state;
        self.emit(ReaderEvent::StateChanged(state));
    }

    /// Hand `(index, settings)` to the sink if it differs from the last save.
    fn persist(&mut self) {
        let snapshot = (self.index, self.settings.clone());
        if self.last_saved.as_ref() == Some(&snapshot) {
            return;
        }
        self.sink.save(snapshot.0, &snapshot.1);
        self.last_saved = Some(snapshot);
    }

    fn emit(&self, event: ReaderEvent) {
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
