//! Speech backend trait, request/event types and errors.
//!
//! # Overview
//!
//! [`SpeechBackend`] is the only interface the playback controller uses to
//! produce audio. It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn SpeechBackend>`.
//!
//! `speak` is non-blocking. Completion, progress and failures are reported
//! later as [`BackendEvent`]s on the channel the backend was built with. Every
//! event carries the [`SpeechTicket`] of the request it belongs to; the
//! controller drops events whose ticket is no longer current, which is what
//! keeps a late callback from a cancelled request from touching the state.
//!
//! [`RecordingBackend`] (available under `#[cfg(test)]`) records every call
//! and lets tests feed events by hand.

use thiserror::Error;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Errors reported by a speech backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// The request was cancelled by a newer request or an explicit stop.
    #[error("speech request cancelled")]
    Cancelled,

    /// Playback was interrupted by the platform (audio focus lost, etc).
    #[error("speech interrupted")]
    Interrupted,

    /// The requested voice does not exist on this backend.
    #[error("voice not available: {0}")]
    VoiceUnavailable(String),

    /// The synthesiser failed to render the text.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The backend is not running or cannot accept requests.
    #[error("speech backend unavailable: {0}")]
    Unavailable(String),
}

impl SpeechError {
    /// Returns `true` for errors caused by cancellation rather than failure.
    ///
    /// ```
    /// use read_aloud::speech::SpeechError;
    ///
    /// assert!(SpeechError::Cancelled.is_cancellation());
    /// assert!(SpeechError::Interrupted.is_cancellation());
    /// assert!(!SpeechError::Synthesis("boom".into()).is_cancellation());
    /// ```
    pub fn is_cancellation(&self) -> bool {
        matches!(self, SpeechError::Cancelled | SpeechError::Interrupted)
    }
}

// ---------------------------------------------------------------------------
// Requests and events
// ---------------------------------------------------------------------------

/// Identifies one speak request.
///
/// `session` changes on every explicit play or stop; auto-advance keeps the
/// session and only bumps `request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpeechTicket {
    pub session: u64,
    pub request: u64,
}

/// Everything a backend needs to speak one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    pub ticket: SpeechTicket,
    pub text: String,
    pub voice_id: String,
    /// Rate multiplier, already clamped to 0.5 – 3.0.
    pub rate: f32,
    /// Volume in percent.
    pub volume: u8,
    /// `true` when whatever is queued or speaking must be dropped first.
    /// Auto-advance continuations pass `false` so one backend session can
    /// carry across chunks.
    pub cancel_previous: bool,
}

/// What happened to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEventKind {
    /// Real playback progress in percent (0 – 100).
    Progress(f32),
    /// The whole request finished speaking. Sent once per request, even when
    /// the backend split the text internally.
    Finished,
    /// The request failed or was cancelled.
    Failed(SpeechError),
}

/// An event reported by the backend for one ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    pub ticket: SpeechTicket,
    pub kind: BackendEventKind,
}

/// Channel half a backend reports its events on.
pub type BackendEventSender = mpsc::UnboundedSender<BackendEvent>;

/// Channel half the controller receives backend events from.
pub type BackendEventReceiver = mpsc::UnboundedReceiver<BackendEvent>;

/// Create a backend event channel.
pub fn backend_channel() -> (BackendEventSender, BackendEventReceiver) {
    mpsc::unbounded_channel()
}

// ---------------------------------------------------------------------------
// SpeechBackend trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for text-to-speech backends.
///
/// # Contract
///
/// - `speak` never blocks; an `Err` means the request was rejected outright
///   and no event will follow for it.
/// - Text longer than the backend's own limit is split internally and
///   chained; [`BackendEventKind::Finished`] is still sent once.
/// - `stop`, `pause` and `resume` act on whatever is queued or speaking and
///   are safe to call when nothing is.
pub trait SpeechBackend: Send + Sync {
    /// Queue `request` for speaking.
    fn speak(&self, request: SpeakRequest) -> Result<(), SpeechError>;

    /// Drop everything queued or speaking.
    fn stop(&self);

    /// Pause the current utterance.
    fn pause(&self);

    /// Resume a paused utterance.
    fn resume(&self);
}

// Compile-time assertion: Box<dyn SpeechBackend> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechBackend>) {}
};

// ---------------------------------------------------------------------------
// RecordingBackend  (test-only)
// ---------------------------------------------------------------------------

/// Calls observed by [`RecordingBackend`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Speak(SpeakRequest),
    Stop,
    Pause,
    Resume,
}

/// A test double that records every call and never speaks.
///
/// Tests drive completion by handing the controller a [`BackendEvent`] built
/// from [`RecordingBackend::last_ticket`].
#[cfg(test)]
#[derive(Default)]
pub struct RecordingBackend {
    calls: std::sync::Mutex<Vec<BackendCall>>,
    reject_with: std::sync::Mutex<Option<SpeechError>>,
}

#[cfg(test)]
impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `speak` fail synchronously with `error`.
    pub fn reject_with(&self, error: SpeechError) {
        *self.reject_with.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<SpeakRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::Speak(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn last_request(&self) -> SpeakRequest {
        self.requests().pop().expect("no speak request recorded")
    }

    pub fn last_ticket(&self) -> SpeechTicket {
        self.last_request().ticket
    }

    pub fn count(&self, call: &BackendCall) -> usize {
        self.calls()
            .iter()
            .filter(|c| std::mem::discriminant(*c) == std::mem::discriminant(call))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[cfg(test)]
impl SpeechBackend for RecordingBackend {
    fn speak(&self, request: SpeakRequest) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(BackendCall::Speak(request));
        match self.reject_with.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push(BackendCall::Stop);
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push(BackendCall::Pause);
    }

    fn resume(&self) {
        self.calls.lock().unwrap().push(BackendCall::Resume);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
