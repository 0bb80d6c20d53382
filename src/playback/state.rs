//! Playback state machine types and the events the controller emits.
//!
//! [`PlaybackState`] is the four-state machine the controller walks through.
//! [`ReaderEvent`]s go out on an unbounded channel to whoever renders the
//! reader (viewport, status line, the terminal binary).

use std::sync::Arc;

use crate::config::ReaderSettings;
use crate::text::Document;

use super::controller::ReaderError;

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// States of the playback controller.
///
/// ```text
/// Idle ──play──▶ Playing ──pause──▶ Paused ──resume──▶ Playing
///   ▲              │  ▲                │
///   │              │  └─auto-advance   │
///   └──stop/end/error──────────────────┘
/// Idle ──open──▶ Loading ──text ready──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing is being spoken.
    Idle,
    /// A document source is being resolved.
    Loading,
    /// A chunk is being spoken.
    Playing,
    /// The current chunk is paused mid-utterance.
    Paused,
}

impl PlaybackState {
    /// Returns `true` while a backend request is alive (playing or paused).
    ///
    /// ```
    /// use read_aloud::playback::PlaybackState;
    ///
    /// assert!(PlaybackState::Playing.is_active());
    /// assert!(PlaybackState::Paused.is_active());
    /// assert!(!PlaybackState::Idle.is_active());
    /// assert!(!PlaybackState::Loading.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, PlaybackState::Playing | PlaybackState::Paused)
    }

    /// A short human-readable label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Loading => "Loading",
            PlaybackState::Playing => "Playing",
            PlaybackState::Paused => "Paused",
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState::Idle
    }
}

// ---------------------------------------------------------------------------
// IndexChange
// ---------------------------------------------------------------------------

/// Why the current chunk index changed.
///
/// The paginated view follows every cause except `AutoAdvance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexChange {
    /// Explicit play, navigate or jump.
    Navigation,
    /// The previous chunk finished and playback moved on by itself.
    AutoAdvance,
    /// The group size changed and the index was remapped.
    Regroup,
    /// A document was (re)loaded.
    Load,
}

// ---------------------------------------------------------------------------
// PlaybackStatus
// ---------------------------------------------------------------------------

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub index: usize,
    pub chunk_count: usize,
    /// Progress of the current chunk, 0 – 100.
    pub progress: f32,
    pub settings: ReaderSettings,
}

// ---------------------------------------------------------------------------
// ReaderEvent
// ---------------------------------------------------------------------------

/// Events emitted by the controller.
#[derive(Debug, Clone)]
pub enum ReaderEvent {
    StateChanged(PlaybackState),
    IndexChanged { index: usize, cause: IndexChange },
    /// Progress of the current chunk, 0 – 100.
    Progress(f32),
    /// A new chunk sequence replaced the previous one.
    DocumentChanged(Arc<Document>),
    SettingsChanged(ReaderSettings),
    /// A failure the user should see. Cancellations never appear here.
    Error(ReaderError),
}
