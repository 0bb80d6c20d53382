//! Speech backend boundary.
//!
//! # Architecture
//!
//! ```text
//! PlaybackController
//!        │ speak(SpeakRequest { ticket, text, voice, rate, volume, cancel_previous })
//!        ▼
//! ┌──────────────────────────┐     BackendEvent { ticket, Progress | Finished | Failed }
//! │  dyn SpeechBackend       │ ──────────────────────────────────────────────▶ controller
//! │  - split_for_synthesis   │        (mpsc::UnboundedSender<BackendEvent>)
//! │  - stop / pause / resume │
//! └──────────────────────────┘
//! ```
//!
//! The concrete audio engine lives outside this crate. [`PacedBackend`]
//! stands in for one: it paces text in real time and emits the same events.

pub mod backend;
pub mod paced;
pub mod split;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use backend::{
    backend_channel, BackendEvent, BackendEventKind, BackendEventReceiver, BackendEventSender,
    SpeakRequest, SpeechBackend, SpeechError, SpeechTicket,
};
pub use paced::{PacedBackend, Utterance};
pub use split::split_for_synthesis;

#[cfg(test)]
pub use backend::{BackendCall, RecordingBackend};
