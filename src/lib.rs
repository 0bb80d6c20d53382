//! Read-aloud reader core.
//!
//! Steps through a long text document while it is spoken, one chunk at a
//! time, with pause, resume, seeking and live voice/speed changes.
//!
//! # Architecture
//!
//! ```text
//!  DocumentSource ──text──▶ text::segment ──Document──▶ PlaybackController
//!                                                        │    ▲
//!                                      SpeakRequest ◀────┘    └── BackendEvent
//!                                            │                       │
//!                                            ▼                       │
//!                                      SpeechBackend ────────────────┘
//!
//!  PlaybackController ──ReaderEvent──▶ Viewport (continuous window / pages)
//!                     ──(index, settings)──▶ ProgressSink (JSON store)
//! ```
//!
//! | Module       | Responsibility                                         |
//! |--------------|--------------------------------------------------------|
//! | [`text`]     | Sentence splitting and grouping into chunks            |
//! | [`speech`]   | Backend trait, tickets, paced backend, text splitting  |
//! | [`playback`] | State machine, progress estimation, async run loop     |
//! | [`viewport`] | Visible chunk range for continuous and paginated views |
//! | [`persist`]  | Per-document progress store                            |
//! | [`source`]   | Lazy document text providers                           |
//! | [`config`]   | `settings.toml` and platform paths                     |

pub mod config;
pub mod persist;
pub mod playback;
pub mod source;
pub mod speech;
pub mod text;
pub mod viewport;
