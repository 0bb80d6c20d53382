//! Playback: the state machine that reads a document aloud.
//!
//! # Architecture
//!
//! ```text
//! ReaderCommand ──▶ PlaybackController::run ──speak/stop/pause──▶ SpeechBackend
//!                        ▲          │                                  │
//!                        │          ├──▶ ReaderEvent ──▶ Viewport / UI  │
//!                        │          └──▶ ProgressSink (index, settings) │
//!                        └──────────── BackendEvent ◀──────────────────┘
//! ```
//!
//! [`PlaybackController`] holds all state and is driven either directly
//! (synchronous methods, used by the tests) or through
//! [`PlaybackController::run`] inside a tokio task.

pub mod controller;
pub mod progress;
pub mod runner;
pub mod state;

pub use controller::{PlaybackController, ReaderError};
pub use progress::ProgressEstimator;
pub use runner::ReaderCommand;
pub use state::{IndexChange, PlaybackState, PlaybackStatus, ReaderEvent};
