//! Configuration module for the read-aloud reader.
//!
//! Provides [`ReaderSettings`] (the durable playback settings saved with
//! reading progress), [`AppConfig`] (top-level settings file), `AppPaths` for
//! cross-platform data directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    clamp_rate, AppConfig, ReaderSettings, SpeechConfig, ViewMode, MAX_GROUP_SIZE, MAX_PLAYBACK_RATE,
    MAX_VOLUME, MIN_GROUP_SIZE, MIN_PLAYBACK_RATE,
};
