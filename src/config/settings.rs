//! Reader settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the
//! progress store unchanged.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Slowest supported speaking rate.
pub const MIN_PLAYBACK_RATE: f32 = 0.5;
/// Fastest supported speaking rate.
pub const MAX_PLAYBACK_RATE: f32 = 3.0;
/// Volume is a percentage.
pub const MAX_VOLUME: u8 = 100;
/// Smallest number of sentences per chunk.
pub const MIN_GROUP_SIZE: usize = 1;
/// Largest number of sentences per chunk.
pub const MAX_GROUP_SIZE: usize = 200;

// ---------------------------------------------------------------------------
// ViewMode
// ---------------------------------------------------------------------------

/// How the chunk list is browsed.
///
/// | Variant      | Rendering                                     |
/// |--------------|-----------------------------------------------|
/// | Continuous   | Sliding window around the current chunk       |
/// | Paginated    | Fixed pages of 50 chunks, flipped manually    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Continuous,
    Paginated,
}

impl Default for ViewMode {
    fn default() -> Self {
        Self::Continuous
    }
}

// ---------------------------------------------------------------------------
// ReaderSettings
// ---------------------------------------------------------------------------

/// Settings that define reproducible playback behaviour.
///
/// Saved together with the chunk index on every durable transition, so a
/// document reopens with the same voice, speed and grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Speaking rate multiplier (0.5 – 3.0).
    pub playback_rate: f32,
    /// Output volume in percent (0 – 100).
    pub volume: u8,
    /// Backend-specific voice identifier.
    pub voice_id: String,
    /// Sentences per chunk (1 – 200).
    pub group_size: usize,
    /// Browsing mode of the chunk list.
    pub view_mode: ViewMode,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            volume: MAX_VOLUME,
            voice_id: "default".into(),
            group_size: MIN_GROUP_SIZE,
            view_mode: ViewMode::default(),
        }
    }
}

impl ReaderSettings {
    /// Return a copy with every numeric field forced into its valid range.
    ///
    /// ```
    /// use read_aloud::config::ReaderSettings;
    ///
    /// let s = ReaderSettings { playback_rate: 9.0, group_size: 0, ..Default::default() };
    /// let s = s.clamped();
    /// assert_eq!(s.playback_rate, 3.0);
    /// assert_eq!(s.group_size, 1);
    /// ```
    pub fn clamped(mut self) -> Self {
        self.playback_rate = clamp_rate(self.playback_rate);
        self.volume = self.volume.min(MAX_VOLUME);
        self.group_size = self.group_size.clamp(MIN_GROUP_SIZE, MAX_GROUP_SIZE);
        self
    }

    /// Returns `true` when `other` differs in a field the speech backend
    /// uses (rate, volume or voice).
    pub fn speech_differs(&self, other: &ReaderSettings) -> bool {
        self.playback_rate != other.playback_rate
            || self.volume != other.volume
            || self.voice_id != other.voice_id
    }
}

/// Clamp a rate into `[MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE]`; NaN maps to 1.0.
pub fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        return 1.0;
    }
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for the built-in paced speech backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Longest text handed to the synthesiser in one utterance; longer chunk
    /// texts are split at word boundaries and chained.
    pub max_chars_per_utterance: usize,
    /// Milliseconds of speech per character at 1.0× rate.
    pub ms_per_char: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            max_chars_per_utterance: 200,
            ms_per_char: 70,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use read_aloud::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default reader settings for documents without saved progress.
    pub reader: ReaderSettings,
    /// Paced speech backend settings.
    pub speech: SpeechConfig,
    /// Override for the progress store location.
    pub progress_file: Option<PathBuf>,
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reader: ReaderSettings::default(),
            speech: SpeechConfig::default(),
            progress_file: None,
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario).
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config.normalized())
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolved path of the reading-progress store.
    pub fn progress_path(&self) -> PathBuf {
        self.progress_file
            .clone()
            .unwrap_or_else(|| AppPaths::new().progress_file)
    }

    fn normalized(mut self) -> Self {
        self.reader = self.reader.clamped();
        self.speech.max_chars_per_utterance = self.speech.max_chars_per_utterance.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
