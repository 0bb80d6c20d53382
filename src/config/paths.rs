//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\read-aloud\
//!   macOS:   ~/Library/Application Support/read-aloud/
//!   Linux:   ~/.config/read-aloud/
//!
//! Data dir (reading progress):
//!   Windows: %LOCALAPPDATA%\read-aloud\
//!   macOS:   ~/Library/Application Support/read-aloud/
//!   Linux:   ~/.local/share/read-aloud/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for per-document state.
    pub data_dir: PathBuf,
    /// Full path to `progress.json`.
    pub progress_file: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "read-aloud";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let progress_file = data_dir.join("progress.json");

        Self {
            config_dir,
            settings_file,
            data_dir,
            progress_file,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
