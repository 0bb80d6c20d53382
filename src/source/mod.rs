//! Where document text comes from.
//!
//! [`DocumentSource`] resolves the full text of a document, possibly lazily
//! (a file is only read when the reader opens it). The controller segments
//! whatever text the source returns; it never looks at where it came from
//! beyond [`DocumentSource::key`], which names the document in the progress
//! store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// SourceError
// ---------------------------------------------------------------------------

/// Errors raised while resolving document text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },
}

// ---------------------------------------------------------------------------
// DocumentSource trait
// ---------------------------------------------------------------------------

/// Async provider of a document's text.
#[async_trait]
pub trait DocumentSource: Send + Sync + std::fmt::Debug {
    /// Stable identifier used as the progress-store key.
    fn key(&self) -> String;

    /// Resolve the complete text.
    async fn load_text(&self) -> Result<String, SourceError>;
}

// ---------------------------------------------------------------------------
// FileSource
// ---------------------------------------------------------------------------

/// A text file on disk, read when first requested.
///
/// Invalid UTF-8 is replaced rather than rejected so a stray byte does not
/// make a whole book unreadable.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    fn key(&self) -> String {
        std::fs::canonicalize(&self.path)
            .unwrap_or_else(|_| self.path.clone())
            .display()
            .to_string()
    }

    async fn load_text(&self) -> Result<String, SourceError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound(self.path.display().to_string())
            } else {
                SourceError::Read {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(e) => {
                log::warn!(
                    "source: {} is not valid UTF-8; replacing invalid bytes",
                    self.path.display()
                );
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// StaticSource
// ---------------------------------------------------------------------------

/// Text already held in memory (pasted text, tests).
#[derive(Debug, Clone)]
pub struct StaticSource {
    key: String,
    text: String,
}

impl StaticSource {
    pub fn new(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn key(&self) -> String {
        self.key.clone()
    }

    async fn load_text(&self) -> Result<String, SourceError> {
        Ok(self.text.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn file_source_reads_text() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("book.txt");
        std::fs::write(&path, "Call me Ishmael. Some years ago.").expect("write");

        let source = FileSource::new(&path);
        let text = source.load_text().await.expect("load");
        assert_eq!(text, "Call me Ishmael. Some years ago.");
        assert!(source.key().ends_with("book.txt"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempdir().expect("temp dir");
        let source = FileSource::new(dir.path().join("absent.txt"));
        let err = source.load_text().await.unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("latin1.txt");
        std::fs::write(&path, b"caf\xe9 ok.").expect("write");

        let text = FileSource::new(&path).load_text().await.expect("load");
        assert!(text.starts_with("caf"));
        assert!(text.ends_with(" ok."));
    }

    #[tokio::test]
    async fn static_source_returns_its_text() {
        let source = StaticSource::new("pasted", "Hello there.");
        assert_eq!(source.key(), "pasted");
        assert_eq!(source.load_text().await.unwrap(), "Hello there.");
    }

    #[test]
    fn source_is_object_safe() {
        let _: Box<dyn DocumentSource> = Box::new(StaticSource::new("k", "t"));
    }
}
