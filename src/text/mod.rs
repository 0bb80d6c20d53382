//! Text segmentation: raw document text → ordered, speakable chunks.
//!
//! # Quick start
//!
//! ```rust
//! use read_aloud::text::Document;
//!
//! let doc = Document::new("One. Two! Three?", 2);
//! assert_eq!(doc.len(), 2);
//! assert_eq!(doc.get(0).unwrap().text, "One. Two!");
//! ```

pub mod segmenter;

pub use segmenter::{group_sentences, segment, split_sentences, Chunk, MIN_SENTENCE_CHARS};

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The chunk sequence produced from one text under one group size.
///
/// Immutable once built. Consumers share it behind an `Arc` and never patch
/// it; a new text or group size produces a new `Document`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    chunks: Vec<Chunk>,
    group_size: usize,
}

impl Document {
    /// Segment `text` with `group_size` sentences per chunk.
    pub fn new(text: &str, group_size: usize) -> Self {
        let group_size = group_size.max(1);
        Self {
            chunks: segment(text, group_size),
            group_size,
        }
    }

    /// A document with no chunks.
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            group_size: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Sentences per chunk this document was built with.
    pub fn group_size(&self) -> usize {
        self.group_size
    }

    /// Clamp `index` into `[0, len-1]`, or 0 for an empty document.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.len().saturating_sub(1))
    }
}
