//! Sentence splitting and chunk grouping.
//!
//! [`segment`] is a total, deterministic function: the same text and group
//! size always produce the same chunks, and no input makes it fail.
//!
//! # Sentence rules
//!
//! * `!`, `?` and `\n` end a sentence.
//! * A `.` ends a sentence only when neither neighbour is another `.`; runs
//!   of two or more dots (ellipses) are ordinary content.
//! * A candidate sentence shorter than [`MIN_SENTENCE_CHARS`] after trimming
//!   is not flushed; the scanner keeps accumulating, so abbreviations such as
//!   `"A."` stay attached to the text that follows.

use serde::{Deserialize, Serialize};

/// Shortest trimmed sentence, in characters, that may stand on its own.
pub const MIN_SENTENCE_CHARS: usize = 3;

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// One speakable unit: one or more sentences sent to the backend in a single
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Zero-based position in the document.
    pub id: usize,
    /// Non-empty, trimmed text.
    pub text: String,
}

impl Chunk {
    /// Length in Unicode scalar values; the progress estimator is calibrated
    /// per character, not per byte.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Split `text` into sentences and group them `group_size` at a time.
///
/// A `group_size` of 0 is treated as 1.
///
/// ```
/// use read_aloud::text::segment;
///
/// let chunks = segment("Hi. OK. Go now! Next.\n", 2);
/// let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
/// assert_eq!(texts, ["Hi. OK.", "Go now! Next."]);
/// ```
pub fn segment(text: &str, group_size: usize) -> Vec<Chunk> {
    group_sentences(split_sentences(text), group_size)
}

/// Split `text` into trimmed sentences according to the module rules.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for (i, &c) in chars.iter().enumerate() {
        buffer.push(c);

        if !is_sentence_end(&chars, i) {
            continue;
        }

        let trimmed = buffer.trim();
        if trimmed.chars().count() >= MIN_SENTENCE_CHARS {
            sentences.push(trimmed.to_string());
            buffer.clear();
        }
    }

    let rest = buffer.trim();
    if !rest.is_empty() {
        match sentences.last_mut() {
            Some(last) if rest.chars().count() < MIN_SENTENCE_CHARS => {
                last.push(' ');
                last.push_str(rest);
            }
            _ => sentences.push(rest.to_string()),
        }
    }

    if sentences.is_empty() {
        let whole = text.trim();
        if !whole.is_empty() {
            sentences.push(whole.to_string());
        }
    }

    sentences
}

/// Group consecutive sentences into chunks with contiguous ids.
pub fn group_sentences(sentences: Vec<String>, group_size: usize) -> Vec<Chunk> {
    sentences
        .chunks(group_size.max(1))
        .enumerate()
        .map(|(id, group)| Chunk {
            id,
            text: group.join(" "),
        })
        .collect()
}

fn is_sentence_end(chars: &[char], i: usize) -> bool {
    match chars[i] {
        '!' | '?' | '\n' => true,
        '.' => {
            let prev_dot = i > 0 && chars[i - 1] == '.';
            let next_dot = chars.get(i + 1) == Some(&'.');
            !prev_dot && !next_dot
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
