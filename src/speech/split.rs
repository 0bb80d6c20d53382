//! Splits chunk text into utterances a synthesiser can take in one go.
//!
//! Many engines truncate or refuse long inputs. Backends call
//! [`split_for_synthesis`] and chain the pieces, reporting completion once for
//! the whole request.

/// Split `text` into pieces of at most `max_chars` characters.
///
/// Pieces break at whitespace; a single word longer than `max_chars` is cut
/// at character boundaries. Whitespace runs collapse to one space. Returns an
/// empty vector for whitespace-only input.
///
/// ```
/// use read_aloud::speech::split_for_synthesis;
///
/// let parts = split_for_synthesis("one two three four", 9);
/// assert_eq!(parts, ["one two", "three", "four"]);
/// ```
pub fn split_for_synthesis(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                parts.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            parts.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}
