//! Batch segmentation for bulk translation requests.
//!
//! The dictionary endpoint takes the whole word list in a query parameter,
//! so long lists have to be split. Each segment must stay below two limits:
//! an item count and the length of the serialized list. Segments are filled
//! greedily and concatenate back to the input exactly.
//!
//! Length is measured on the JSON array form `["a", "b"]`: `", "` between
//! items and ASCII-only escaping, so a non-ASCII character counts as one
//! `\uXXXX` escape per UTF-16 unit.

/// A segment must hold fewer items than this.
pub const MAX_SEGMENT_ITEMS: usize = 2000;

/// A segment's serialized length must stay below this.
pub const MAX_SEGMENT_CHARS: usize = 12800;

/// Length of `", "`.
const SEPARATOR_LEN: usize = 2;

/// Length of `[` plus `]`.
const BRACKETS_LEN: usize = 2;

/// Greedy splitter with configurable limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSegmenter {
    max_items: usize,
    max_chars: usize,
}

impl Default for BatchSegmenter {
    fn default() -> Self {
        Self {
            max_items: MAX_SEGMENT_ITEMS,
            max_chars: MAX_SEGMENT_CHARS,
        }
    }
}

impl BatchSegmenter {
    /// A segmenter with custom (exclusive) limits.
    pub fn with_limits(max_items: usize, max_chars: usize) -> Self {
        Self {
            max_items,
            max_chars,
        }
    }

    /// Split `words` into segments, preserving order.
    ///
    /// An empty input yields one empty segment. A word that alone breaks a
    /// limit is placed in a segment of its own; no other segment is ever
    /// empty.
    pub fn segment<S: AsRef<str>>(&self, words: &[S]) -> Vec<Vec<String>> {
        let mut segments = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut current_len = BRACKETS_LEN;

        for word in words {
            let word = word.as_ref();
            let item_len = encoded_len(word);
            let next_len = if current.is_empty() {
                BRACKETS_LEN + item_len
            } else {
                current_len + SEPARATOR_LEN + item_len
            };

            if !current.is_empty()
                && (current.len() + 1 >= self.max_items || next_len >= self.max_chars)
            {
                segments.push(std::mem::take(&mut current));
                current_len = BRACKETS_LEN + item_len;
            } else {
                current_len = next_len;
            }
            current.push(word.to_string());
        }

        if !current.is_empty() || segments.is_empty() {
            segments.push(current);
        }

        tracing::debug!(
            words = words.len(),
            segments = segments.len(),
            "segmented translation batch"
        );
        segments
    }
}

/// Split with the default limits.
pub fn segment<S: AsRef<str>>(words: &[S]) -> Vec<Vec<String>> {
    BatchSegmenter::default().segment(words)
}

/// Serialized length of `words` as measured against the limits.
pub fn serialized_len<S: AsRef<str>>(words: &[S]) -> usize {
    let items: usize = words.iter().map(|w| encoded_len(w.as_ref())).sum();
    BRACKETS_LEN + items + SEPARATOR_LEN * words.len().saturating_sub(1)
}

/// Length of one quoted, escaped string.
fn encoded_len(word: &str) -> usize {
    2 + word
        .chars()
        .map(|c| match c {
            '"' | '\\' | '\n' | '\t' | '\r' | '\u{08}' | '\u{0c}' => 2,
            c if (c as u32) < 0x20 => 6,
            c if c.is_ascii() => 1,
            c => 6 * c.len_utf16(),
        })
        .sum::<usize>()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
