use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A trimmed, contiguous slice of the input text sized for one provider request.
///
/// `start_char`/`end_char` are half-open character offsets (not byte offsets)
/// into the text the chunker was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
    pub start_char: usize,
    pub end_char: usize,
}

/// Sentence terminator followed by whitespace, or a run of line breaks
fn sentence_boundary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.!?]\s+|(?:\r?\n)+").unwrap())
}

/// Split text into ordered chunks of at most `max_length` characters.
///
/// Split points prefer, in order: the last sentence boundary inside the
/// window, the last space, and finally a hard cut at the window end.
/// Whitespace-only segments are dropped without consuming an index.
///
/// Text that already fits (including empty text) comes back as a single
/// untrimmed chunk; callers reject empty input before getting here.
pub fn chunk_text(text: &str, max_length: usize) -> Vec<TextChunk> {
    let max_length = max_length.max(1);
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if total <= max_length {
        return vec![TextChunk {
            index: 0,
            text: text.to_string(),
            start_char: 0,
            end_char: total,
        }];
    }

    let mut chunks = Vec::new();
    let mut position = 0;

    while position < total {
        let candidate_end = (position + max_length).min(total);
        let split = if candidate_end < total {
            find_split_point(&chars, position, candidate_end)
        } else {
            candidate_end
        };

        if let Some(chunk) = trimmed_chunk(&chars, position, split, chunks.len()) {
            chunks.push(chunk);
        }

        position = split;
    }

    tracing::debug!(
        text_length = total,
        max_length = max_length,
        chunk_count = chunks.len(),
        "Text split into chunks"
    );

    chunks
}

fn find_split_point(chars: &[char], start: usize, end: usize) -> usize {
    let window: String = chars[start..end].iter().collect();

    if let Some(boundary) = sentence_boundary().find_iter(&window).last() {
        let offset = window[..boundary.end()].chars().count();
        if offset > 0 {
            return start + offset;
        }
    }

    // `end` is always < chars.len() here, so a space sitting exactly on the
    // window edge is still a candidate
    if let Some(space) = chars[start + 1..=end].iter().rposition(|c| *c == ' ') {
        return start + 1 + space + 1;
    }

    end
}

fn trimmed_chunk(chars: &[char], start: usize, end: usize, index: usize) -> Option<TextChunk> {
    let segment = &chars[start..end];
    let leading = segment.iter().take_while(|c| c.is_whitespace()).count();
    if leading == segment.len() {
        return None;
    }
    let trailing = segment.iter().rev().take_while(|c| c.is_whitespace()).count();

    let start_char = start + leading;
    let end_char = end - trailing;

    Some(TextChunk {
        index,
        text: chars[start_char..end_char].iter().collect(),
        start_char,
        end_char,
    })
}
