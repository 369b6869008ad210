//! Sliding-window text chunker.
//!
//! Splits extracted segments into bounded-size, slightly overlapping chunks
//! suitable for embedding and retrieval. Chunking is deterministic: the same
//! segments under the same configuration always yield byte-identical chunks
//! with the same sequence indices, so re-indexing a document reproduces its
//! chunk numbering. Segments are consumed strictly in order and windows
//! never cross a segment boundary (a PDF chunk never spans two pages).

/// Approximate chars-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

/// A chunk of extracted text plus its position within the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkText {
    pub index: usize,
    pub text: String,
}

/// Split segments into overlapping windows of at most `max_tokens` tokens,
/// each window sharing `overlap_tokens` with its predecessor. Sequence
/// indices are contiguous from 0 across all segments. Empty segments produce
/// no chunks.
pub fn split_segments(
    segments: &[String],
    max_tokens: usize,
    overlap_tokens: usize,
) -> Vec<ChunkText> {
    let max_chars = max_tokens.max(1) * CHARS_PER_TOKEN;
    let overlap_chars = overlap_tokens.min(max_tokens.saturating_sub(1)) * CHARS_PER_TOKEN;

    let mut chunks = Vec::new();
    let mut next_index = 0usize;

    for segment in segments {
        let text = segment.trim();
        if text.is_empty() {
            continue;
        }

        let mut start = 0usize;
        loop {
            let mut end = floor_char_boundary(text, (start + max_chars).min(text.len()));

            // Prefer to end the window on whitespace so words stay intact
            if end < text.len() {
                if let Some(pos) = text[start..end].rfind(char::is_whitespace) {
                    if pos > 0 {
                        let ws_len = text[start + pos..]
                            .chars()
                            .next()
                            .map(char::len_utf8)
                            .unwrap_or(1);
                        end = start + pos + ws_len;
                    }
                }
            }

            let piece = text[start..end].trim();
            if !piece.is_empty() {
                chunks.push(ChunkText {
                    index: next_index,
                    text: piece.to_string(),
                });
                next_index += 1;
            }

            if end >= text.len() {
                break;
            }

            // Step forward, backing up by the overlap; always make progress
            let mut next_start = floor_char_boundary(text, end.saturating_sub(overlap_chars));
            if next_start <= start {
                next_start = end;
            }
            start = next_start;
        }
    }

    chunks
}

/// Largest char boundary at or below `idx` (stable stand-in for
/// `str::floor_char_boundary`).
fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
