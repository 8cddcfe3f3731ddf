//! Boundary-aware text chunker with overlap.
//!
//! Splits extracted document text into [`Chunk`]s whose content stays within
//! a configurable character budget. Splitting prefers the largest natural
//! boundary available — paragraph (`\n\n`), line (`\n`), sentence (`. `),
//! then word (` `) — and consecutive chunks share an overlap region so that
//! context spanning a chunk boundary remains retrievable.
//!
//! Deterministic: identical input and parameters always produce the same
//! chunk sequence.

use crate::models::Chunk;

/// Split boundaries, largest first. A run of text containing none of these
/// is indivisible and is emitted whole even when it exceeds the budget.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Split `text` into chunks of at most `chunk_size` characters, where each
/// chunk after the first begins with the last `chunk_overlap` characters of
/// the text preceding it.
///
/// Empty input produces no chunks. Input at most `chunk_size` characters
/// long produces exactly one chunk equal to the input. Concatenating the
/// non-overlap remainder of every chunk reproduces the input exactly; no
/// content is ever dropped or truncated.
pub fn chunk_text(
    source_file: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }

    // Fresh-content budget for chunks that carry an overlap prefix. Pieces
    // are split to fit this budget so prefixed chunks stay within chunk_size.
    let fresh_budget = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut pieces = Vec::new();
    split_to_budget(text, fresh_budget, &SEPARATORS, &mut pieces);

    // Greedily merge contiguous pieces. The pieces are consecutive slices of
    // `text`, so a merged run is addressed by its byte span.
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut start = 0usize;
    let mut end = 0usize;
    let mut run_chars = 0usize;

    for piece in &pieces {
        let piece_chars = piece.chars().count();
        let budget = if chunks.is_empty() {
            chunk_size
        } else {
            fresh_budget
        };
        if run_chars > 0 && run_chars + piece_chars > budget {
            chunks.push(make_chunk(source_file, text, start, end, chunk_overlap));
            start = end;
            run_chars = 0;
        }
        end += piece.len();
        run_chars += piece_chars;
    }
    if run_chars > 0 {
        chunks.push(make_chunk(source_file, text, start, end, chunk_overlap));
    }

    chunks
}

/// Recursively split `text` into pieces of at most `budget` characters,
/// preferring the coarsest separator that produces conforming pieces.
/// Pieces keep their trailing separators, so concatenating them restores
/// `text` byte for byte.
fn split_to_budget<'a>(text: &'a str, budget: usize, seps: &[&str], out: &mut Vec<&'a str>) {
    if text.chars().count() <= budget {
        out.push(text);
        return;
    }
    match seps.split_first() {
        Some((sep, finer)) => {
            for part in text.split_inclusive(*sep) {
                if part.chars().count() <= budget {
                    out.push(part);
                } else {
                    split_to_budget(part, budget, finer, out);
                }
            }
        }
        // No separator left: a single indivisible token. Emit whole rather
        // than truncate.
        None => out.push(text),
    }
}

fn make_chunk(
    source_file: &str,
    text: &str,
    start: usize,
    end: usize,
    chunk_overlap: usize,
) -> Chunk {
    let prefix = if start == 0 {
        ""
    } else {
        overlap_prefix(text, start, chunk_overlap)
    };
    let mut content = String::with_capacity(prefix.len() + end - start);
    content.push_str(prefix);
    content.push_str(&text[start..end]);
    Chunk {
        content,
        source_file: source_file.to_string(),
    }
}

/// The last `overlap` characters of `text` before byte offset `start`.
fn overlap_prefix(text: &str, start: usize, overlap: usize) -> &str {
    if overlap == 0 {
        return "";
    }
    let mut begin = start;
    for (taken, (idx, _)) in text[..start].char_indices().rev().enumerate() {
        begin = idx;
        if taken + 1 == overlap {
            break;
        }
    }
    &text[begin..start]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip each chunk's overlap prefix and concatenate what remains.
    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&chunk.content);
            } else {
                let prefix_chars = overlap.min(out.chars().count());
                let skip: usize = chunk
                    .content
                    .chars()
                    .take(prefix_chars)
                    .map(|c| c.len_utf8())
                    .sum();
                out.push_str(&chunk.content[skip..]);
            }
        }
        out
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("a.txt", "", 500, 50).is_empty());
    }

    #[test]
    fn short_text_yields_single_chunk_equal_to_input() {
        let chunks = chunk_text("a.txt", "Hello world", 500, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Hello world");
        assert_eq!(chunks[0].source_file, "a.txt");
    }

    #[test]
    fn chunks_respect_size_budget() {
        let text = (0..60)
            .map(|i| format!("Sentence number {} fills out the paragraph.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text("a.txt", &text, 500, 50);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(
                chunk.content.chars().count() <= 500,
                "chunk exceeded budget: {} chars",
                chunk.content.chars().count()
            );
        }
    }

    #[test]
    fn overlap_removed_reconstructs_input() {
        let text = "First paragraph with some words.\n\nSecond paragraph here.\n\n"
            .repeat(20);
        let chunks = chunk_text("a.txt", &text, 120, 20);
        assert!(chunks.len() > 1);
        assert_eq!(reconstruct(&chunks, 20), text);
    }

    #[test]
    fn later_chunks_start_with_tail_of_preceding_text() {
        let text = "alpha beta gamma delta ".repeat(40);
        let chunks = chunk_text("a.txt", &text, 100, 25);
        assert!(chunks.len() > 1);
        let mut seen = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                let tail: String = {
                    let chars: Vec<char> = seen.chars().collect();
                    chars[chars.len().saturating_sub(25)..].iter().collect()
                };
                assert!(
                    chunk.content.starts_with(&tail),
                    "chunk {} missing overlap prefix",
                    i
                );
            }
            seen = reconstruct(&chunks[..=i], 25);
        }
    }

    #[test]
    fn oversized_indivisible_token_emitted_whole() {
        let token = "x".repeat(700);
        let text = format!("small words {} more words", token);
        let chunks = chunk_text("a.txt", &text, 500, 50);
        assert!(
            chunks.iter().any(|c| c.content.contains(&token)),
            "long token must not be truncated"
        );
        assert_eq!(reconstruct(&chunks, 50), text);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let para = "word ".repeat(20).trim_end().to_string();
        let text = format!("{}\n\n{}\n\n{}", para, para, para);
        // Budget fits one paragraph but not two.
        let chunks = chunk_text("a.txt", &text, 140, 0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks[0].content.starts_with("word"));
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn deterministic() {
        let text = "Alpha beta gamma.\n\nDelta epsilon zeta eta theta. ".repeat(30);
        let first = chunk_text("a.txt", &text, 200, 30);
        let second = chunk_text("a.txt", &text, 200, 30);
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "héllo wörld ünïcode ".repeat(50);
        let chunks = chunk_text("a.txt", &text, 100, 10);
        for chunk in &chunks {
            assert!(chunk.content.chars().count() <= 100);
        }
        assert_eq!(reconstruct(&chunks, 10), text);
    }
}
