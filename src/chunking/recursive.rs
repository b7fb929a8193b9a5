//! Recursive character splitter.
//!
//! 1. Pick the coarsest separator present in the text (paragraph, line, word, character)
//! 2. Pieces under the size limit are merged greedily, keeping an overlap window
//! 3. Pieces over the limit are split again with the next finer separator

use std::collections::VecDeque;

use super::ChunkConfig;

/// Separators tried from coarsest to finest. The empty separator splits into characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn split_recursive(text: &str, separators: &[&str], config: ChunkConfig) -> Vec<String> {
    let mut chunks = Vec::new();

    // First separator that occurs in the text; "" always matches
    let (separator, finer) = match separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
    {
        Some(i) => (separators[i], &separators[i + 1..]),
        None => ("", &[][..]),
    };

    let pieces: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    };

    let mut small = Vec::new();
    for piece in pieces {
        if char_len(&piece) < config.chunk_size {
            small.push(piece);
            continue;
        }

        if !small.is_empty() {
            chunks.extend(merge_pieces(&small, separator, config));
            small.clear();
        }
        if finer.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_recursive(&piece, finer, config));
        }
    }

    if !small.is_empty() {
        chunks.extend(merge_pieces(&small, separator, config));
    }

    chunks
}

/// Greedily join pieces into chunks of at most `chunk_size` characters.
/// When a chunk is emitted, pieces are dropped from the front until at most
/// `chunk_overlap` characters remain, and those carry into the next chunk.
fn merge_pieces(pieces: &[String], separator: &str, config: ChunkConfig) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { sep_len };

        if total + len + joiner > config.chunk_size {
            if !window.is_empty() {
                push_joined(&mut chunks, &window, separator);
            }
            while total > config.chunk_overlap
                || (total > 0
                    && total + len + if window.is_empty() { 0 } else { sep_len }
                        > config.chunk_size)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
            }
        }

        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
    }

    if !window.is_empty() {
        push_joined(&mut chunks, &window, separator);
    }

    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}
