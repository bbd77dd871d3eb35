#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::debug;

/// Words per chunk when nothing else is configured
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(30) {
    Some(size) => size,
    None => panic!("default chunk size must be non-zero"),
};

/// A contiguous group of words taken from a note, ready for embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The chunk's words joined by single spaces
    pub text: String,
    /// Position of this chunk within the note
    pub index: usize,
    /// Number of words in this chunk
    pub word_count: usize,
}

/// Configuration for note chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Number of words per chunk. The final chunk of a note may be shorter.
    pub chunk_size: NonZeroUsize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Split `text` on whitespace into groups of `chunk_size` words, in order.
///
/// Text without any words still produces a single empty chunk, so every
/// note maps to at least one record.
#[inline]
pub fn chunk_text(text: &str, chunk_size: NonZeroUsize) -> Vec<Chunk> {
    let words = text.split_whitespace().collect::<Vec<_>>();

    if words.is_empty() {
        debug!("No words in input, producing a single empty chunk");
        return vec![Chunk {
            text: String::new(),
            index: 0,
            word_count: 0,
        }];
    }

    let chunks = words
        .chunks(chunk_size.get())
        .enumerate()
        .map(|(index, group)| Chunk {
            text: group.join(" "),
            index,
            word_count: group.len(),
        })
        .collect::<Vec<_>>();

    debug!(
        "Chunked {} words into {} chunks of up to {} words",
        words.len(),
        chunks.len(),
        chunk_size
    );

    chunks
}

/// Chunk a note using the configured chunk size
#[inline]
pub fn chunk_note(text: &str, config: &ChunkingConfig) -> Vec<Chunk> {
    chunk_text(text, config.chunk_size)
}
