use crate::services::assessor::LONG_DOCUMENT_THRESHOLD;
use crate::types::{ChunkPreview, DocumentText};
use tracing::debug;

/// Default upper bound, in characters, for a single chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8000;

pub struct TextChunker;

impl TextChunker {
    /// Greedily packs whitespace-separated words into chunks of at most
    /// `max_chunk_size` characters, joined by single spaces.
    ///
    /// Words are never split: a word longer than the bound ends up alone in
    /// an oversized chunk. Empty or all-whitespace input yields no chunks.
    pub fn chunk(text: &str, max_chunk_size: usize) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_size = 0;

        for word in text.split_whitespace() {
            let word_len = word.chars().count();

            if current_size + word_len + 1 > max_chunk_size {
                if !current.is_empty() {
                    chunks.push(current.join(" "));
                }
                current = vec![word];
                current_size = word_len;
            } else {
                current.push(word);
                current_size += word_len + 1; // joining space
            }
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }

        debug!(
            "Chunked {} characters into {} chunks (max {})",
            text.chars().count(),
            chunks.len(),
            max_chunk_size
        );

        chunks
    }

    pub fn chunk_default(text: &str) -> Vec<String> {
        Self::chunk(text, DEFAULT_MAX_CHUNK_SIZE)
    }

    pub fn preview(document: &DocumentText, max_chunk_size: usize) -> ChunkPreview {
        let chunks = Self::chunk(&document.content, max_chunk_size);
        let character_count = document.character_count();

        ChunkPreview {
            source: document.metadata.filename.clone(),
            character_count,
            word_count: document.word_count(),
            long_document: character_count > LONG_DOCUMENT_THRESHOLD,
            chunk_sizes: chunks.iter().map(|c| c.chars().count()).collect(),
        }
    }
}
