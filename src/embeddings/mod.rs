// Embeddings module
// Word chunking and the Pinecone-hosted embedding model

pub mod chunking;
pub mod inference;

pub use chunking::{Chunk, ChunkingConfig, DEFAULT_CHUNK_SIZE, chunk_note, chunk_text};
pub use inference::{InputType, PineconeEmbedder, Truncate};

use crate::Result;

/// Turns text into embedding vectors
pub trait Embedder {
    /// Embed `texts`, returning exactly one vector per input in input order
    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>>;

    /// Embed the text of each chunk
    #[inline]
    fn embed_chunks(&self, chunks: &[Chunk], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let texts = chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
        self.embed(&texts, input_type)
    }
}

impl<E: Embedder + ?Sized> Embedder for &E {
    #[inline]
    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts, input_type)
    }
}
