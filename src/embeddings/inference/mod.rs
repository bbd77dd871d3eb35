#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use url::Url;

use super::Embedder;
use crate::config::{EmbeddingConfig, PineconeConfig};
use crate::pinecone::{ApiClient, endpoint};
use crate::{NotesError, Result};

pub const DEFAULT_EMBEDDING_MODEL: &str = "multilingual-e5-large";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;

/// Which side of an asymmetric retrieval model the text is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    /// Search queries
    Query,
    /// Stored documents
    Passage,
}

/// What the model does with inputs longer than its context window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Truncate {
    #[serde(rename = "END")]
    End,
    /// Reject over-length inputs
    #[serde(rename = "NONE")]
    Disabled,
}

impl fmt::Display for InputType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => f.write_str("query"),
            Self::Passage => f.write_str("passage"),
        }
    }
}

/// Client for Pinecone's hosted inference `embed` endpoint
#[derive(Debug, Clone)]
pub struct PineconeEmbedder {
    api: ApiClient,
    url: Url,
    model: String,
    dimension: usize,
    truncate: Truncate,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedParameters {
    input_type: InputType,
    truncate: Truncate,
}

#[derive(Debug, Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    values: Vec<f32>,
}

impl PineconeEmbedder {
    #[inline]
    pub fn new(api: ApiClient, pinecone: &PineconeConfig, embedding: &EmbeddingConfig) -> Result<Self> {
        let url = endpoint(&pinecone.inference_url()?, "embed")?;

        Ok(Self {
            api,
            url,
            model: embedding.model.clone(),
            dimension: embedding.dimension as usize,
            truncate: embedding.truncate,
            batch_size: embedding.batch_size.max(1),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn embed_single_batch(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            parameters: EmbedParameters {
                input_type,
                truncate: self.truncate,
            },
            inputs: texts
                .iter()
                .map(|text| EmbedInput {
                    text: text.as_str(),
                })
                .collect(),
        };

        let response: EmbedResponse = self.api.post_json(&self.url, &request)?;

        if response.data.len() != texts.len() {
            return Err(NotesError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                response.data.len()
            )));
        }

        response
            .data
            .into_iter()
            .map(|data| {
                if data.values.len() == self.dimension {
                    Ok(data.values)
                } else {
                    Err(NotesError::Embedding(format!(
                        "Model {} returned {} dimensions, expected {}",
                        self.model,
                        data.values.len(),
                        self.dimension
                    )))
                }
            })
            .collect()
    }
}

impl Embedder for PineconeEmbedder {
    fn embed(&self, texts: &[String], input_type: InputType) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            "Generating {} embeddings for {} texts with {}",
            input_type,
            texts.len(),
            self.model
        );

        let mut vectors = Vec::with_capacity(texts.len());

        // The hosted model caps the number of inputs per request
        for batch in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_single_batch(batch, input_type)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }
}
