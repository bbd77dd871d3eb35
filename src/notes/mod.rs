//! Note storage and search on top of an [`Embedder`] and a [`VectorIndex`].
//!
//! A note is split into word chunks and every chunk is stored as its own
//! record, id `"<note id>-<chunk index>"`, carrying the full note text in its
//! metadata. Search embeds the query, looks up the nearest chunks and returns
//! the distinct note texts they belong to.
//!
//! Sequential note ids are kept in a sentinel record with id `"count"`
//! holding the next id. The sentinel is written in the last upsert batch of
//! an insert, so it only advances once every chunk record has been stored.


use chrono::Utc;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{Config, NotesConfig};
use crate::database::{Metadata, PineconeIndex, QueryRequest, Record, VectorIndex};
use crate::embeddings::{ChunkingConfig, Embedder, InputType, PineconeEmbedder, chunk_note};
use crate::pinecone::ApiClient;
use crate::{NotesError, Result};

/// Id of the record holding the next sequential note id
pub const SENTINEL_ID: &str = "count";
/// Separates the note id from the chunk index in record ids
pub const CHUNK_ID_SEPARATOR: char = '-';

/// How new notes get their identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteIdStrategy {
    /// Increasing integers kept in the sentinel record.
    /// Concurrent writers in different processes can race.
    #[default]
    Sequential,
    /// Random UUIDs; never touches the sentinel
    Random,
}

impl fmt::Display for NoteIdStrategy {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Random => f.write_str("random"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum NoteId {
    Sequential(u64),
    Random(Uuid),
}

impl fmt::Display for NoteId {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential(id) => write!(f, "{}", id),
            Self::Random(id) => write!(f, "{}", id.hyphenated()),
        }
    }
}

impl From<NoteId> for Value {
    #[inline]
    fn from(note_id: NoteId) -> Self {
        match note_id {
            NoteId::Sequential(id) => Value::from(id),
            NoteId::Random(id) => Value::from(id.hyphenated().to_string()),
        }
    }
}

/// Outcome of a successful insert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertedNote {
    pub note_id: NoteId,
    pub chunk_ids: Vec<String>,
}

pub struct NoteStore<E, I> {
    embedder: E,
    index: I,
    chunking: ChunkingConfig,
    notes: NotesConfig,
}

impl NoteStore<PineconeEmbedder, PineconeIndex> {
    /// Build Pinecone-backed clients for `api_key` from the configuration
    #[inline]
    pub fn connect(config: &Config, api_key: &str) -> Result<Self> {
        let api = ApiClient::new(api_key, &config.pinecone)?;
        let embedder = PineconeEmbedder::new(api.clone(), &config.pinecone, &config.embedding)?;
        let index = PineconeIndex::connect(api, &config.pinecone, &config.embedding)?;

        Ok(Self::new(
            embedder,
            index,
            config.chunking,
            config.notes.clone(),
        ))
    }
}

impl<E: Embedder, I: VectorIndex> NoteStore<E, I> {
    #[inline]
    pub fn new(embedder: E, index: I, chunking: ChunkingConfig, notes: NotesConfig) -> Self {
        Self {
            embedder,
            index,
            chunking,
            notes,
        }
    }

    /// Chunk, embed and store a note
    #[inline]
    pub fn insert_note(&self, full_text: &str) -> Result<InsertedNote> {
        if full_text.trim().is_empty() {
            return Err(NotesError::InvalidInput(
                "Note text cannot be empty".to_string(),
            ));
        }

        let chunks = chunk_note(full_text, &self.chunking);
        let vectors = self.embedder.embed_chunks(&chunks, InputType::Passage)?;

        if vectors.len() != chunks.len() {
            return Err(NotesError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let note_id = self.allocate_note_id()?;
        let next_count = match note_id {
            NoteId::Sequential(id) => Some(id.checked_add(1).ok_or_else(|| {
                NotesError::Index(format!("Note counter {} cannot be advanced", id))
            })?),
            NoteId::Random(_) => None,
        };
        let created_at = Utc::now().to_rfc3339();

        let mut records = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| Record {
                id: chunk_record_id(note_id, chunk.index),
                values,
                metadata: Some(chunk_metadata(note_id, full_text, chunk.index, &created_at)),
            })
            .collect::<Vec<_>>();

        let chunk_ids = records.iter().map(|r| r.id.clone()).collect::<Vec<_>>();

        if let Some(next_count) = next_count {
            // Pinecone rejects all-zero dense vectors, so reuse the first chunk's
            let values = records
                .first()
                .map(|r| r.values.clone())
                .unwrap_or_default();
            records.push(sentinel_record(next_count, values));
        }

        for batch in records.chunks(self.notes.upsert_batch_size.max(1)) {
            self.index.upsert(batch)?;
        }

        info!("Stored note {} ({} chunks)", note_id, chunk_ids.len());

        Ok(InsertedNote { note_id, chunk_ids })
    }

    /// Distinct full texts of the notes nearest to `query`, best match first
    #[inline]
    pub fn search_notes(&self, query: &str) -> Result<Vec<String>> {
        if query.trim().is_empty() {
            return Err(NotesError::InvalidInput(
                "Search text cannot be empty".to_string(),
            ));
        }

        let vector = self
            .embedder
            .embed(&[query.to_string()], InputType::Query)?
            .into_iter()
            .next()
            .ok_or_else(|| NotesError::Embedding("No embedding returned for query".to_string()))?;

        let matches = self.index.query(&QueryRequest {
            vector,
            top_k: self.notes.top_k,
            include_metadata: true,
        })?;

        let texts = matches
            .iter()
            .filter(|m| is_note_chunk_id(&m.id))
            .filter_map(|m| m.metadata_str("full_text"))
            .unique()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        debug!(
            "Search matched {} records from {} distinct notes",
            matches.len(),
            texts.len()
        );

        Ok(texts)
    }

    /// Next sequential note id according to the sentinel, 0 if there is none
    #[inline]
    pub fn next_sequential_id(&self) -> Result<u64> {
        let mut records = self.index.fetch(&[SENTINEL_ID])?;

        let Some(sentinel) = records.remove(SENTINEL_ID) else {
            info!("No sentinel record found, starting note ids at 0");
            return Ok(0);
        };

        sentinel
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.get("count"))
            .and_then(parse_count)
            .ok_or_else(|| {
                NotesError::Index(format!(
                    "Sentinel record has no valid count: {:?}",
                    sentinel.metadata
                ))
            })
    }

    fn allocate_note_id(&self) -> Result<NoteId> {
        let note_id = match self.notes.id_strategy {
            NoteIdStrategy::Sequential => NoteId::Sequential(self.next_sequential_id()?),
            NoteIdStrategy::Random => NoteId::Random(Uuid::new_v4()),
        };
        debug!("Allocated note id {}", note_id);
        Ok(note_id)
    }
}

/// Record id for chunk `chunk_index` of a note
#[inline]
pub fn chunk_record_id(note_id: NoteId, chunk_index: usize) -> String {
    format!("{}{}{}", note_id, CHUNK_ID_SEPARATOR, chunk_index)
}

/// Whether a record id belongs to a note chunk rather than the sentinel
#[inline]
pub fn is_note_chunk_id(id: &str) -> bool {
    id != SENTINEL_ID && id.contains(CHUNK_ID_SEPARATOR)
}

fn chunk_metadata(note_id: NoteId, full_text: &str, chunk_index: usize, created_at: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("note_id".to_string(), note_id.into());
    metadata.insert("full_text".to_string(), full_text.into());
    metadata.insert("chunk_index".to_string(), chunk_index.into());
    metadata.insert("created_at".to_string(), created_at.into());
    metadata
}

fn sentinel_record(next_id: u64, values: Vec<f32>) -> Record {
    let mut metadata = Metadata::new();
    metadata.insert("count".to_string(), next_id.into());
    Record {
        id: SENTINEL_ID.to_string(),
        values,
        metadata: Some(metadata),
    }
}

/// Pinecone stores metadata numbers as floats; older writers stored strings
fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0 && n.fract() == 0.0 && *n < u64::MAX as f64)
                .map(|n| n as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
