// Database module
// Records, queries and the Pinecone index client they are sent through

pub mod pinecone;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

pub use pinecone::{IndexDescription, IndexStatus, PineconeIndex};

/// Arbitrary JSON metadata attached to a record
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A vector and its metadata, keyed by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub values: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Nearest-neighbour query against an index
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: u32,
    pub include_metadata: bool,
}

/// One result of a nearest-neighbour query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl QueryMatch {
    /// String metadata field, if present
    #[inline]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.get(key))
            .and_then(serde_json::Value::as_str)
    }
}

/// Storage and similarity search over embedding records
pub trait VectorIndex {
    /// Insert or overwrite records by id, returning how many were written
    fn upsert(&self, records: &[Record]) -> Result<usize>;

    /// Fetch records by id. Ids that do not exist are absent from the map.
    fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>>;

    /// Return the nearest records to the query vector, best first
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>>;
}

impl<I: VectorIndex + ?Sized> VectorIndex for &I {
    #[inline]
    fn upsert(&self, records: &[Record]) -> Result<usize> {
        (**self).upsert(records)
    }

    #[inline]
    fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>> {
        (**self).fetch(ids)
    }

    #[inline]
    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        (**self).query(request)
    }
}
