
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use url::Url;

use super::{QueryMatch, QueryRequest, Record, VectorIndex};
use crate::config::settings::parse_host_url;
use crate::config::{EmbeddingConfig, PineconeConfig};
use crate::pinecone::{ApiClient, endpoint};
use crate::{NotesError, Result};

/// Data-plane client for a single Pinecone index namespace
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    api: ApiClient,
    host: Url,
    namespace: String,
}

/// Control-plane description of an index
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexDescription {
    pub name: String,
    #[serde(default)]
    pub dimension: Option<u32>,
    #[serde(default)]
    pub metric: Option<String>,
    pub host: String,
    #[serde(default)]
    pub status: Option<IndexStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IndexStatus {
    pub ready: bool,
    pub state: String,
}

#[derive(Debug, Serialize)]
struct UpsertBody<'a> {
    vectors: &'a [Record],
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, Record>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    vector: &'a [f32],
    top_k: u32,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

impl PineconeIndex {
    #[inline]
    pub fn new(api: ApiClient, host: Url, namespace: impl Into<String>) -> Self {
        Self {
            api,
            host,
            namespace: namespace.into(),
        }
    }

    /// Connect to the configured index. Uses the configured host when present,
    /// otherwise resolves it through the control plane and checks that the
    /// index dimension matches the embedding model.
    #[inline]
    pub fn connect(
        api: ApiClient,
        pinecone: &PineconeConfig,
        embedding: &EmbeddingConfig,
    ) -> Result<Self> {
        if let Some(host) = pinecone.index_host_url()? {
            debug!("Using configured index host {}", host);
            return Ok(Self::new(api, host, pinecone.namespace.clone()));
        }

        let description = Self::describe(&api, pinecone)?;

        if let Some(status) = &description.status {
            if !status.ready {
                warn!(
                    "Index {} is not ready (state: {})",
                    description.name, status.state
                );
            }
        }

        if let Some(dimension) = description.dimension {
            if dimension != embedding.dimension {
                return Err(NotesError::Config(format!(
                    "Index {} has dimension {} but model {} produces {}",
                    description.name, dimension, embedding.model, embedding.dimension
                )));
            }
        }

        let host = parse_host_url(&description.host)?;
        info!("Resolved index {} to host {}", description.name, host);

        Ok(Self::new(api, host, pinecone.namespace.clone()))
    }

    /// Look up an index by name on the control plane
    #[inline]
    pub fn describe(api: &ApiClient, pinecone: &PineconeConfig) -> Result<IndexDescription> {
        let name = pinecone.require_index_name()?;
        let url = endpoint(&pinecone.controller_url()?, &format!("indexes/{}", name))?;

        debug!("Describing index {}", name);
        api.get_json(&url, &[])
    }

    #[inline]
    pub fn host(&self) -> &Url {
        &self.host
    }
}

impl VectorIndex for PineconeIndex {
    fn upsert(&self, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = endpoint(&self.host, "vectors/upsert")?;
        let response: UpsertResponse = self.api.post_json(
            &url,
            &UpsertBody {
                vectors: records,
                namespace: &self.namespace,
            },
        )?;

        debug!("Upserted {} records", response.upserted_count);
        Ok(response.upserted_count)
    }

    fn fetch(&self, ids: &[&str]) -> Result<HashMap<String, Record>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = endpoint(&self.host, "vectors/fetch")?;
        let mut query = ids.iter().map(|id| ("ids", *id)).collect::<Vec<_>>();
        if !self.namespace.is_empty() {
            query.push(("namespace", self.namespace.as_str()));
        }

        let response: FetchResponse = self.api.get_json(&url, &query)?;

        debug!("Fetched {} of {} records", response.vectors.len(), ids.len());
        Ok(response.vectors)
    }

    fn query(&self, request: &QueryRequest) -> Result<Vec<QueryMatch>> {
        let url = endpoint(&self.host, "query")?;
        let response: QueryResponse = self.api.post_json(
            &url,
            &QueryBody {
                vector: &request.vector,
                top_k: request.top_k,
                include_metadata: request.include_metadata,
                include_values: false,
                namespace: &self.namespace,
            },
        )?;

        debug!("Query returned {} matches", response.matches.len());
        Ok(response.matches)
    }
}
