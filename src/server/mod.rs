
pub mod errors;
pub mod routes;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use url::Url;

use crate::Result;
use crate::config::Config;
use crate::database::PineconeIndex;
use crate::embeddings::PineconeEmbedder;
use crate::notes::NoteStore;
use crate::pinecone::{ApiClient, agent_for};

pub use errors::ApiError;
pub use routes::{health_routes, note_routes};

const MAX_BODY_SIZE_2MB: usize = 2 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    /// Serialises inserts made through this server
    insert_lock: Arc<Mutex<()>>,
    /// Shared by every request so connections are pooled
    agent: ureq::Agent,
    /// Data-plane host, resolved on the first request that needs it
    index_host: Arc<OnceLock<Url>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("index_host", &self.index_host.get())
            .finish_non_exhaustive()
    }
}

impl AppState {
    #[inline]
    pub fn new(config: Config) -> Self {
        Self {
            agent: agent_for(&config.pinecone),
            config: Arc::new(config),
            insert_lock: Arc::new(Mutex::new(())),
            index_host: Arc::new(OnceLock::new()),
        }
    }

    /// Note store for one request, reusing the pooled agent and the cached index host
    #[inline]
    pub fn note_store(&self, api_key: &str) -> Result<NoteStore<PineconeEmbedder, PineconeIndex>> {
        let config = &self.config;
        let api = ApiClient::with_agent(self.agent.clone(), api_key, &config.pinecone)?;
        let embedder = PineconeEmbedder::new(api.clone(), &config.pinecone, &config.embedding)?;

        let index = match self.index_host.get() {
            Some(host) => PineconeIndex::new(api, host.clone(), config.pinecone.namespace.clone()),
            None => {
                let index = PineconeIndex::connect(api, &config.pinecone, &config.embedding)?;
                if self.index_host.set(index.host().clone()).is_err() {
                    debug!("Index host was cached by a concurrent request");
                }
                index
            }
        };

        Ok(NoteStore::new(
            embedder,
            index,
            config.chunking,
            config.notes.clone(),
        ))
    }
}

#[inline]
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(note_routes())
        .with_state(state)
        .merge(health_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_2MB))
        .layer(TraceLayer::new_for_http())
}

/// Serve the HTTP API until Ctrl-C
#[inline]
pub async fn start_server(config: Config) -> Result<()> {
    let addr = config.server.socket_addr()?;
    let app = router(AppState::new(config));

    info!("Starting web server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
