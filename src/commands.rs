use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::Config;
use crate::notes::{InsertedNote, NoteStore};
use crate::server::start_server;

/// Where the text of a note comes from on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteSource {
    Text(String),
    File(PathBuf),
}

impl NoteSource {
    #[inline]
    pub fn read(&self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text.clone()),
            Self::File(path) => read_note_file(path),
        }
    }
}

fn read_note_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read note file: {}", path.display()))
}

/// Store a note and print the ids it was written under
#[inline]
pub fn insert_note(config: &Config, api_key: Option<&str>, source: &NoteSource) -> Result<InsertedNote> {
    let text = source.read()?;
    let api_key = config.pinecone.resolve_api_key(api_key)?;

    let store = NoteStore::connect(config, &api_key).context("Failed to connect to Pinecone")?;
    let inserted = store
        .insert_note(&text)
        .context("Failed to store note")?;

    println!("Stored note {}", inserted.note_id);
    println!("  Chunks: {}", inserted.chunk_ids.len());
    for chunk_id in &inserted.chunk_ids {
        println!("    {}", chunk_id);
    }

    Ok(inserted)
}

/// Search notes and print each distinct match
#[inline]
pub fn search_notes(config: &Config, api_key: Option<&str>, query: &str) -> Result<Vec<String>> {
    let api_key = config.pinecone.resolve_api_key(api_key)?;

    let store = NoteStore::connect(config, &api_key).context("Failed to connect to Pinecone")?;
    let results = store
        .search_notes(query)
        .context("Failed to search notes")?;

    if results.is_empty() {
        println!("No matching notes found.");
    } else {
        println!("Found {} matching notes:", results.len());
        for (rank, text) in results.iter().enumerate() {
            println!();
            println!("{}. {}", rank + 1, text);
        }
    }

    Ok(results)
}

/// Write a default config file to `config_dir` unless one already exists
#[inline]
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    let config = Config::load(config_dir)?;
    let config_path = config.config_file_path();

    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
    } else {
        config.save()?;
        println!("Wrote default configuration to {}", config_path.display());
    }
    println!("Run `note-search config --show` to see the effective settings.");

    Ok(config_path)
}

/// Run the HTTP API
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    info!(
        "Serving notes from index {}",
        config.pinecone.index_name.as_deref().unwrap_or("<host only>")
    );
    start_server(config).await.context("Web server failed")?;
    Ok(())
}
