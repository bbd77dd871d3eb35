use anyhow::Result;
use clap::{Parser, Subcommand};
use note_search::commands::{NoteSource, init_config, insert_note, search_notes, serve};
use note_search::config::{Config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "note-search")]
#[command(about = "Store and search notes in a Pinecone vector index")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file, or show the effective configuration
    Config {
        /// Show current configuration instead of writing defaults
        #[arg(long)]
        show: bool,
    },
    /// Chunk, embed and store a note
    Insert {
        /// Note text
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        text: Option<String>,
        /// Read the note from a file instead
        #[arg(long)]
        file: Option<PathBuf>,
        /// Pinecone API key, overriding PINECONE_API_KEY
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Search stored notes
    Search {
        /// Search text
        query: String,
        /// Pinecone API key, overriding PINECONE_API_KEY
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Start the HTTP API
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = Config::load_with_env()?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config);
            } else {
                init_config(&Config::config_dir()?)?;
            }
        }
        Commands::Insert {
            text,
            file,
            api_key,
        } => {
            let source = match (text, file) {
                (_, Some(path)) => NoteSource::File(path),
                (Some(text), None) => NoteSource::Text(text),
                (None, None) => anyhow::bail!("Provide note text or --file"),
            };
            insert_note(&config, api_key.as_deref(), &source)?;
        }
        Commands::Search { query, api_key } => {
            search_notes(&config, api_key.as_deref(), &query)?;
        }
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
                config.server.validate()?;
            }
            serve(config).await?;
        }
    }

    Ok(())
}
