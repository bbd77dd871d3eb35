
use console::style;

use super::Config;

/// Print the effective configuration to stderr. The API key is masked.
#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Pinecone Settings:").bold().yellow());
    eprintln!(
        "  API Key: {}",
        style(mask_api_key(config.pinecone.api_key.as_deref())).cyan()
    );
    eprintln!(
        "  Index: {}",
        style(config.pinecone.index_name.as_deref().unwrap_or("<not set>")).cyan()
    );
    eprintln!(
        "  Index Host: {}",
        style(
            config
                .pinecone
                .index_host
                .as_deref()
                .unwrap_or("<resolved from index name>")
        )
        .cyan()
    );
    eprintln!("  Controller URL: {}", style(&config.pinecone.controller_url).cyan());
    eprintln!("  Inference URL: {}", style(&config.pinecone.inference_url).cyan());
    eprintln!("  API Version: {}", style(&config.pinecone.api_version).cyan());

    eprintln!();
    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Dimension: {}", style(config.embedding.dimension).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Notes Settings:").bold().yellow());
    eprintln!("  Chunk Size: {} words", style(config.chunking.chunk_size).cyan());
    eprintln!("  Id Strategy: {}", style(config.notes.id_strategy).cyan());
    eprintln!("  Top K: {}", style(config.notes.top_k).cyan());

    eprintln!();
    eprintln!(
        "Server: {}",
        style(format!("{}:{}", config.server.host, config.server.port)).cyan()
    );
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
}

fn mask_api_key(api_key: Option<&str>) -> String {
    match api_key {
        None => "<not set>".to_string(),
        Some(key) if key.chars().count() <= 8 => "****".to_string(),
        Some(key) => {
            let prefix: String = key.chars().take(4).collect();
            format!("{}****", prefix)
        }
    }
}
