use anyhow::{Context, Result};
use ragcore::{chunking::TextSplitter, config::Config, types::Document};
use std::path::PathBuf;

pub fn chunk_file(config: Config, file: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let splitter = TextSplitter::from_config(config.chunking)?;
    let chunks = splitter.split_document(&Document::new(filename, content));

    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}
