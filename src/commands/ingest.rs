use super::{build_ingestor, collection_or_default};
use anyhow::{bail, Context, Result};
use ragcore::{config::Config, ingest::IngestError, types::Document};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Stable document id for a file, so re-ingesting replaces its chunks
fn document_id(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical.to_string_lossy().as_bytes()).to_string()
}

pub async fn ingest_path(config: Config, path: PathBuf, collection: Option<String>) -> Result<()> {
    let collection = collection_or_default(&config, collection);

    let files: Vec<PathBuf> = if path.is_file() {
        vec![path.clone()]
    } else if path.is_dir() {
        info!("Ingesting directory: {}", path.display());
        walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_text_file(e.path()))
            .map(|e| e.into_path())
            .collect()
    } else {
        bail!("{} is not a file or directory", path.display());
    };

    let ingestor = build_ingestor(&config)?;
    let mut ingested = 0usize;
    let mut total_chunks = 0usize;

    for file in &files {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document = Document::new(filename, content)
            .with_id(document_id(file))
            .with_metadata("path", file.display().to_string());

        match ingestor.ingest(&collection, document).await {
            Ok(report) => {
                println!("{}  {} ({} chunks)", report.doc_id, report.filename, report.chunks_count);
                ingested += 1;
                total_chunks += report.chunks_count;
            }
            Err(IngestError::EmptyDocument(name)) => warn!("Skipping empty file {}", name),
            Err(e) => return Err(e).with_context(|| format!("Failed to ingest {}", file.display())),
        }
    }

    println!(
        "Ingested {} of {} files ({} chunks) into '{}'",
        ingested,
        files.len(),
        total_chunks,
        collection
    );
    Ok(())
}
