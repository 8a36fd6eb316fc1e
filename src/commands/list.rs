use super::{collection_or_default, OutputFormat};
use anyhow::{Context, Result};
use ragcore::{
    config::Config,
    store::create_store,
    types::{Chunk, DocumentPage},
    util::truncate_str,
};

pub struct ListOptions {
    pub collection: Option<String>,
    pub doc_id: Option<String>,
    pub page: usize,
    pub page_size: usize,
    pub format: OutputFormat,
}

/// List the documents of a collection, or the chunks of one document
pub async fn list(config: Config, options: ListOptions) -> Result<()> {
    let collection = collection_or_default(&config, options.collection);
    let store = create_store(&config.store).context("Failed to open vector store")?;

    match options.doc_id {
        Some(doc_id) => {
            let chunks = store.document_chunks(&collection, Some(&doc_id)).await?;
            output_chunks(&doc_id, &chunks, options.format)
        }
        None => {
            let page = store
                .list_documents(&collection, options.page, options.page_size)
                .await?;
            output_documents(&collection, &page, options.format)
        }
    }
}

fn output_documents(collection: &str, page: &DocumentPage, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(page)?),
        OutputFormat::Text => {
            let pages = page.total.div_ceil(page.page_size).max(1);
            println!(
                "\nDocuments in '{}' ({} total, page {}/{}):\n",
                collection, page.total, page.page, pages
            );
            for doc in &page.documents {
                let created = doc
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {}  ({} chunks, {})",
                    doc.doc_id, doc.filename, doc.chunks_count, created
                );
            }
        }
    }
    Ok(())
}

fn output_chunks(doc_id: &str, chunks: &[Chunk], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(chunks)?),
        OutputFormat::Text => {
            if chunks.is_empty() {
                println!("No chunks found for {}", doc_id);
            }
            for chunk in chunks {
                println!("[{}] {}", chunk.index, chunk.chunk_id);
                println!("   {}\n", truncate_str(&chunk.content.replace('\n', " "), 200));
            }
        }
    }
    Ok(())
}
