use super::{build_ingestor, collection_or_default};
use anyhow::Result;
use ragcore::config::Config;

pub async fn delete_document(config: Config, doc_id: String, collection: Option<String>) -> Result<()> {
    let collection = collection_or_default(&config, collection);
    let removed = build_ingestor(&config)?
        .delete_document(&collection, &doc_id)
        .await?;

    if removed == 0 {
        println!("No chunks found for {} in '{}'", doc_id, collection);
    } else {
        println!("Deleted {} chunks of {} from '{}'", removed, doc_id, collection);
    }
    Ok(())
}
