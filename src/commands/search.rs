use super::{build_pipeline, collection_or_default};
use anyhow::Result;
use ragcore::{
    config::Config,
    types::{FusionResult, SearchRequest},
    util::truncate_str,
};
use tracing::info;

/// Search output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub struct SearchOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f64>,
    pub use_hybrid: bool,
    pub rerank: bool,
    pub collection: Option<String>,
    pub format: OutputFormat,
}

pub async fn search(config: Config, query: String, options: SearchOptions) -> Result<()> {
    let collection = collection_or_default(&config, options.collection);
    let pipeline = build_pipeline(&config).await?;
    let top_k = options.top_k.unwrap_or(if options.rerank {
        pipeline.reranker().default_top_k()
    } else {
        config.retrieval.default_top_k
    });
    info!("Searching '{}' for: {}", collection, query);

    let mut request = SearchRequest::new(&query, &collection, top_k).with_hybrid(options.use_hybrid);
    request.score_threshold = options.threshold;

    let result = pipeline.retrieve(&request, options.rerank).await?;

    output_results(&result, options.format)
}

fn output_results(result: &FusionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Text => {
            println!("\nSearch Results ({}):\n", result.len());
            for degradation in &result.degradations {
                println!("  (degraded at {}: {})", degradation.stage, degradation.reason);
            }
            for (i, candidate) in result.candidates.iter().enumerate() {
                match candidate.rerank_score {
                    Some(rerank) => println!(
                        "{}. [Score: {:.4} | Rerank: {:.4}] {}",
                        i + 1,
                        candidate.score,
                        rerank,
                        candidate.source_filename().unwrap_or("(unknown)")
                    ),
                    None => println!(
                        "{}. [Score: {:.4} | Vector: {:.4} | Lexical: {:.4}] {}",
                        i + 1,
                        candidate.score,
                        candidate.vector_score,
                        candidate.lexical_score,
                        candidate.source_filename().unwrap_or("(unknown)")
                    ),
                }
                println!("   Chunk: {}", candidate.chunk_id);
                println!("   {}\n", truncate_str(&candidate.content.replace('\n', " "), 200));
            }
        }
    }
    Ok(())
}
