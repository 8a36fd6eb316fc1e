//! Local cross-encoder reranking with ONNX Runtime
//!
//! Expects a sequence-classification export such as ms-marco-MiniLM-L-6-v2
//! and its `tokenizer.json`.

use super::reranker::{RerankError, RerankProvider, RerankResult};
use async_trait::async_trait;
use ort::{execution_providers::CPUExecutionProvider, session::Session, value::Tensor};
use parking_lot::Mutex;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

pub struct CrossEncoderProvider {
    inner: Arc<Inner>,
}

struct Inner {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    uses_token_types: bool,
}

impl std::fmt::Debug for CrossEncoderProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossEncoderProvider")
            .field("uses_token_types", &self.inner.uses_token_types)
            .finish_non_exhaustive()
    }
}

fn unavailable(e: impl Display) -> RerankError {
    RerankError::Unavailable(e.to_string())
}

fn failed(e: impl Display) -> RerankError {
    RerankError::RequestFailed(e.to_string())
}

impl CrossEncoderProvider {
    /// Load model and tokenizer files
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        max_length: usize,
    ) -> RerankResult<Self> {
        info!("Loading reranker model from {}", model_path.as_ref().display());

        let session = Session::builder()
            .map_err(unavailable)?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(unavailable)?
            .with_intra_threads(4)
            .map_err(unavailable)?
            .commit_from_file(model_path.as_ref())
            .map_err(unavailable)?;
        let uses_token_types = session.inputs.iter().any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(tokenizer_path.as_ref()).map_err(unavailable)?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(unavailable)?;

        Ok(Self {
            inner: Arc::new(Inner {
                session: Mutex::new(session),
                tokenizer,
                uses_token_types,
            }),
        })
    }
}

impl Inner {
    fn score_batch(&self, query: &str, passages: &[String]) -> RerankResult<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = passages
            .iter()
            .map(|p| (query.to_string(), p.clone()))
            .collect();
        let encodings = self.tokenizer.encode_batch(pairs, true).map_err(failed)?;

        let batch_size = encodings.len();
        let max_len = encodings.iter().map(|e| e.get_ids().len()).max().unwrap_or(0);

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let types = encoding.get_type_ids();
            for i in 0..max_len {
                if i < ids.len() {
                    input_ids.push(i64::from(ids[i]));
                    attention_mask.push(1);
                    token_type_ids.push(i64::from(types[i]));
                } else {
                    input_ids.push(0);
                    attention_mask.push(0);
                    token_type_ids.push(0);
                }
            }
        }

        let shape = [batch_size, max_len];
        let (logits_shape, logits): (Vec<usize>, Vec<f32>) = {
            let mut session = self.session.lock();
            let input_ids = Tensor::from_array((shape, input_ids)).map_err(failed)?;
            let attention_mask = Tensor::from_array((shape, attention_mask)).map_err(failed)?;
            let outputs = if self.uses_token_types {
                let token_type_ids = Tensor::from_array((shape, token_type_ids)).map_err(failed)?;
                session.run(ort::inputs![
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                    "token_type_ids" => token_type_ids,
                ])
            } else {
                session.run(ort::inputs![
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                ])
            }
            .map_err(failed)?;

            let (_, value) = outputs
                .iter()
                .next()
                .ok_or_else(|| failed("model produced no output tensor"))?;
            let array = value.try_extract_array::<f32>().map_err(failed)?;
            (array.shape().to_vec(), array.iter().copied().collect())
        };

        let logits = ndarray::ArrayViewD::from_shape(logits_shape.as_slice(), logits.as_slice())
            .map_err(failed)?;

        // Two logits: softmax over (irrelevant, relevant); one logit: sigmoid
        Ok((0..batch_size)
            .map(|i| {
                if logits.ndim() > 1 && logits.shape()[1] > 1 {
                    sigmoid(logits[[i, 1]] - logits[[i, 0]])
                } else if logits.ndim() > 1 {
                    sigmoid(logits[[i, 0]])
                } else {
                    sigmoid(logits[[i]])
                }
            })
            .collect())
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[async_trait]
impl RerankProvider for CrossEncoderProvider {
    async fn score_pairs(&self, query: &str, passages: &[String]) -> RerankResult<Vec<f32>> {
        debug!("Cross-encoding {} pairs", passages.len());
        let inner = self.inner.clone();
        let query = query.to_string();
        let passages = passages.to_vec();
        tokio::task::spawn_blocking(move || inner.score_batch(&query, &passages))
            .await
            .map_err(failed)?
    }

    async fn warm_up(&self) -> RerankResult<()> {
        self.score_pairs("warm up", &["warm up".to_string()])
            .await
            .map(|_| ())
            .map_err(unavailable)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
