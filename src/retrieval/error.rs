//! Errors surfaced by the retrieval engine and pipeline

use super::bm25::LexicalError;
use crate::embedding::EmbeddingError;
use crate::store::StoreError;
use crate::types::Stage;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A request-level retrieval failure
///
/// Failures recovered locally (lexical index build, rerank) never reach the
/// caller as errors; they show up as degradations on the result instead.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// Rejected before any collaborator was called
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator errored
    #[error("{stage} unavailable: {source}")]
    CollaboratorUnavailable {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    /// A collaborator did not answer in time
    #[error("{stage} timed out after {timeout_ms}ms")]
    Timeout { stage: Stage, timeout_ms: u64 },

    /// Lexical index could not be built
    #[error("Lexical index build failed: {0}")]
    IndexBuild(#[from] LexicalError),
}

impl RetrievalError {
    pub fn unavailable(stage: Stage, source: impl Into<BoxError>) -> Self {
        Self::CollaboratorUnavailable {
            stage,
            source: source.into(),
        }
    }

    /// Stage the failure is attributed to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::InvalidInput(_) => None,
            Self::CollaboratorUnavailable { stage, .. } | Self::Timeout { stage, .. } => Some(*stage),
            Self::IndexBuild(_) => Some(Stage::LexicalIndex),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        Self::unavailable(Stage::Embedding, err)
    }
}

impl From<StoreError> for RetrievalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CollectionNotFound(name) => {
                Self::InvalidInput(format!("unknown collection '{}'", name))
            }
            StoreError::DimensionMismatch { expected, actual } => Self::InvalidInput(format!(
                "query vector has {} dimensions, collection expects {}",
                actual, expected
            )),
            other => Self::unavailable(Stage::VectorSearch, other),
        }
    }
}

/// Result type for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;
