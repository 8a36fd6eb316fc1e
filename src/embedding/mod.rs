//! Query and passage embedding

pub mod backend;

pub use backend::{
    create_backend, normalize_embedding, EmbeddingBackend, EmbeddingError, EmbeddingResult,
    HashedBackend, HttpBackend, HttpConfig,
};
