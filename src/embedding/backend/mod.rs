//! Pluggable embedding backend system
//!
//! - **HTTP backend**: OpenAI-compatible APIs (OpenAI, Azure, LM Studio, vLLM, etc.)
//! - **Hashed backend**: offline feature hashing, no model required
//!
//! # Example Configuration
//!
//! ```toml
//! # OpenAI
//! [embedding]
//! backend = "http"
//! endpoint = "https://api.openai.com/v1/embeddings"
//! model = "text-embedding-3-small"
//! dimensions = 1536
//! # api_key from OPENAI_API_KEY env var
//!
//! # Offline
//! [embedding]
//! backend = "hashed"
//! dimensions = 256
//! ```

mod factory;
mod hashed;
mod http;
mod traits;

pub use factory::create_backend;
pub use hashed::HashedBackend;
pub use http::{HttpBackend, HttpConfig};
pub use traits::{normalize_embedding, EmbeddingBackend, EmbeddingError, EmbeddingResult};
