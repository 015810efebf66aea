//! Text embedding collaborators.
//!
//! The index and the query path must embed with the same provider so vectors
//! share one dimensionality.

mod openai;
mod provider;

pub use openai::OpenAiEmbeddingProvider;
pub use provider::EmbeddingProvider;
