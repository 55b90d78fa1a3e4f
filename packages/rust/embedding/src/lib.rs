//! Embedding-based refinement (tier 2).
//!
//! Embeds every node label, blends semantic similarity into edge strengths,
//! clusters nodes into themes with k-means, and re-weights nodes by degree
//! centrality. The embedding model is a collaborator behind [`Embedder`],
//! reached through a lazily-initialized, shareable [`EmbedderHandle`].

mod embedder;
mod http;
pub mod kmeans;
mod refine;
pub mod similarity;

pub use embedder::{Embedder, EmbedderHandle, EmbedderLoader};
pub use http::{HttpEmbedder, HttpEmbedderConfig};
pub use kmeans::{cluster_count, kmeans};
pub use refine::{EDGE_FLOOR, SYNTHESIS_THRESHOLD, refine};
pub use similarity::{cosine_similarity, similarity_matrix};
