//! Shared types, error model, and configuration for ConceptGraph.
//!
//! This crate is the foundation depended on by all other ConceptGraph crates.
//! It provides:
//! - [`ConceptGraphError`], the unified error type
//! - The concept schema ([`Schema`], [`Node`], [`Edge`], [`Archetype`])
//! - Pipeline stages ([`Stage`], [`StageObserver`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod stage;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EmbeddingSection, EnrichmentLevel, LlmSection, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{ConceptGraphError, Result};
pub use stage::{SilentObserver, Stage, StageObserver};
pub use types::{Archetype, Edge, Metadata, Node, Relationship, Schema, clamp_unit};
