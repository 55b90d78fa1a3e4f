//! LLM-based semantic enrichment (tier 3).
//!
//! Sends up to four small JSON-returning prompts (theme names, node roles,
//! edge labels, node descriptions) concurrently and applies whatever comes
//! back. Any prompt may fail without affecting the others; with the LLM
//! entirely unavailable the schema passes through unchanged.

mod chat;
mod enrich;
pub mod prompts;

pub use chat::{ChatModel, ChatRequest, HttpChatModel};
pub use enrich::{Enricher, Tier3Config, UNTHEMED_KEY};
