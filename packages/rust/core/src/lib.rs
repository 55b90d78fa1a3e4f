//! Tiered concept-graph extraction.
//!
//! [`TieredRunner`] chains lexical extraction, embedding refinement, and
//! LLM enrichment, yielding a [`TierResult`] as each enabled tier completes.

pub mod runner;

pub use conceptgraph_shared::{SilentObserver, Stage, StageObserver};
pub use runner::{Tier, TierResult, TierStream, TieredRunner};
