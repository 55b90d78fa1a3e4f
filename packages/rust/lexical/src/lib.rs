//! Lexical concept extraction (tier 1) and text archetype analysis.
//!
//! Turns raw text into an initial [`Schema`](conceptgraph_shared::Schema)
//! using RAKE keyphrase scoring, noun phrases from a [`PosTagger`],
//! TF-IDF weighting, and co-occurrence / subject-verb-object edges.
//! Everything here is synchronous and deterministic.

pub mod analyzer;
mod extract;
mod rake;
pub mod tagger;
mod text;

pub use analyzer::{ArchetypeScores, analyze_text};
pub use extract::{LexicalExtractor, MAX_NODES};
pub use tagger::{HeuristicTagger, PosTagger, TaggedSentence};
pub use text::{split_sentences, title_case, tokenize};
