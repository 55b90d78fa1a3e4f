//! Tier 1: text → initial concept schema.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use conceptgraph_shared::{Edge, Node, Schema, clamp_unit};
use tracing::{debug, instrument};

use crate::analyzer::analyze_text;
use crate::rake::score_phrases;
use crate::tagger::{PosTagger, TaggedSentence};
use crate::text::{split_sentences, title_case, tokenize};

/// Hard cap on concepts per schema.
pub const MAX_NODES: usize = 15;

/// Label for subject-verb-object edges whose sentence has no verb.
const DEFAULT_RELATION: &str = "relates to";

/// Fixed strength of subject-verb-object edges.
const SVO_STRENGTH: f64 = 0.5;

/// A sentence with its token forms precomputed.
struct Sentence {
    text: String,
    tokens: Vec<String>,
    /// Space-padded token string for whole-word phrase lookups.
    padded: String,
}

impl Sentence {
    fn new(text: String) -> Self {
        let tokens = tokenize(&text);
        let padded = format!(" {} ", tokens.join(" "));
        Self {
            text,
            tokens,
            padded,
        }
    }

    fn mentions(&self, normalized_key: &str) -> bool {
        !normalized_key.is_empty() && self.padded.contains(&format!(" {normalized_key} "))
    }
}

/// A keyphrase candidate before it becomes a node.
#[derive(Debug, Clone)]
struct Candidate {
    key: String,
    label: String,
    score: f64,
}

/// Lexical extractor: RAKE + noun phrases + TF-IDF + co-occurrence/SVO edges.
#[derive(Clone)]
pub struct LexicalExtractor {
    tagger: Arc<dyn PosTagger>,
}

impl std::fmt::Debug for LexicalExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LexicalExtractor").finish_non_exhaustive()
    }
}

impl LexicalExtractor {
    pub fn new(tagger: Arc<dyn PosTagger>) -> Self {
        Self { tagger }
    }

    /// Build a fresh schema from `text`.
    ///
    /// Empty or candidate-free text yields [`Schema::empty`]; this never fails.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn extract(&self, text: &str) -> Schema {
        let sentences: Vec<Sentence> = split_sentences(text).into_iter().map(Sentence::new).collect();
        if sentences.is_empty() {
            return Schema::empty();
        }

        let tagged: Vec<TaggedSentence> = sentences.iter().map(|s| self.tagger.tag(&s.text)).collect();

        let candidates = merge_candidates(rake_candidates(&sentences), noun_candidates(&tagged));
        let mut candidates = fuzzy_dedup(candidates);
        if candidates.is_empty() {
            debug!(sentences = sentences.len(), "no keyphrase candidates");
            return Schema::empty();
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(MAX_NODES);

        let weights = tfidf_weights(&candidates, &sentences);
        let nodes: Vec<Node> = candidates
            .iter()
            .zip(&weights)
            .enumerate()
            .map(|(rank, (c, w))| Node::new(format!("t1-{rank}"), title_case(&c.label), *w))
            .collect();

        let keys: Vec<String> = candidates.iter().map(|c| tokenize(&c.key).join(" ")).collect();
        let mut edges = cooccurrence_edges(&nodes, &keys, &sentences);
        svo_edges(&nodes, &candidates, &tagged, &mut edges);

        let kind = analyze_text(text).top_recommendation();
        let title = nodes
            .iter()
            .take(3)
            .map(|n| n.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let description = format!(
            "{} concepts extracted from {} sentences",
            nodes.len(),
            sentences.len()
        );

        let mut schema = Schema {
            kind,
            title,
            description,
            nodes,
            edges,
            ..Schema::empty()
        };
        schema.refresh_metadata();

        debug!(
            nodes = schema.nodes.len(),
            edges = schema.edges.len(),
            kind = %schema.kind,
            "lexical extraction complete"
        );
        schema
    }
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

fn rake_candidates(sentences: &[Sentence]) -> Vec<Candidate> {
    let tokens: Vec<Vec<String>> = sentences.iter().map(|s| s.tokens.clone()).collect();
    score_phrases(&tokens)
        .into_iter()
        .map(|(key, score)| Candidate {
            label: key.clone(),
            key,
            score,
        })
        .collect()
}

/// Noun phrases scored by the number of sentences they appear in.
fn noun_candidates(tagged: &[TaggedSentence]) -> Vec<Candidate> {
    let mut order: Vec<Candidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for sentence in tagged {
        let mut in_sentence: HashSet<String> = HashSet::new();
        for phrase in &sentence.noun_phrases {
            let key = phrase.trim().to_lowercase();
            if key.is_empty() || !in_sentence.insert(key.clone()) {
                continue;
            }
            match index.get(&key) {
                Some(&i) => order[i].score += 1.0,
                None => {
                    index.insert(key.clone(), order.len());
                    order.push(Candidate {
                        key,
                        label: phrase.trim().to_string(),
                        score: 1.0,
                    });
                }
            }
        }
    }

    order
}

/// Union two candidate lists by key, summing scores where both agree.
fn merge_candidates(primary: Vec<Candidate>, secondary: Vec<Candidate>) -> Vec<Candidate> {
    let mut merged = primary;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, c)| (c.key.clone(), i))
        .collect();

    for candidate in secondary {
        match index.get(&candidate.key) {
            Some(&i) => merged[i].score += candidate.score,
            None => {
                index.insert(candidate.key.clone(), merged.len());
                merged.push(candidate);
            }
        }
    }

    merged
}

/// Fold candidates whose key contains, or is contained in, an already-kept key.
///
/// Shorter keys are visited first; the shorter label stays canonical.
fn fuzzy_dedup(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by_key(|c| c.key.len());

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let existing = kept
            .iter_mut()
            .find(|k| k.key.contains(&candidate.key) || candidate.key.contains(&k.key));
        match existing {
            Some(k) => {
                k.score += candidate.score;
                if candidate.label.len() < k.label.len() {
                    k.label = candidate.label;
                    k.key = candidate.key;
                }
            }
            None => kept.push(candidate),
        }
    }

    kept
}

/// TF-IDF per candidate, normalized so the best is 1.0.
///
/// Falls back to normalized candidate scores when every TF-IDF is zero
/// (e.g. single-sentence input, where each phrase occurs in every sentence).
fn tfidf_weights(candidates: &[Candidate], sentences: &[Sentence]) -> Vec<f64> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut total = 0usize;
    for sentence in sentences {
        for token in &sentence.tokens {
            *counts.entry(token.as_str()).or_default() += 1;
            total += 1;
        }
    }
    let n = sentences.len() as f64;

    let raw: Vec<f64> = candidates
        .iter()
        .map(|c| {
            let tokens = tokenize(&c.key);
            let hits: usize = tokens
                .iter()
                .map(|t| counts.get(t.as_str()).copied().unwrap_or(0))
                .sum();
            let tf = if total == 0 { 0.0 } else { hits as f64 / total as f64 };

            let normalized = tokens.join(" ");
            let doc_freq = sentences.iter().filter(|s| s.mentions(&normalized)).count() as f64;
            let idf = ((n + 1.0) / (1.0 + doc_freq)).ln();

            tf * idf
        })
        .collect();

    let max = raw.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        return raw.iter().map(|w| clamp_unit(w / max)).collect();
    }

    let max_score = candidates.iter().map(|c| c.score).fold(0.0_f64, f64::max);
    candidates
        .iter()
        .map(|c| {
            if max_score > 0.0 {
                clamp_unit(c.score / max_score)
            } else {
                1.0
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// One clique per sentence over the nodes it mentions; strength is the
/// pair count over the busiest pair's count.
fn cooccurrence_edges(nodes: &[Node], keys: &[String], sentences: &[Sentence]) -> Vec<Edge> {
    let mut pair_counts: BTreeMap<(usize, usize), u32> = BTreeMap::new();
    for sentence in sentences {
        let present: Vec<usize> = keys
            .iter()
            .enumerate()
            .filter(|(_, key)| sentence.mentions(key))
            .map(|(i, _)| i)
            .collect();
        for (a, &i) in present.iter().enumerate() {
            for &j in &present[a + 1..] {
                *pair_counts.entry((i, j)).or_default() += 1;
            }
        }
    }

    let max = pair_counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }

    pair_counts
        .into_iter()
        .map(|((i, j), count)| {
            Edge::new(&nodes[i].id, &nodes[j].id, f64::from(count) / f64::from(max))
                .with_kind("co-occurrence")
        })
        .collect()
}

/// Link consecutive noun phrases of a sentence through its first verb,
/// skipping pairs that are already connected.
///
/// Noun phrases are matched to nodes by exact lower-cased key, so a concept
/// that RAKE kept under a different surface form is not linked here.
fn svo_edges(
    nodes: &[Node],
    candidates: &[Candidate],
    tagged: &[TaggedSentence],
    edges: &mut Vec<Edge>,
) {
    let index: HashMap<&str, usize> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (c.key.as_str(), i))
        .collect();

    let mut linked: HashSet<(usize, usize)> = HashSet::new();
    for edge in edges.iter() {
        let source = nodes.iter().position(|n| n.id == edge.source);
        let target = nodes.iter().position(|n| n.id == edge.target);
        if let (Some(s), Some(t)) = (source, target) {
            linked.insert((s.min(t), s.max(t)));
        }
    }

    for sentence in tagged {
        let verb = sentence
            .verbs
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_RELATION);

        for pair in sentence.noun_phrases.windows(2) {
            let subject = index.get(pair[0].trim().to_lowercase().as_str()).copied();
            let object = index.get(pair[1].trim().to_lowercase().as_str()).copied();
            let (Some(s), Some(o)) = (subject, object) else {
                continue;
            };
            if s == o || !linked.insert((s.min(o), s.max(o))) {
                continue;
            }
            edges.push(
                Edge::new(&nodes[s].id, &nodes[o].id, SVO_STRENGTH)
                    .with_label(verb)
                    .with_kind("svo"),
            );
        }
    }
}
