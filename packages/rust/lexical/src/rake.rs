//! RAKE (Rapid Automatic Keyword Extraction) phrase scoring.

use std::collections::{HashMap, HashSet};

use crate::text::is_stopword;

/// Score every distinct stop-word-delimited phrase across `sentences`.
///
/// Each sentence is an already-tokenized word list. A word's degree is the
/// number of other words it shares phrases with, summed over every phrase
/// occurrence; its score is `(degree + freq) / freq`. A phrase scores the
/// sum of its words' scores. Phrases come back in first-seen order.
pub(crate) fn score_phrases(sentences: &[Vec<String>]) -> Vec<(String, f64)> {
    let mut occurrences: Vec<Vec<&str>> = Vec::new();
    for tokens in sentences {
        let mut run: Vec<&str> = Vec::new();
        for token in tokens {
            if is_stopword(token) {
                if !run.is_empty() {
                    occurrences.push(std::mem::take(&mut run));
                }
            } else {
                run.push(token);
            }
        }
        if !run.is_empty() {
            occurrences.push(run);
        }
    }

    let mut freq: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();
    for phrase in &occurrences {
        let others = (phrase.len() - 1) as f64;
        for &word in phrase {
            *freq.entry(word).or_default() += 1.0;
            *degree.entry(word).or_default() += others;
        }
    }

    let word_score = |word: &str| -> f64 {
        let f = freq.get(word).copied().unwrap_or(1.0);
        let d = degree.get(word).copied().unwrap_or(0.0);
        (d + f) / f
    };

    let mut seen: HashSet<String> = HashSet::new();
    let mut scored: Vec<(String, f64)> = Vec::new();
    for phrase in &occurrences {
        let key = phrase.join(" ");
        if !seen.insert(key.clone()) {
            continue;
        }
        let score = phrase.iter().map(|w| word_score(w)).sum();
        scored.push((key, score));
    }

    scored
}
