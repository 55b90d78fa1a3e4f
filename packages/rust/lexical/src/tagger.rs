//! Noun-phrase / verb extraction.
//!
//! Part-of-speech tagging is a collaborator: anything implementing
//! [`PosTagger`] can be plugged into the extractor. [`HeuristicTagger`] is
//! a small rule-based default good enough for short expository text.

use crate::text::is_stopword;

/// Tagger output for one sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaggedSentence {
    /// Noun phrases in sentence order, original casing.
    pub noun_phrases: Vec<String>,
    /// Verbs in sentence order.
    pub verbs: Vec<String>,
}

/// Extracts noun phrases and verbs from a single sentence.
pub trait PosTagger: Send + Sync {
    fn tag(&self, sentence: &str) -> TaggedSentence;
}

/// Longest noun phrase the heuristic tagger emits.
const MAX_PHRASE_WORDS: usize = 3;

const VERB_LEXICON: &[&str] = &[
    "absorb", "absorbs", "affect", "affects", "allow", "allows", "become", "becomes", "build",
    "builds", "cause", "causes", "change", "changes", "connect", "connects", "contain",
    "contains", "convert", "converts", "create", "creates", "depend", "depends", "deploy",
    "deploys", "design", "designs", "drive", "drives", "eat", "eats", "enable", "enables",
    "feed", "feeds", "form", "forms", "gather", "gathers", "generate", "generates", "get",
    "gets", "give", "gives", "go", "goes", "grow", "grows", "has", "have", "help", "helps",
    "implement", "implements", "include", "includes", "increase", "increases", "is", "are",
    "was", "were", "lead", "leads", "make", "makes", "made", "move", "moves", "need", "needs",
    "produce", "produces", "provide", "provides", "reduce", "reduces", "release", "releases",
    "require", "requires", "run", "runs", "send", "sends", "store", "stores", "support",
    "supports", "take", "takes", "test", "tests", "turn", "turns", "use", "uses",
];

const VERB_SUFFIXES: &[&str] = &["ize", "ise", "ify", "izes", "ises", "ifies"];

/// Rule-based tagger: lexicon + suffix verbs, stop-word-delimited noun runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTagger;

impl HeuristicTagger {
    fn is_verb(lower: &str) -> bool {
        VERB_LEXICON.contains(&lower)
            || VERB_SUFFIXES.iter().any(|s| lower.len() > s.len() + 2 && lower.ends_with(s))
            || (lower.len() > 4 && lower.ends_with("ed"))
    }

    fn push_word(word: &str, run: &mut Vec<String>, tagged: &mut TaggedSentence) {
        let lower = word.to_lowercase();
        if Self::is_verb(&lower) {
            tagged.verbs.push(lower);
            flush(run, &mut tagged.noun_phrases);
        } else if lower.chars().count() > 1
            && !is_stopword(&lower)
            && !lower.chars().all(|c| c.is_ascii_digit())
        {
            run.push(word.to_string());
        } else {
            flush(run, &mut tagged.noun_phrases);
        }
    }
}

/// Same word alphabet as [`crate::tokenize`].
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '-'
}

fn flush(run: &mut Vec<String>, out: &mut Vec<String>) {
    for chunk in run.chunks(MAX_PHRASE_WORDS) {
        out.push(chunk.join(" "));
    }
    run.clear();
}

impl PosTagger for HeuristicTagger {
    fn tag(&self, sentence: &str) -> TaggedSentence {
        let mut tagged = TaggedSentence::default();
        let mut run: Vec<String> = Vec::new();

        for raw in sentence.split_whitespace() {
            // Trailing punctuation ends a phrase even when the next word is a noun.
            let ends_clause = raw.ends_with([',', ';', ':', '.', '!', '?', ')']);

            // Separators inside a token (`/`, `&`, `+`, dashes) break the phrase.
            let mut pieces = raw
                .split(|c: char| !is_word_char(c))
                .map(|p| p.trim_matches(|c| c == '\'' || c == '-'))
                .filter(|p| !p.is_empty());

            match pieces.next() {
                Some(first) => Self::push_word(first, &mut run, &mut tagged),
                None => flush(&mut run, &mut tagged.noun_phrases),
            }
            for piece in pieces {
                flush(&mut run, &mut tagged.noun_phrases);
                Self::push_word(piece, &mut run, &mut tagged);
            }

            if ends_clause {
                flush(&mut run, &mut tagged.noun_phrases);
            }
        }
        flush(&mut run, &mut tagged.noun_phrases);

        tagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    #[test]
    fn extracts_nouns_and_verbs_in_order() {
        let tagged = HeuristicTagger.tag("Plants absorb sunlight and release oxygen.");
        assert_eq!(tagged.noun_phrases, vec!["Plants", "sunlight", "oxygen"]);
        assert_eq!(tagged.verbs, vec!["absorb", "release"]);
    }

    #[test]
    fn adjacent_nouns_form_one_phrase() {
        let tagged = HeuristicTagger.tag("The solar panel feeds the battery bank");
        assert_eq!(tagged.noun_phrases, vec!["solar panel", "battery bank"]);
        assert_eq!(tagged.verbs, vec!["feeds"]);
    }

    #[test]
    fn punctuation_splits_phrases() {
        let tagged = HeuristicTagger.tag("Wind, water, sunlight");
        assert_eq!(tagged.noun_phrases, vec!["Wind", "water", "sunlight"]);
    }

    #[test]
    fn long_runs_are_chunked() {
        let tagged = HeuristicTagger.tag("alpha beta gamma delta");
        assert_eq!(tagged.noun_phrases, vec!["alpha beta gamma", "delta"]);
    }

    #[test]
    fn suffix_verbs_and_numbers() {
        let tagged = HeuristicTagger.tag("Engineers optimize 42 engines");
        assert_eq!(tagged.verbs, vec!["optimize"]);
        assert_eq!(tagged.noun_phrases, vec!["Engineers", "engines"]);
    }

    #[test]
    fn inner_separators_split_words() {
        let tagged = HeuristicTagger.tag("Input/output devices feed the CPU");
        assert_eq!(tagged.noun_phrases, vec!["Input", "output devices", "CPU"]);
        assert_eq!(tagged.verbs, vec!["feed"]);

        let tagged = HeuristicTagger.tag("Supply—demand curves shift");
        assert_eq!(tagged.noun_phrases, vec!["Supply", "demand curves shift"]);
    }

    #[test]
    fn phrase_words_match_tokenizer() {
        for sentence in [
            "Input/output devices feed the CPU",
            "Supply—demand curves shift",
            "cause&effect chains",
            "Heat+pressure forms rock",
        ] {
            let tokens = tokenize(sentence);
            for phrase in HeuristicTagger.tag(sentence).noun_phrases {
                for word in tokenize(&phrase) {
                    assert!(tokens.contains(&word), "{word:?} not in {sentence:?}");
                }
            }
        }
    }

    #[test]
    fn empty_sentence() {
        assert_eq!(HeuristicTagger.tag(""), TaggedSentence::default());
    }
}
