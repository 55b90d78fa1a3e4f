//! Sentence splitting, tokenization, and the English stop-word list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Split text into trimmed, non-empty sentences.
///
/// Sentence ends are runs of `.`, `!`, or `?` followed by whitespace (or
/// the end of input), plus line breaks.
pub fn split_sentences(text: &str) -> Vec<String> {
    static SENTENCE_END_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)|\n+").expect("valid regex"));

    SENTENCE_END_RE
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Lower-case and split into word tokens.
///
/// Anything that is not a letter, digit, apostrophe, or hyphen separates
/// tokens. Leading/trailing apostrophes and hyphens are trimmed and tokens
/// of one character or less are dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(|t| t.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|t| t.chars().count() > 1)
        .map(String::from)
        .collect()
}

/// Capitalize the first letter of every word.
pub fn title_case(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for common English function words.
pub(crate) fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(word)
}

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
        "during", "each", "either", "else", "etc", "even", "ever", "every", "few", "finally",
        "first", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
        "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into",
        "is", "it", "it's", "its", "itself", "just", "last", "lastly", "least", "less", "let",
        "like", "many", "may", "me", "might", "more", "most", "much", "must", "my", "myself",
        "neither", "next", "no", "nor", "not", "now", "of", "off", "often", "on", "once",
        "only", "or", "other", "others", "our", "ours", "ourselves", "out", "over", "own",
        "per", "rather", "same", "second", "shall", "she", "should", "since", "so", "some",
        "such", "than", "that", "that's", "the", "their", "theirs", "them", "themselves",
        "then", "there", "these", "they", "third", "this", "those", "though", "through",
        "thus", "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
        "well", "were", "what", "when", "where", "whether", "which", "while", "who", "whom",
        "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
        "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminators_and_newlines() {
        let sentences = split_sentences("One fish. Two fish!  Red fish?\nBlue fish");
        assert_eq!(sentences, vec!["One fish", "Two fish", "Red fish", "Blue fish"]);
    }

    #[test]
    fn decimal_points_do_not_split() {
        assert_eq!(split_sentences("Pi is 3.14 roughly.").len(), 1);
    }

    #[test]
    fn blank_text_has_no_sentences() {
        assert!(split_sentences("   \n\n ").is_empty());
    }

    #[test]
    fn tokenize_strips_punctuation_and_short_tokens() {
        let tokens = tokenize("A well-known (cat's) toy, x 42!");
        assert_eq!(tokens, vec!["well-known", "cat's", "toy", "42"]);
    }

    #[test]
    fn tokenize_trims_quote_marks() {
        assert_eq!(tokenize("'quoted' -dash-"), vec!["quoted", "dash"]);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("solar panel array"), "Solar Panel Array");
        assert_eq!(title_case("eBay"), "EBay");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn stopwords() {
        assert!(is_stopword("the"));
        assert!(is_stopword("then"));
        assert!(!is_stopword("photosynthesis"));
    }
}
