//! Signal-word archetype analysis.
//!
//! Each specific archetype has a fixed list of signal phrases. A phrase
//! counts once if it appears anywhere in the lower-cased text (plain
//! substring match, no word boundaries). Three distinct hits saturate the
//! score at 1.0. The general archetype is the inverse of the strongest
//! specific signal, floored at 0.3.

use conceptgraph_shared::Archetype;
use serde::Serialize;

/// Distinct hits needed for a score of 1.0.
const SATURATION_HITS: f64 = 3.0;

/// Lowest score the general archetype can have.
const GENERAL_FLOOR: f64 = 0.3;

const SEQUENTIAL_SIGNALS: &[&str] = &[
    "first",
    "then",
    "next",
    "after that",
    "finally",
    "step",
    "followed by",
    "subsequently",
    "before",
    "afterwards",
    "lastly",
    "begin",
    "process",
];

const HIERARCHICAL_SIGNALS: &[&str] = &[
    "consists of",
    "composed of",
    "contains",
    "includes",
    "is a type of",
    "kind of",
    "category",
    "categories",
    "subcategor",
    "parent",
    "child",
    "branch",
    "hierarchy",
    "belongs to",
    "level",
];

const COMPARATIVE_SIGNALS: &[&str] = &[
    "compared to",
    "versus",
    " vs ",
    "whereas",
    "in contrast",
    "unlike",
    "similar to",
    "difference",
    "differ",
    "on the other hand",
    "better than",
    "worse than",
    "while",
    "alternatively",
];

const CYCLICAL_SIGNALS: &[&str] = &[
    "cycle",
    "repeat",
    "loop",
    "recur",
    "iteration",
    "iterate",
    "again",
    "continuous",
    "feedback",
    "round",
    "periodic",
];

const CAUSAL_SIGNALS: &[&str] = &[
    "because",
    "therefore",
    "leads to",
    "results in",
    "causes",
    "caused by",
    "due to",
    "as a result",
    "consequently",
    "effect",
    "impact",
    "hence",
    "thus",
];

/// Score in `[0, 1]` for each archetype.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArchetypeScores {
    pub sequential: f64,
    pub hierarchical: f64,
    pub comparative: f64,
    pub cyclical: f64,
    pub causal: f64,
    pub general: f64,
}

impl ArchetypeScores {
    pub fn score(&self, archetype: Archetype) -> f64 {
        match archetype {
            Archetype::Sequential => self.sequential,
            Archetype::Hierarchical => self.hierarchical,
            Archetype::Comparative => self.comparative,
            Archetype::Cyclical => self.cyclical,
            Archetype::Causal => self.causal,
            Archetype::General => self.general,
        }
    }

    /// The highest-scoring archetype. Ties go to the earlier entry of
    /// [`Archetype::ALL`]; general wins when nothing beats it.
    pub fn top_recommendation(&self) -> Archetype {
        let mut best = Archetype::General;
        let mut best_score = self.general;
        for archetype in Archetype::ALL {
            let score = self.score(archetype);
            if score > best_score {
                best = archetype;
                best_score = score;
            }
        }
        best
    }
}

/// Score `text` against every archetype.
pub fn analyze_text(text: &str) -> ArchetypeScores {
    let lower = text.to_lowercase();

    let sequential = density(&lower, SEQUENTIAL_SIGNALS);
    let hierarchical = density(&lower, HIERARCHICAL_SIGNALS);
    let comparative = density(&lower, COMPARATIVE_SIGNALS);
    let cyclical = density(&lower, CYCLICAL_SIGNALS);
    let causal = density(&lower, CAUSAL_SIGNALS);

    let strongest = [sequential, hierarchical, comparative, cyclical, causal]
        .into_iter()
        .fold(0.0_f64, f64::max);

    ArchetypeScores {
        sequential,
        hierarchical,
        comparative,
        cyclical,
        causal,
        general: (1.0 - strongest).max(GENERAL_FLOOR),
    }
}

fn density(lower: &str, signals: &[&str]) -> f64 {
    let hits = signals.iter().filter(|s| lower.contains(*s)).count();
    (hits as f64 / SATURATION_HITS).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEPS: &str = "First, gather the requirements. Then, design the solution. \
        Next, implement the code. After that, test the code. Finally, deploy to production.";

    #[test]
    fn three_sequential_signals_saturate() {
        let scores = analyze_text("First we mix. Then we bake. Next we serve.");
        assert_eq!(scores.sequential, 1.0);
    }

    #[test]
    fn no_signals_means_pure_general() {
        let scores = analyze_text("Cats and dogs are popular pets.");
        assert_eq!(scores.general, 1.0);
        for archetype in &Archetype::ALL[..5] {
            assert_eq!(scores.score(*archetype), 0.0, "{archetype}");
        }
        assert_eq!(scores.top_recommendation(), Archetype::General);
    }

    #[test]
    fn general_never_drops_below_floor() {
        let scores = analyze_text(STEPS);
        assert_eq!(scores.general, GENERAL_FLOOR);
    }

    #[test]
    fn partial_density() {
        let scores = analyze_text("The flood happened because of the rain.");
        assert!((scores.causal - 1.0 / 3.0).abs() < 1e-12);
        assert!((scores.general - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(scores.top_recommendation(), Archetype::General);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let scores = analyze_text("FEEDBACK loops recur.");
        assert_eq!(scores.cyclical, 1.0);
    }

    #[test]
    fn steps_recommend_sequential() {
        assert_eq!(analyze_text(STEPS).top_recommendation(), Archetype::Sequential);
    }

    #[test]
    fn empty_text_is_general() {
        let scores = analyze_text("");
        assert_eq!(scores.general, 1.0);
        assert_eq!(scores.top_recommendation(), Archetype::General);
    }

    #[test]
    fn scores_serialize_by_name() {
        let json = serde_json::to_value(analyze_text(STEPS)).expect("serialize");
        assert_eq!(json["sequential"], 1.0);
    }
}
