//! Pipeline stages and the observer that is told about them.

use serde::{Deserialize, Serialize};

/// A named checkpoint in a tiered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[default]
    Idle,
    Tier1Extracting,
    Tier1Complete,
    Tier2Embedding,
    Tier2Clustering,
    Tier2Complete,
    Tier3Enriching,
    Tier3Complete,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Tier1Extracting => "tier1-extracting",
            Self::Tier1Complete => "tier1-complete",
            Self::Tier2Embedding => "tier2-embedding",
            Self::Tier2Clustering => "tier2-clustering",
            Self::Tier2Complete => "tier2-complete",
            Self::Tier3Enriching => "tier3-enriching",
            Self::Tier3Complete => "tier3-complete",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives stage transitions synchronously, in order, once each.
pub trait StageObserver: Send + Sync {
    fn stage(&self, stage: Stage);
}

impl<F> StageObserver for F
where
    F: Fn(Stage) + Send + Sync,
{
    fn stage(&self, stage: Stage) {
        self(stage)
    }
}

/// No-op observer for headless/test usage.
pub struct SilentObserver;

impl StageObserver for SilentObserver {
    fn stage(&self, _stage: Stage) {}
}
