//! Progressive three-tier run: lexical, then embedding, then LLM.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use async_stream::stream;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, instrument, warn};
use uuid::Uuid;

use conceptgraph_embedding::{EmbedderHandle, HttpEmbedderConfig, refine};
use conceptgraph_lexical::{HeuristicTagger, LexicalExtractor, PosTagger};
use conceptgraph_semantic::Enricher;
use conceptgraph_shared::{
    AppConfig, ConceptGraphError, Result, Schema, Stage, StageObserver,
};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Which tier produced a result. Serializes as `1`, `2` or `3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Tier {
    Lexical,
    Embedding,
    Semantic,
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> u8 {
        match tier {
            Tier::Lexical => 1,
            Tier::Embedding => 2,
            Tier::Semantic => 3,
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = ConceptGraphError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::Lexical),
            2 => Ok(Self::Embedding),
            3 => Ok(Self::Semantic),
            other => Err(ConceptGraphError::validation(format!(
                "unknown tier {other}: expected 1, 2 or 3"
            ))),
        }
    }
}

/// One tier's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: Tier,
    pub schema: Schema,
}

/// Ordered, lazily-driven per-tier results of one run.
pub type TierStream = Pin<Box<dyn Stream<Item = Result<TierResult>> + Send>>;

// ---------------------------------------------------------------------------
// Stage tracking
// ---------------------------------------------------------------------------

/// Records the runner's current stage and forwards transitions to the
/// caller's observer while the run is still active.
struct StageTracker {
    state: Arc<Mutex<Stage>>,
    observer: Arc<dyn StageObserver>,
    cancel: CancellationToken,
}

impl StageObserver for StageTracker {
    fn stage(&self, stage: Stage) {
        if self.cancel.is_cancelled() {
            return;
        }
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = stage;
        debug!(%stage, "stage");
        self.observer.stage(stage);
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Runs tier 1 always, and tiers 2 and 3 when configured.
///
/// Only one run is active at a time: starting a run cancels the previous
/// one, and [`abort`](Self::abort) cancels the current one. A cancelled run
/// yields nothing further.
pub struct TieredRunner {
    extractor: LexicalExtractor,
    embedding: Option<EmbedderHandle>,
    enrichment: Option<Enricher>,
    active: Mutex<CancellationToken>,
    state: Arc<Mutex<Stage>>,
}

impl std::fmt::Debug for TieredRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredRunner")
            .field("embedding", &self.embedding.is_some())
            .field("enrichment", &self.enrichment.is_some())
            .field("state", &self.state())
            .finish()
    }
}

impl TieredRunner {
    /// Tier-1-only runner.
    pub fn new(tagger: Arc<dyn PosTagger>) -> Self {
        Self {
            extractor: LexicalExtractor::new(tagger),
            embedding: None,
            enrichment: None,
            active: Mutex::new(CancellationToken::new()),
            state: Arc::new(Mutex::new(Stage::Idle)),
        }
    }

    /// Enable tier 2 with a (possibly shared) embedding model handle.
    pub fn with_embedding(mut self, handle: EmbedderHandle) -> Self {
        self.embedding = Some(handle);
        self
    }

    /// Enable tier 3.
    pub fn with_enrichment(mut self, enricher: Enricher) -> Self {
        self.enrichment = Some(enricher);
        self
    }

    /// Build a runner from application config, using the heuristic tagger
    /// and HTTP collaborators for whichever tiers are enabled.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut runner = Self::new(Arc::new(HeuristicTagger));
        if config.embedding.enabled {
            let loader = HttpEmbedderConfig::try_from(&config.embedding)?;
            runner = runner.with_embedding(EmbedderHandle::lazy(Arc::new(loader)));
        }
        if config.llm.enabled {
            runner = runner.with_enrichment(Enricher::from_section(&config.llm)?);
        }
        Ok(runner)
    }

    /// Most recent stage reported by an active run.
    pub fn state(&self) -> Stage {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the current run from yielding anything further.
    pub fn abort(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !active.is_cancelled() {
            info!("aborting active run");
            active.cancel();
        }
    }

    /// Release the embedding model, if one was loaded.
    pub async fn release(&self) -> Result<()> {
        match &self.embedding {
            Some(handle) => handle.release().await,
            None => Ok(()),
        }
    }

    /// Cancel any previous run and hand out a fresh token.
    fn begin(&self) -> CancellationToken {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        active.cancel();
        *active = CancellationToken::new();
        active.clone()
    }

    /// Start a run over `text`.
    ///
    /// Nothing happens until the stream is polled. Each enabled tier yields
    /// one result in order 1, 2, 3. An embedding failure yields one `Err`
    /// and ends the stream; LLM failures never surface.
    #[instrument(skip_all, fields(chars = text.len()))]
    pub fn run(&self, text: String, observer: Arc<dyn StageObserver>) -> TierStream {
        let cancel = self.begin();
        let extractor = self.extractor.clone();
        let embedding = self.embedding.clone();
        let enrichment = self.enrichment.clone();
        let tracker = StageTracker {
            state: Arc::clone(&self.state),
            observer,
            cancel: cancel.clone(),
        };

        let run_id = Uuid::now_v7();
        let span = info_span!("run", %run_id);
        info!(%run_id, tier2 = embedding.is_some(), tier3 = enrichment.is_some(), "run started");

        Box::pin(stream! {
            // Tier 1
            let start = Instant::now();
            tracker.stage(Stage::Tier1Extracting);
            let mut schema = span.in_scope(|| extractor.extract(&text));
            tracker.stage(Stage::Tier1Complete);
            if cancel.is_cancelled() {
                return;
            }
            span.in_scope(|| info!(
                nodes = schema.nodes.len(),
                edges = schema.edges.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "tier 1 complete"
            ));
            yield Ok(TierResult { tier: Tier::Lexical, schema: schema.clone() });

            // Tier 2
            if let Some(handle) = embedding {
                if cancel.is_cancelled() {
                    return;
                }
                let start = Instant::now();
                tracker.stage(Stage::Tier2Embedding);
                let refined = match handle.get().instrument(span.clone()).await {
                    Ok(embedder) => {
                        refine(schema.clone(), embedder.as_ref(), &cancel, &tracker)
                            .instrument(span.clone())
                            .await
                    }
                    Err(e) => Err(e),
                };
                match refined {
                    Ok(refined) => schema = refined,
                    Err(e) => {
                        span.in_scope(|| warn!(error = %e, "tier 2 failed, ending run"));
                        yield Err(e);
                        return;
                    }
                }
                if cancel.is_cancelled() {
                    return;
                }
                tracker.stage(Stage::Tier2Complete);
                span.in_scope(|| info!(
                    edges = schema.edges.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "tier 2 complete"
                ));
                yield Ok(TierResult { tier: Tier::Embedding, schema: schema.clone() });
            }

            // Tier 3
            if let Some(enricher) = enrichment {
                if cancel.is_cancelled() {
                    return;
                }
                let start = Instant::now();
                tracker.stage(Stage::Tier3Enriching);
                schema = enricher.enrich(schema).instrument(span.clone()).await;
                if cancel.is_cancelled() {
                    return;
                }
                tracker.stage(Stage::Tier3Complete);
                span.in_scope(|| info!(
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "tier 3 complete"
                ));
                yield Ok(TierResult { tier: Tier::Semantic, schema: schema.clone() });
            }

            tracker.stage(Stage::Complete);
        })
    }
}
