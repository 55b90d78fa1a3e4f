//! Tier 2: semantic edge blending, theme clustering, centrality weighting.

use std::collections::{HashMap, HashSet};

use conceptgraph_shared::{
    ConceptGraphError, Edge, Result, Schema, Stage, StageObserver, clamp_unit,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::embedder::Embedder;
use crate::kmeans::{cluster_count, kmeans};
use crate::similarity::similarity_matrix;

/// Similarity above which an unlinked pair gets a new edge.
pub const SYNTHESIS_THRESHOLD: f64 = 0.5;

/// Edges weaker than this are dropped after blending.
pub const EDGE_FLOOR: f64 = 0.2;

/// Share of the prior strength kept when blending in similarity.
const STRENGTH_BLEND: f64 = 0.5;

/// Share of the prior weight kept when blending in degree centrality.
const WEIGHT_BLEND: f64 = 0.6;

/// Refine `schema` with embeddings of its node labels.
///
/// Returns `schema` untouched when it has no nodes, or when `cancel` fires
/// while the embedding request is in flight. Embedding failures propagate.
#[instrument(skip_all, fields(nodes = schema.nodes.len(), edges = schema.edges.len()))]
pub async fn refine(
    schema: Schema,
    embedder: &dyn Embedder,
    cancel: &CancellationToken,
    observer: &dyn StageObserver,
) -> Result<Schema> {
    if schema.is_empty() {
        return Ok(schema);
    }

    let labels: Vec<String> = schema.nodes.iter().map(|n| n.label.clone()).collect();
    let vectors = embedder.embed(&labels).await?;
    if cancel.is_cancelled() {
        debug!("cancelled after embedding, returning input schema");
        return Ok(schema);
    }
    if vectors.len() != labels.len() {
        return Err(ConceptGraphError::Embedding(format!(
            "expected {} vectors, got {}",
            labels.len(),
            vectors.len()
        )));
    }

    observer.stage(Stage::Tier2Clustering);

    let similarity = similarity_matrix(&vectors);
    let k = cluster_count(vectors.len());
    let clusters = kmeans(&vectors, k);

    let mut refined = schema.clone();
    for (node, cluster) in refined.nodes.iter_mut().zip(&clusters) {
        node.theme = Some(format!("cluster-{cluster}"));
    }

    let index: HashMap<&str, usize> = schema
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    refined.edges = blend_edges(&schema, &index, &similarity);
    reweight_by_degree(&mut refined, &index);
    refined.refresh_metadata();

    info!(
        clusters = k.min(vectors.len()),
        edges = refined.edges.len(),
        "embedding refinement complete"
    );
    Ok(refined)
}

/// Blend existing edges with similarity, synthesize strongly similar pairs,
/// then drop everything under [`EDGE_FLOOR`].
fn blend_edges(schema: &Schema, index: &HashMap<&str, usize>, similarity: &[Vec<f64>]) -> Vec<Edge> {
    let mut linked: HashSet<(usize, usize)> = HashSet::new();
    let mut edges: Vec<Edge> = Vec::with_capacity(schema.edges.len());

    for edge in &schema.edges {
        let mut edge = edge.clone();
        let source = index.get(edge.source.as_str()).copied();
        let target = index.get(edge.target.as_str()).copied();
        if let (Some(s), Some(t)) = (source, target) {
            let sim = similarity[s][t].max(0.0);
            edge.strength =
                clamp_unit(STRENGTH_BLEND * edge.strength + (1.0 - STRENGTH_BLEND) * sim);
            linked.insert((s.min(t), s.max(t)));
        }
        edges.push(edge);
    }

    let n = schema.nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            if linked.contains(&(i, j)) {
                continue;
            }
            let sim = similarity[i][j];
            if sim > SYNTHESIS_THRESHOLD {
                edges.push(
                    Edge::new(&schema.nodes[i].id, &schema.nodes[j].id, sim).with_kind("semantic"),
                );
            }
        }
    }

    edges.retain(|e| e.strength >= EDGE_FLOOR);
    edges
}

/// `weight = 0.6 * weight + 0.4 * degree / max_degree` over surviving edges.
fn reweight_by_degree(schema: &mut Schema, index: &HashMap<&str, usize>) {
    let mut degree = vec![0usize; schema.nodes.len()];
    for edge in &schema.edges {
        if let Some(&s) = index.get(edge.source.as_str()) {
            degree[s] += 1;
        }
        if let Some(&t) = index.get(edge.target.as_str()) {
            degree[t] += 1;
        }
    }

    let max_degree = degree.iter().copied().max().unwrap_or(0);
    for (node, d) in schema.nodes.iter_mut().zip(degree) {
        let centrality = if max_degree == 0 {
            0.0
        } else {
            d as f64 / max_degree as f64
        };
        node.weight = clamp_unit(WEIGHT_BLEND * node.weight + (1.0 - WEIGHT_BLEND) * centrality);
    }
}
