//! OpenAI-compatible `/embeddings` client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conceptgraph_shared::{ConceptGraphError, EmbeddingSection, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::embedder::{Embedder, EmbedderLoader};

/// User-Agent string for embedding requests.
const USER_AGENT: &str = concat!("ConceptGraph/", env!("CARGO_PKG_VERSION"));

/// Runtime embedding endpoint configuration.
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    /// Base URL; requests go to `<endpoint>/embeddings`.
    pub endpoint: Url,
    pub model: String,
    pub timeout_secs: u64,
}

impl TryFrom<&EmbeddingSection> for HttpEmbedderConfig {
    type Error = ConceptGraphError;

    fn try_from(section: &EmbeddingSection) -> Result<Self> {
        let endpoint = Url::parse(&section.endpoint).map_err(|e| {
            ConceptGraphError::config(format!(
                "invalid embedding endpoint '{}': {e}",
                section.endpoint
            ))
        })?;
        Ok(Self {
            endpoint,
            model: section.model.clone(),
            timeout_secs: section.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbedderLoader for HttpEmbedderConfig {
    async fn load(&self) -> Result<Arc<dyn Embedder>> {
        Ok(Arc::new(HttpEmbedder::new(self.clone())?))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

/// Embedding model reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    url: String,
    model: String,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConceptGraphError::Network(format!("client build: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", config.endpoint.as_str().trim_end_matches('/')),
            model: config.model,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[instrument(skip_all, fields(model = %self.model, inputs = texts.len()))]
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.url)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| ConceptGraphError::Network(format!("{}: {e}", self.url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConceptGraphError::Embedding(format!(
                "{}: HTTP {status}",
                self.url
            )));
        }

        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ConceptGraphError::Embedding(format!("invalid response body: {e}")))?;

        if body.data.len() != texts.len() {
            return Err(ConceptGraphError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                body.data.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        debug!(vectors = body.data.len(), "embeddings received");
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> HttpEmbedderConfig {
        HttpEmbedderConfig {
            endpoint: Url::parse(&format!("{}/v1", server.uri())).unwrap(),
            model: "test-embed".into(),
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn embeds_in_index_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "test-embed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(config_for(&server)).unwrap();
        let vectors = embedder
            .embed(&["alpha".into(), "beta".into()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn server_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(config_for(&server)).unwrap();
        let err = embedder.embed(&["alpha".into()]).await.unwrap_err();
        assert!(matches!(err, ConceptGraphError::Embedding(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn vector_count_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0], "index": 0}]
            })))
            .mount(&server)
            .await;

        let embedder = HttpEmbedder::new(config_for(&server)).unwrap();
        let err = embedder
            .embed(&["alpha".into(), "beta".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 2 vectors, got 1"));
    }

    #[tokio::test]
    async fn empty_input_skips_request() {
        // No mock mounted: any request would fail.
        let server = MockServer::start().await;
        let embedder = HttpEmbedder::new(config_for(&server)).unwrap();
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn loader_builds_embedder() {
        let server = MockServer::start().await;
        let loader = config_for(&server);
        assert!(loader.load().await.is_ok());
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let section = EmbeddingSection {
            endpoint: "not a url".into(),
            ..EmbeddingSection::default()
        };
        let err = HttpEmbedderConfig::try_from(&section).unwrap_err();
        assert!(matches!(err, ConceptGraphError::Config { .. }));
    }
}
