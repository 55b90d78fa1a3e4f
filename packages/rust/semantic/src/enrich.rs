//! Tier 3: LLM enrichment of themes, roles, edge labels, and descriptions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use conceptgraph_shared::{
    ConceptGraphError, EnrichmentLevel, LlmSection, Result, Schema, resolve_api_key,
};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::chat::{ChatModel, ChatRequest, HttpChatModel};
use crate::prompts::{
    description_prompt, edge_key, edge_prompt, parse_object, role_prompt, string_entries,
    theme_prompt,
};

/// Theme key for nodes that have no theme yet (tier 2 skipped).
pub const UNTHEMED_KEY: &str = "unthemed";

/// Runtime tier 3 configuration.
#[derive(Debug, Clone)]
pub struct Tier3Config {
    pub endpoint: Url,
    pub model: String,
    pub level: EnrichmentLevel,
    /// Role vocabulary; `None` or empty skips the role prompt.
    pub roles: Option<Vec<String>>,
    pub guidance: Option<String>,
}

impl TryFrom<&LlmSection> for Tier3Config {
    type Error = ConceptGraphError;

    fn try_from(section: &LlmSection) -> Result<Self> {
        let endpoint = Url::parse(&section.endpoint).map_err(|e| {
            ConceptGraphError::config(format!("invalid llm endpoint '{}': {e}", section.endpoint))
        })?;
        Ok(Self {
            endpoint,
            model: section.model.clone(),
            level: section.level,
            roles: section.roles.clone(),
            guidance: section.guidance.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Aspect {
    Themes,
    Roles,
    EdgeLabels,
    Descriptions,
}

impl Aspect {
    fn as_str(self) -> &'static str {
        match self {
            Self::Themes => "themes",
            Self::Roles => "roles",
            Self::EdgeLabels => "edge-labels",
            Self::Descriptions => "descriptions",
        }
    }
}

/// Tier 3: names themes, classifies roles, labels edges, and describes
/// nodes through a chat model.
#[derive(Clone)]
pub struct Enricher {
    chat: Arc<dyn ChatModel>,
    config: Tier3Config,
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Enricher {
    pub fn new(chat: Arc<dyn ChatModel>, config: Tier3Config) -> Self {
        Self { chat, config }
    }

    /// Build an enricher backed by [`HttpChatModel`] from the `[llm]` section.
    pub fn from_section(section: &LlmSection) -> Result<Self> {
        let config = Tier3Config::try_from(section)?;
        let chat = HttpChatModel::new(section.timeout_secs, resolve_api_key(section))?;
        Ok(Self::new(Arc::new(chat), config))
    }

    /// Enrich `schema`. Never fails: a prompt that errors or returns
    /// something other than a JSON object contributes nothing.
    #[instrument(skip_all, fields(nodes = schema.nodes.len(), level = ?self.config.level))]
    pub async fn enrich(&self, schema: Schema) -> Schema {
        if schema.is_empty() {
            return schema;
        }

        let labels: Vec<String> = schema.nodes.iter().map(|n| n.label.clone()).collect();
        let edge_keys = edge_keys(&schema);

        let themes_prompt = Some(theme_prompt(&theme_groups(&schema)));
        let roles_prompt = self
            .config
            .roles
            .as_deref()
            .filter(|roles| !roles.is_empty())
            .map(|roles| role_prompt(&labels, roles, self.config.guidance.as_deref()));
        let edges_prompt = (!edge_keys.is_empty()).then(|| edge_prompt(&edge_keys));
        let details_prompt = (self.config.level == EnrichmentLevel::Full)
            .then(|| description_prompt(&labels, &schema.title));

        let (themes, roles, edge_labels, descriptions) = tokio::join!(
            self.ask(Aspect::Themes, themes_prompt),
            self.ask(Aspect::Roles, roles_prompt),
            self.ask(Aspect::EdgeLabels, edges_prompt),
            self.ask(Aspect::Descriptions, details_prompt),
        );

        let mut enriched = schema;

        if let Some(names) = themes {
            for node in &mut enriched.nodes {
                let key = node.theme.as_deref().unwrap_or(UNTHEMED_KEY);
                if let Some(name) = names.get(key) {
                    node.theme = Some(name.clone());
                }
            }
        }

        if let Some(roles) = roles {
            for node in &mut enriched.nodes {
                if let Some(role) = roles.get(&node.label) {
                    node.mode_role = Some(role.clone());
                }
            }
        }

        let mut relabeled = false;
        if let Some(labels) = edge_labels {
            let by_id: HashMap<String, String> = enriched
                .nodes
                .iter()
                .map(|n| (n.id.clone(), n.label.clone()))
                .collect();
            for edge in &mut enriched.edges {
                let (Some(source), Some(target)) = (by_id.get(&edge.source), by_id.get(&edge.target))
                else {
                    continue;
                };
                if let Some(label) = labels.get(&edge_key(source, target)) {
                    edge.label = Some(label.clone());
                    relabeled = true;
                }
            }
        }

        if let Some(details) = descriptions {
            for node in &mut enriched.nodes {
                if let Some(text) = details.get(&node.label) {
                    node.details = Some(text.clone());
                }
            }
        }

        if relabeled {
            enriched.refresh_metadata();
        }

        info!("semantic enrichment complete");
        enriched
    }

    async fn ask(
        &self,
        aspect: Aspect,
        prompt: Option<String>,
    ) -> Option<HashMap<String, String>> {
        let prompt = prompt?;
        let request = ChatRequest {
            endpoint: &self.config.endpoint,
            model: &self.config.model,
            prompt: &prompt,
        };

        let parsed = self
            .chat
            .complete(request)
            .await
            .and_then(|reply| parse_object(&reply));

        match parsed {
            Ok(map) => {
                let entries = string_entries(map);
                debug!(aspect = aspect.as_str(), entries = entries.len(), "enrichment reply parsed");
                Some(entries)
            }
            Err(e) => {
                warn!(aspect = aspect.as_str(), error = %e, "enrichment prompt dropped");
                None
            }
        }
    }
}

/// Node labels grouped by current theme key.
fn theme_groups(schema: &Schema) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for node in &schema.nodes {
        let key = node.theme.as_deref().unwrap_or(UNTHEMED_KEY);
        groups.entry(key.to_string()).or_default().push(node.label.clone());
    }
    groups
}

/// `"Source→Target"` keys for every edge whose endpoints exist.
fn edge_keys(schema: &Schema) -> Vec<String> {
    let mut keys: Vec<String> = schema
        .edges
        .iter()
        .filter_map(|e| {
            let source = schema.node(&e.source)?;
            let target = schema.node(&e.target)?;
            Some(edge_key(&source.label, &target.label))
        })
        .collect();
    keys.dedup();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conceptgraph_shared::{Edge, Node};
    use std::sync::Mutex;

    /// Replies by prompt kind; `None` means that prompt fails.
    #[derive(Default)]
    struct ScriptedChat {
        themes: Option<&'static str>,
        roles: Option<&'static str>,
        edges: Option<&'static str>,
        descriptions: Option<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
            self.seen.lock().unwrap().push(request.prompt.to_string());
            let reply = if request.prompt.contains("theme name") {
                self.themes
            } else if request.prompt.contains("Classify") {
                self.roles
            } else if request.prompt.contains("relationship between") {
                self.edges
            } else if request.prompt.contains("one-sentence description") {
                self.descriptions
            } else {
                None
            };
            reply
                .map(str::to_string)
                .ok_or_else(|| ConceptGraphError::Llm("unavailable".into()))
        }
    }

    fn config(level: EnrichmentLevel, roles: Option<Vec<&str>>) -> Tier3Config {
        Tier3Config {
            endpoint: Url::parse("http://localhost:11434/v1").unwrap(),
            model: "test".into(),
            level,
            roles: roles.map(|r| r.into_iter().map(String::from).collect()),
            guidance: None,
        }
    }

    fn tier2_schema() -> Schema {
        let mut sun = Node::new("t1-0", "Sun", 1.0);
        sun.theme = Some("cluster-0".into());
        let mut star = Node::new("t1-1", "Star", 0.8);
        star.theme = Some("cluster-0".into());
        let mut ocean = Node::new("t1-2", "Ocean", 0.5);
        ocean.theme = Some("cluster-1".into());
        let mut schema = Schema {
            title: "Sun, Star, Ocean".into(),
            nodes: vec![sun, star, ocean],
            edges: vec![
                Edge::new("t1-0", "t1-1", 0.9).with_kind("semantic"),
                Edge::new("t1-1", "t1-2", 0.4).with_kind("co-occurrence"),
            ],
            ..Schema::default()
        };
        schema.refresh_metadata();
        schema
    }

    fn enricher(chat: Arc<ScriptedChat>, config: Tier3Config) -> Enricher {
        Enricher::new(chat, config)
    }

    #[tokio::test]
    async fn unavailable_llm_leaves_schema_identical() {
        let chat = Arc::new(ScriptedChat::default());
        let input = tier2_schema();
        let output = enricher(chat.clone(), config(EnrichmentLevel::Full, Some(vec!["cause"])))
            .enrich(input.clone())
            .await;
        assert_eq!(output, input);
        assert_eq!(chat.seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn zero_nodes_sends_nothing() {
        let chat = Arc::new(ScriptedChat::default());
        let output = enricher(chat.clone(), config(EnrichmentLevel::Full, None))
            .enrich(Schema::empty())
            .await;
        assert_eq!(output, Schema::empty());
        assert!(chat.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn minimal_without_roles_sends_themes_and_edges() {
        let chat = Arc::new(ScriptedChat::default());
        enricher(chat.clone(), config(EnrichmentLevel::Minimal, None))
            .enrich(tier2_schema())
            .await;
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().any(|p| p.contains("theme name")));
        assert!(seen.iter().any(|p| p.contains("relationship between")));
    }

    #[tokio::test]
    async fn no_edges_skips_edge_prompt() {
        let chat = Arc::new(ScriptedChat::default());
        let mut schema = tier2_schema();
        schema.edges.clear();
        enricher(chat.clone(), config(EnrichmentLevel::Minimal, Some(vec![])))
            .enrich(schema)
            .await;
        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("theme name"));
    }

    #[tokio::test]
    async fn applies_every_aspect_by_exact_key() {
        let chat = Arc::new(ScriptedChat {
            themes: Some(r#"{"cluster-0": "Celestial Bodies", "cluster-9": "Ignored"}"#),
            roles: Some("```json\n{\"Sun\": \"cause\", \"sun\": \"wrong case\"}\n```"),
            edges: Some(r#"{"Sun→Star": "is a", "Ocean→Star": "reversed"}"#),
            descriptions: Some(r#"{"Ocean": "A large body of salt water."}"#),
            ..ScriptedChat::default()
        });
        let output = enricher(
            chat,
            config(EnrichmentLevel::Full, Some(vec!["cause", "effect"])),
        )
        .enrich(tier2_schema())
        .await;

        assert_eq!(output.nodes[0].theme.as_deref(), Some("Celestial Bodies"));
        assert_eq!(output.nodes[1].theme.as_deref(), Some("Celestial Bodies"));
        assert_eq!(output.nodes[2].theme.as_deref(), Some("cluster-1"));

        assert_eq!(output.nodes[0].mode_role.as_deref(), Some("cause"));
        assert_eq!(output.nodes[1].mode_role, None);

        assert_eq!(output.edges[0].label.as_deref(), Some("is a"));
        assert_eq!(output.edges[1].label, None);
        assert_eq!(output.metadata.relationships[0].label.as_deref(), Some("is a"));

        assert_eq!(
            output.nodes[2].details.as_deref(),
            Some("A large body of salt water.")
        );
        assert_eq!(output.nodes[0].details, None);
    }

    #[tokio::test]
    async fn one_failure_does_not_block_others() {
        let chat = Arc::new(ScriptedChat {
            themes: Some("I cannot help with that."),
            edges: Some(r#"{"Star→Ocean": "reflects in"}"#),
            ..ScriptedChat::default()
        });
        let output = enricher(chat, config(EnrichmentLevel::Full, Some(vec!["cause"])))
            .enrich(tier2_schema())
            .await;

        assert_eq!(output.nodes[0].theme.as_deref(), Some("cluster-0"));
        assert_eq!(output.edges[1].label.as_deref(), Some("reflects in"));
        assert!(output.nodes.iter().all(|n| n.mode_role.is_none()));
        assert!(output.nodes.iter().all(|n| n.details.is_none()));
    }

    #[tokio::test]
    async fn unthemed_nodes_share_one_group() {
        let chat = Arc::new(ScriptedChat {
            themes: Some(r#"{"unthemed": "Astronomy"}"#),
            ..ScriptedChat::default()
        });
        let mut schema = tier2_schema();
        for node in &mut schema.nodes {
            node.theme = None;
        }
        let output = enricher(chat.clone(), config(EnrichmentLevel::Minimal, None))
            .enrich(schema)
            .await;

        assert!(
            output
                .nodes
                .iter()
                .all(|n| n.theme.as_deref() == Some("Astronomy"))
        );
        let seen = chat.seen.lock().unwrap();
        assert!(seen.iter().any(|p| p.contains("unthemed: Sun, Star, Ocean")));
    }

    #[test]
    fn invalid_endpoint_is_config_error() {
        let section = LlmSection {
            endpoint: "::not a url".into(),
            ..LlmSection::default()
        };
        let err = Tier3Config::try_from(&section).unwrap_err();
        assert!(matches!(err, ConceptGraphError::Config { .. }));
    }

    #[tokio::test]
    async fn http_backed_enricher_applies_fenced_reply() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "```json\n{\"cluster-1\": \"Water\"}\n```"}}]
            })))
            .mount(&server)
            .await;

        let section = LlmSection {
            endpoint: format!("{}/v1", server.uri()),
            api_key_env: "CONCEPTGRAPH_TEST_UNSET_KEY".into(),
            ..LlmSection::default()
        };
        let output = Enricher::from_section(&section)
            .unwrap()
            .enrich(tier2_schema())
            .await;
        assert_eq!(output.nodes[2].theme.as_deref(), Some("Water"));
        assert_eq!(output.nodes[0].theme.as_deref(), Some("cluster-0"));
    }
}
