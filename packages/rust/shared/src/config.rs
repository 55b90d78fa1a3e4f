//! Application configuration for ConceptGraph.
//!
//! User config lives at `~/.conceptgraph/conceptgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConceptGraphError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "conceptgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".conceptgraph";

// ---------------------------------------------------------------------------
// Config structs (matching conceptgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Embedding refinement (tier 2) settings.
    #[serde(default)]
    pub embedding: EmbeddingSection,

    /// LLM enrichment (tier 3) settings.
    #[serde(default)]
    pub llm: LlmSection,
}

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    /// Whether tier 2 runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible base URL (the client appends `/embeddings`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            model: default_embedding_model(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

/// How much LLM enrichment tier 3 requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentLevel {
    /// Theme names, roles, and edge labels.
    #[default]
    Minimal,
    /// Everything in `Minimal` plus one-sentence node descriptions.
    Full,
}

impl std::str::FromStr for EnrichmentLevel {
    type Err = ConceptGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "full" => Ok(Self::Full),
            other => Err(ConceptGraphError::config(format!(
                "unknown enrichment level '{other}': expected 'minimal' or 'full'"
            ))),
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    /// Whether tier 3 runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// OpenAI-compatible base URL (the client appends `/chat/completions`).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Chat model name.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the env var holding an optional bearer token (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Enrichment level.
    #[serde(default)]
    pub level: EnrichmentLevel,

    /// Role vocabulary for node classification. Omit to skip role prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,

    /// Extra guidance appended to the role classification prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_endpoint(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            level: EnrichmentLevel::default(),
            roles: None,
            guidance: None,
            timeout_secs: default_llm_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_endpoint() -> String {
    "http://localhost:11434/v1".into()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".into()
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_llm_model() -> String {
    "llama3.2".into()
}
fn default_api_key_env() -> String {
    "CONCEPTGRAPH_LLM_API_KEY".into()
}
fn default_llm_timeout() -> u64 {
    60
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.conceptgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ConceptGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.conceptgraph/conceptgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConceptGraphError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ConceptGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ConceptGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ConceptGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConceptGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the LLM bearer token from the configured env var, if set and non-empty.
///
/// Local endpoints usually need no key, so a missing variable is not an error.
pub fn resolve_api_key(section: &LlmSection) -> Option<String> {
    match std::env::var(&section.api_key_env) {
        Ok(val) if !val.is_empty() => Some(val),
        _ => None,
    }
}
