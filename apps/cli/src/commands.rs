//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use conceptgraph_core::{Stage, StageObserver, TieredRunner};
use conceptgraph_lexical::analyze_text;
use conceptgraph_shared::{
    AppConfig, EnrichmentLevel, config_file_path, init_config, load_config, load_config_from,
};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ConceptGraph: extract a concept graph from text, tier by tier.
#[derive(Parser)]
#[command(
    name = "conceptgraph",
    version,
    about = "Extract a progressively refined concept graph from raw text.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.conceptgraph/conceptgraph.toml).
    #[arg(long, env = "CONCEPTGRAPH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run every enabled tier and print one JSON line per tier result.
    Extract {
        /// Input text file. Reads stdin when omitted or `-`.
        file: Option<PathBuf>,

        #[command(flatten)]
        overrides: TierOverrides,

        /// Pretty-print each result.
        #[arg(long)]
        pretty: bool,
    },

    /// Score the text against each archetype.
    Analyze {
        /// Input text file. Reads stdin when omitted or `-`.
        file: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Per-invocation overrides of the config file.
#[derive(clap::Args, Debug, Default)]
pub(crate) struct TierOverrides {
    /// Skip embedding refinement (tier 2).
    #[arg(long)]
    pub no_embed: bool,

    /// Skip LLM enrichment (tier 3).
    #[arg(long)]
    pub no_enrich: bool,

    /// Enrichment level: minimal or full.
    #[arg(long)]
    pub level: Option<EnrichmentLevel>,

    /// Role vocabulary for node classification (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub roles: Vec<String>,

    /// Extra guidance for role classification.
    #[arg(long)]
    pub guidance: Option<String>,
}

impl TierOverrides {
    fn apply(&self, config: &mut AppConfig) {
        if self.no_embed {
            config.embedding.enabled = false;
        }
        if self.no_enrich {
            config.llm.enabled = false;
        }
        if let Some(level) = self.level {
            config.llm.level = level;
        }
        let roles: Vec<String> = self
            .roles
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if !roles.is_empty() {
            config.llm.roles = Some(roles);
        }
        if let Some(guidance) = &self.guidance {
            config.llm.guidance = Some(guidance.clone());
        }
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// carries only results.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "conceptgraph=info",
        1 => "conceptgraph=debug",
        _ => "conceptgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Extract {
            file,
            overrides,
            pretty,
        } => cmd_extract(config_path.as_deref(), file.as_deref(), &overrides, pretty).await,
        Command::Analyze { file } => cmd_analyze(file.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path.as_deref()).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read '{}'", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .wrap_err("failed to read stdin")?;
            Ok(text)
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_extract(
    config_path: Option<&Path>,
    file: Option<&Path>,
    overrides: &TierOverrides,
    pretty: bool,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    overrides.apply(&mut config);

    let text = read_input(file).await?;
    info!(
        chars = text.len(),
        embed = config.embedding.enabled,
        enrich = config.llm.enabled,
        "extracting concept graph"
    );

    let runner = TieredRunner::from_config(&config)?;
    let progress = Arc::new(CliProgress::new());
    let mut results = runner.run(text, progress.clone());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome: Result<()> = loop {
        tokio::select! {
            next = results.next() => match next {
                Some(Ok(result)) => {
                    let line = if pretty {
                        serde_json::to_string_pretty(&result)?
                    } else {
                        serde_json::to_string(&result)?
                    };
                    progress.spinner.suspend(|| println!("{line}"));
                }
                Some(Err(e)) => break Err(e).wrap_err("extraction failed"),
                None => break Ok(()),
            },
            _ = &mut ctrl_c => {
                runner.abort();
                warn!("interrupted, run aborted");
                break Ok(());
            }
        }
    };

    progress.spinner.finish_and_clear();
    if let Err(e) = runner.release().await {
        warn!(error = %e, "failed to release embedding model");
    }
    outcome
}

async fn cmd_analyze(file: Option<&Path>) -> Result<()> {
    let text = read_input(file).await?;
    let scores = analyze_text(&text);
    let report = serde_json::json!({
        "scores": scores,
        "recommendation": scores.top_recommendation(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = config_file_path()?;
    if path.exists() {
        return Err(eyre!(
            "config already exists at '{}'; remove it first to reset defaults",
            path.display()
        ));
    }
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Stage observer that drives an indicatif spinner on stderr.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

fn stage_message(stage: Stage) -> &'static str {
    match stage {
        Stage::Idle => "Waiting",
        Stage::Tier1Extracting => "Extracting concepts",
        Stage::Tier1Complete => "Concepts extracted",
        Stage::Tier2Embedding => "Embedding concepts",
        Stage::Tier2Clustering => "Clustering themes",
        Stage::Tier2Complete => "Embedding refinement done",
        Stage::Tier3Enriching => "Enriching with LLM",
        Stage::Tier3Complete => "Enrichment done",
        Stage::Complete => "Complete",
    }
}

impl StageObserver for CliProgress {
    fn stage(&self, stage: Stage) {
        if stage == Stage::Complete {
            self.spinner.finish_and_clear();
        } else {
            self.spinner.set_message(stage_message(stage));
        }
    }
}
