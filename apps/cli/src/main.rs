//! ConceptGraph CLI: turn raw text into a progressively refined concept graph.
//!
//! Runs lexical extraction, embedding refinement, and LLM enrichment in
//! turn, printing one JSON result per completed tier.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
