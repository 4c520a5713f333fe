//! Index command handler.
//!
//! Builds the similarity index and metadata store from extracted page
//! text, and reports what an existing index contains.

use crate::session::embedder;
use clap::{Args, Subcommand};
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::config::load_config;
use docqa_knowledge::{build_index, KnowledgeStore};
use std::path::PathBuf;

/// Build or inspect the document index
#[derive(Args, Debug)]
pub struct IndexCommand {
    #[command(subcommand)]
    pub action: IndexAction,
}

#[derive(Subcommand, Debug)]
pub enum IndexAction {
    /// Build the index from JSONL page files
    Build(IndexBuildCommand),
    /// Show the documents and facets in the index
    Stats(IndexStatsCommand),
}

/// Build the index from JSONL page files
#[derive(Args, Debug)]
pub struct IndexBuildCommand {
    /// Page files or directories of `*.jsonl` page files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexBuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let knowledge = load_config(&config.workspace)?;
        let embedder = embedder(config, &knowledge)?;

        let stats = build_index(&config.workspace, &self.inputs, &knowledge, embedder.as_ref()).await?;

        if self.json {
            println!("{}", to_pretty_json(&stats)?);
        } else {
            println!("Index built");
            println!("  Documents: {}", stats.documents);
            if stats.duplicate_documents > 0 {
                println!("  Duplicates skipped: {}", stats.duplicate_documents);
            }
            println!("  Pages: {}", stats.pages);
            println!("  Chunks: {}", stats.chunks);
            println!("  Dimensions: {}", stats.dimensions);
            println!("  Duration: {:.2}s", stats.duration_secs);
        }

        Ok(())
    }
}

/// Show the documents and facets in the index
#[derive(Args, Debug)]
pub struct IndexStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IndexStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let knowledge = load_config(&config.workspace)?;
        let store = KnowledgeStore::open(&config.workspace, &knowledge).await?;
        let catalog = store.catalog();

        if self.json {
            println!("{}", to_pretty_json(&catalog)?);
        } else {
            let years: Vec<String> = catalog.years.iter().map(i32::to_string).collect();
            println!("Chunks: {}", catalog.record_count);
            println!("Documents ({}):", catalog.docs.len());
            for doc in &catalog.docs {
                println!("  - {}", doc);
            }
            println!("Years: {}", years.join(", "));
            println!("Categories: {}", catalog.categories.join(", "));
            println!("Topics: {}", catalog.topics.join(", "));
        }

        Ok(())
    }
}

impl IndexCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            IndexAction::Build(cmd) => cmd.execute(config).await,
            IndexAction::Stats(cmd) => cmd.execute(config).await,
        }
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))
}
