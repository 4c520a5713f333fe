//! Ask command handler.

use crate::session::open_pipeline;
use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::{AnswerResult, AskOptions, FilterSpec};

/// Answer a single question from the indexed documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Number of contexts to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Restrict to these documents (repeatable)
    #[arg(long = "doc")]
    pub docs: Vec<String>,

    /// Restrict to a publication year
    #[arg(long)]
    pub year: Option<i32>,

    /// Restrict to a category
    #[arg(long)]
    pub category: Option<String>,

    /// Restrict to records sharing any of these topics (repeatable)
    #[arg(long = "topic")]
    pub topics: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::debug!("Ask command options: {:?}", self);

        let pipeline = open_pipeline(config).await?;

        let mut options = AskOptions::new(&self.question).with_filters(self.filters());
        if let Some(top_k) = self.top_k {
            options = options.with_top_k(top_k);
        }

        let result = pipeline.answer(options).await?;

        if self.json {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            print_answer(&result);
        }

        Ok(())
    }

    fn filters(&self) -> FilterSpec {
        filter_spec(&self.docs, self.year, self.category.as_deref(), &self.topics)
    }
}

/// Build a filter spec from CLI flags; empty lists mean no filter.
pub fn filter_spec(
    docs: &[String],
    year: Option<i32>,
    category: Option<&str>,
    topics: &[String],
) -> FilterSpec {
    let mut filters = FilterSpec::new();
    if !docs.is_empty() {
        filters = filters.with_docs(docs);
    }
    if let Some(year) = year {
        filters = filters.with_year(year);
    }
    if let Some(category) = category {
        filters = filters.with_category(category);
    }
    if !topics.is_empty() {
        filters = filters.with_topics(topics);
    }
    filters
}

/// Print an answer for humans.
pub fn print_answer(result: &AnswerResult) {
    println!("{}", result.answer);
    println!();
    println!("Confidence: {}", result.confidence.as_str());

    if !result.sources.is_empty() {
        println!("Sources:");
        for source in &result.sources {
            println!("  - {} (page {})", source.doc, source.page);
        }
    }

    if !result.quotes.is_empty() {
        println!("Supporting quotes:");
        for quote in &result.quotes {
            println!("  - \"{}\" (source #{})", quote.quote, quote.source_index);
        }
    }
}
