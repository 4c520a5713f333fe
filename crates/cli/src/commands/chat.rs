//! Interactive chat command.

use super::ask::{filter_spec, print_answer};
use crate::session::open_pipeline;
use clap::Args;
use docqa_core::{config::AppConfig, AppError, AppResult};
use docqa_knowledge::AskOptions;
use std::io::{self, BufRead, Write};

/// Ask questions interactively; prior questions are remembered
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Number of contexts to retrieve per question
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
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let pipeline = open_pipeline(config).await?;
        let filters = filter_spec(&self.docs, self.year, self.category.as_deref(), &self.topics);

        println!("Ask a question about the documents. Type 'exit' to quit.");

        let stdin = io::stdin();
        let mut history: Vec<String> = Vec::new();

        loop {
            print!("> ");
            io::stdout().flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                break;
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if is_exit(question) {
                break;
            }

            let mut options = AskOptions::new(question)
                .with_filters(filters.clone())
                .with_history(history.clone());
            if let Some(top_k) = self.top_k {
                options = options.with_top_k(top_k);
            }

            match pipeline.answer(options).await {
                Ok(result) => print_answer(&result),
                Err(AppError::Llm(e)) | Err(AppError::Embedding(e)) => {
                    tracing::warn!("Service call failed: {}", e);
                    eprintln!("Service unavailable, try again: {}", e);
                }
                Err(e) => return Err(e),
            }
            println!();

            history.push(question.to_string());
        }

        Ok(())
    }
}

fn is_exit(input: &str) -> bool {
    matches!(input.to_ascii_lowercase().as_str(), "exit" | "quit")
}
