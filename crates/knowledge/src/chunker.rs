//! Page text cleanup and overlapping character chunking.

use crate::config::ChunkingConfig;
use docqa_core::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

static HYPHEN_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\n(\w)").unwrap());
static NEWLINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").unwrap());
static INLINE_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Normalize extracted PDF text.
///
/// Joins words hyphenated across line breaks, turns single newlines into
/// spaces, collapses runs of spaces and tabs, and caps blank-line runs at
/// one empty line.
pub fn clean_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = HYPHEN_BREAK.replace_all(&text, "$1$2");
    let text = NEWLINE_RUN.replace_all(&text, |caps: &Captures| {
        if caps[0].len() == 1 {
            " ".to_string()
        } else {
            caps[0].to_string()
        }
    });
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Splits cleaned page text into overlapping chunks.
pub struct Chunker {
    splitter: TextSplitter<Characters>,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> AppResult<Self> {
        let chunk_config = ChunkConfig::new(config.chunk_size)
            .with_overlap(config.chunk_overlap)
            .map_err(|e| AppError::Config(format!("Invalid chunking settings: {}", e)))?;

        Ok(Self {
            splitter: TextSplitter::new(chunk_config),
        })
    }

    /// Split text into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.splitter
            .chunks(text)
            .map(str::trim)
            .filter(|chunk| !chunk.is_empty())
            .map(str::to_string)
            .collect()
    }
}
