//! Grounding context handed to the answer-generation step.

use serde::Serialize;

use super::types::{QueryResult, RankedCandidate};

/// Characters kept in a [`SourceRef`] excerpt.
pub const EXCERPT_CHARS: usize = 200;

const SEPARATOR_WIDTH: usize = 50;
const NOT_SPECIFIED: &str = "not specified";

/// Citation-sized summary of one retrieved article.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    /// 1-based position in the result.
    pub rank: usize,
    pub article_number: String,
    pub chapter: String,
    pub source: String,
    pub text_excerpt: String,
    pub score: f32,
}

impl SourceRef {
    pub fn from_ranked(rank: usize, ranked: &RankedCandidate) -> Self {
        let metadata = ranked.metadata();
        Self {
            rank,
            article_number: metadata.article_number.clone(),
            chapter: metadata.chapter.clone(),
            source: metadata.source.clone(),
            text_excerpt: excerpt(ranked.text(), EXCERPT_CHARS),
            score: ranked.rerank_score,
        }
    }
}

/// Citations for every candidate in `result`, in rank order.
pub fn sources(result: &QueryResult) -> Vec<SourceRef> {
    result
        .iter()
        .enumerate()
        .map(|(i, ranked)| SourceRef::from_ranked(i + 1, ranked))
        .collect()
}

/// Renders `result` as numbered source blocks separated by blank lines.
///
/// Returns an empty string for an empty result.
pub fn format_context(result: &QueryResult) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);

    result
        .iter()
        .enumerate()
        .map(|(i, ranked)| {
            let metadata = ranked.metadata();
            format!(
                "Source {}:\nChapter: {}\nArticle: {}\nText:\n{}\n{}",
                i + 1,
                or_not_specified(&metadata.chapter),
                or_not_specified(&metadata.article_number),
                ranked.text().trim(),
                separator
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn or_not_specified(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        value
    }
}

/// First `max_chars` characters of `text`, with `...` appended when truncated.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
