use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::{ScoredPoint, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::retrieval::Candidate;

/// Where an article sits in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub chapter: String,
    pub article_number: String,
    pub source: String,
}

impl DocumentMetadata {
    pub fn new(
        chapter: impl Into<String>,
        article_number: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            chapter: chapter.into(),
            article_number: article_number.into(),
            source: source.into(),
        }
    }
}

/// Immutable unit of retrievable text (one article).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// Payload keys written at ingestion time.
pub mod payload_keys {
    pub const TEXT: &str = "text";
    /// Older collections store the article body under this key.
    pub const TEXT_FALLBACK: &str = "document";
    pub const CHAPTER: &str = "chapter";
    pub const ARTICLE_NUMBER: &str = "article_number";
    pub const SOURCE: &str = "source";
}

/// Converts cosine similarity (`[-1, 1]`) to cosine distance (`[0, 2]`).
#[inline]
pub fn similarity_to_distance(similarity: f32) -> f32 {
    (1.0 - similarity).clamp(0.0, 2.0)
}

/// Exact cosine distance; mismatched or zero-length inputs are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 2.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 2.0;
    }
    similarity_to_distance(dot / (norm_a * norm_b))
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// Builds a vector-stage candidate from a Qdrant hit.
///
/// Returns `None` when the point has no id or no text; metadata fields that are
/// missing become empty strings.
pub fn candidate_from_scored_point(point: ScoredPoint) -> Option<Candidate> {
    let id = match point.id.and_then(|pid| pid.point_id_options)? {
        PointIdOptions::Num(n) => n.to_string(),
        PointIdOptions::Uuid(s) => s,
    };

    let payload = point.payload;
    let text = payload_string(&payload, payload_keys::TEXT)
        .or_else(|| payload_string(&payload, payload_keys::TEXT_FALLBACK))?;

    let metadata = DocumentMetadata {
        chapter: payload_string(&payload, payload_keys::CHAPTER).unwrap_or_default(),
        article_number: payload_string(&payload, payload_keys::ARTICLE_NUMBER).unwrap_or_default(),
        source: payload_string(&payload, payload_keys::SOURCE).unwrap_or_default(),
    };

    Some(Candidate::new(
        Document::new(id, text, metadata),
        similarity_to_distance(point.score),
    ))
}
