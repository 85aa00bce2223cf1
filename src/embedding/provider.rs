use std::future::Future;
use std::sync::Arc;

use super::error::EmbeddingError;

/// Maps query text to an L2-normalised vector of fixed dimension.
///
/// Implementations are shared across concurrent queries and must not mutate
/// state that affects their output.
pub trait EmbeddingProvider: Send + Sync {
    /// Output dimension; every vector returned by [`embed`](Self::embed) has this length.
    fn dim(&self) -> usize;

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

impl<E: EmbeddingProvider> EmbeddingProvider for Arc<E> {
    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send {
        (**self).embed(text)
    }
}

/// Scales `v` to unit length in place; zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
