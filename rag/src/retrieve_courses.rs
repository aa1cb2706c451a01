use serde::Serialize;

use crate::embed_texts::{embed_query, Embedder};
use crate::error::Result;
use crate::store_qdrant::VectorIndex;

/// A course document returned by nearest-neighbour search.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub title: String,
    pub url: String,
}

/// Top-`k` course documents for `question`, closest first.
///
/// Embedding failures are returned as errors. An unreachable or missing index is
/// logged and yields no documents, which the generator turns into a refusal.
pub fn retrieve_courses(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    question: &str,
    k: usize,
) -> Result<Vec<RetrievedDocument>> {
    let vector = embed_query(embedder, question)?;
    match index.query(&vector, k) {
        Ok(documents) => {
            tracing::debug!(k, hits = documents.len(), "semantic retrieval");
            Ok(documents)
        }
        Err(err) => {
            tracing::warn!("vector index query failed, continuing without context: {err}");
            Ok(vec![])
        }
    }
}
