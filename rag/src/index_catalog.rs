use crate::catalog::{Catalog, CourseRecord};
use crate::embed_texts::Embedder;
use crate::error::{RagError, Result, Service};
use crate::store_qdrant::{CoursePoint, VectorIndex};

/// Text stored in the vector index for one course.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseDocument {
    pub id: String,
    pub title: String,
    pub text: String,
    pub url: String,
}

pub fn course_document(record: &CourseRecord) -> CourseDocument {
    let code = record.course_code.trim();
    let title = record.course_title.trim();
    let description = record.description.trim();
    let credits = record.credits.trim();
    let prerequisites = record.prerequisites.trim();

    let display_title = if code.is_empty() {
        title.to_string()
    } else {
        format!("{code}: {title}")
    };

    let mut parts = vec![display_title.clone()];
    if !description.is_empty() {
        parts.push(description.to_string());
    }
    if !credits.is_empty() {
        parts.push(format!("Credits: {credits}."));
    }
    if !prerequisites.is_empty() {
        parts.push(format!("Prerequisites: {prerequisites}"));
    }

    CourseDocument {
        id: format!("course::{code}"),
        title: display_title,
        text: parts.join(" ").trim().to_string(),
        url: record.source_url.trim().to_string(),
    }
}

/// Embeds every catalog course and upserts it into `index`. Returns the number of
/// documents stored. Re-running overwrites the same points.
pub fn index_catalog(
    catalog: &Catalog,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    batch_size: usize,
) -> Result<usize> {
    let documents: Vec<CourseDocument> = catalog
        .iter()
        .map(course_document)
        .filter(|doc| !doc.text.is_empty())
        .collect();
    if documents.is_empty() {
        return Ok(0);
    }

    let mut collection_ready = false;
    let mut stored = 0;
    for batch in documents.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed(&texts)?;
        if vectors.len() != batch.len() {
            return Err(RagError::Decode {
                service: Service::Embedding,
                message: format!("expected {} embeddings, got {}", batch.len(), vectors.len()),
            });
        }
        if !collection_ready {
            let size = vectors.first().map_or(0, Vec::len);
            if size == 0 {
                return Err(RagError::EmptyResponse {
                    service: Service::Embedding,
                });
            }
            index.ensure_collection(size)?;
            collection_ready = true;
        }

        let points: Vec<CoursePoint> = batch
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| CoursePoint {
                doc_id: doc.id.clone(),
                vector,
                title: doc.title.clone(),
                url: doc.url.clone(),
                document: doc.text.clone(),
            })
            .collect();
        index.upsert(&points)?;
        stored += points.len();
        tracing::info!(stored, total = documents.len(), "indexed course batch");
    }

    Ok(stored)
}
