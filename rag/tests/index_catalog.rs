mod common;

use common::{catalog, Counter, KeywordEmbedder, MemoryIndex, ScriptedModel};
use course_rag::{index_catalog, Assistant, Catalog, RagError, VectorIndex};

#[test]
fn every_course_is_stored_once_even_when_reindexed() {
    let index = MemoryIndex::default();
    let embeds = Counter::default();
    let embedder = KeywordEmbedder::new(embeds.clone());

    assert_eq!(index_catalog(&catalog(), &embedder, &index, 2).unwrap(), 3);
    assert_eq!(embeds.get(), 2, "3 documents in batches of 2");
    assert_eq!(index_catalog(&catalog(), &embedder, &index, 2).unwrap(), 3);
    assert_eq!(index.count().unwrap(), 3);

    let points = index.points.lock().unwrap();
    let ids: Vec<&str> = points.iter().map(|p| p.doc_id.as_str()).collect();
    assert!(ids.contains(&"course::INFOST 790"));
    assert!(ids.contains(&"course::COMPSCI 557"));
}

#[test]
fn empty_catalog_indexes_nothing() {
    let embeds = Counter::default();
    let stored = index_catalog(
        &Catalog::default(),
        &KeywordEmbedder::new(embeds.clone()),
        &MemoryIndex::default(),
        8,
    )
    .unwrap();
    assert_eq!(stored, 0);
    assert_eq!(embeds.get(), 0);
}

#[test]
fn embedding_errors_abort_indexing() {
    let index = MemoryIndex::default();
    let err = index_catalog(
        &catalog(),
        &KeywordEmbedder::failing(Counter::default()),
        &index,
        8,
    )
    .expect_err("embedder is down");
    assert!(matches!(err, RagError::Timeout { .. }));
    assert_eq!(index.count().unwrap(), 0);
}

#[test]
fn assistant_indexes_its_catalog_and_searches_it() {
    let assistant = Assistant::new(
        Some(catalog()),
        Box::new(KeywordEmbedder::new(Counter::default())),
        Box::new(MemoryIndex::default()),
        Box::new(ScriptedModel::replying(Counter::default(), "ok")),
    );

    assert_eq!(assistant.index_catalog().unwrap(), 3);
    assert_eq!(assistant.indexed_count().unwrap(), 3);

    let hits = assistant.search("information architecture", 3).unwrap();
    assert_eq!(hits[0].title, "INFOST 790: Info Architecture");
}

#[test]
fn indexing_without_a_catalog_is_an_error() {
    let assistant = Assistant::new(
        None,
        Box::new(KeywordEmbedder::new(Counter::default())),
        Box::new(MemoryIndex::default()),
        Box::new(ScriptedModel::replying(Counter::default(), "ok")),
    );
    assert!(matches!(
        assistant.index_catalog(),
        Err(RagError::CatalogUnavailable)
    ));
}
