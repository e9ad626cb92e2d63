#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end tests of the vector store against its on-disk files

mod common;

use common::{
    HashEmbedder, KeywordReranker, TableEmbedder, open_hash_store, store_config,
};
use local_rag_mcp::RagError;
use local_rag_mcp::store::{
    FlatIndex, INDEX_FILE, METADATA_FILE, MetadataLog, StoreConfig, VectorStore,
};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

const RUST_DOC: &str = "Rust guarantees memory safety through ownership and borrowing";
const PYTHON_DOC: &str = "Python relies on a garbage collector and reference counting";
const SQL_DOC: &str = "Relational databases answer declarative SQL queries";

#[test]
fn every_ingest_keeps_files_aligned() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = VectorStore::open(
        store_config(dir.path(), 4, 1),
        Box::new(HashEmbedder::new(32)),
        None,
    )
    .expect("store should open");

    for (i, doc) in [RUST_DOC, PYTHON_DOC, SQL_DOC].iter().enumerate() {
        let report = store
            .ingest(doc, &format!("doc-{}", i))
            .expect("ingest succeeds");
        assert!(report.success);
        assert!(report.chunks_added.expect("chunk count") > 0);
        assert_eq!(report.total_documents, Some(store.len()));

        let header =
            FlatIndex::read_header(&dir.path().join(INDEX_FILE)).expect("index file written");
        let log = MetadataLog::load(&dir.path().join(METADATA_FILE), "hash").expect("metadata");
        assert_eq!(header.count, log.len());
        assert_eq!(header.dimension, 32);
        assert!(
            log.documents
                .iter()
                .enumerate()
                .all(|(offset, record)| record.positional_id == offset)
        );
        assert!(store.consistency().is_consistent);
    }
}

#[test]
fn empty_document_is_a_failed_ingest() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open_hash_store(dir.path(), 16);

    let report = store.ingest(" \n\t ", "blank").expect("no hard error");
    assert!(!report.success);
    assert_eq!(
        report.error.as_deref(),
        Some("No chunks created from document")
    );
    assert!(store.is_empty());
    assert!(!dir.path().join(INDEX_FILE).exists());
}

#[test]
fn reopened_store_answers_identically() {
    let dir = TempDir::new().expect("temp dir");
    let first = {
        let mut store = open_hash_store(dir.path(), 64);
        store.ingest(RUST_DOC, "rust.md").expect("ingest");
        store.ingest(PYTHON_DOC, "python.md").expect("ingest");
        store.ingest(SQL_DOC, "sql.md").expect("ingest");
        store
            .query("ownership and borrowing in rust", 2)
            .expect("query")
    };

    let mut reopened = open_hash_store(dir.path(), 64);
    assert_eq!(reopened.len(), 3);
    assert_eq!(reopened.documents()[2].source, "sql.md");

    let second = reopened
        .query("ownership and borrowing in rust", 2)
        .expect("query");
    let again = reopened
        .query("ownership and borrowing in rust", 2)
        .expect("query");
    assert_eq!(first, second);
    assert_eq!(second, again);
    assert_eq!(second[0].source, "rust.md");
}

#[test]
fn dimension_mismatch_names_both_widths() {
    let dir = TempDir::new().expect("temp dir");
    {
        let mut store = open_hash_store(dir.path(), 384);
        store.ingest(RUST_DOC, "rust.md").expect("ingest");
    }

    let err = VectorStore::open(
        StoreConfig::new(dir.path()),
        Box::new(HashEmbedder::new(768)),
        None,
    )
    .err()
    .expect("a wider model must be refused");

    assert!(matches!(
        err,
        RagError::DimensionMismatch {
            persisted: 384,
            configured: 768
        }
    ));
    let message = err.to_string();
    assert!(message.contains("384"), "{message}");
    assert!(message.contains("768"), "{message}");

    // the refused open leaves the persisted index untouched
    let header = FlatIndex::read_header(&dir.path().join(INDEX_FILE)).expect("header");
    assert_eq!(header.dimension, 384);
    assert_eq!(header.count, 1);
}

#[test]
fn empty_store_query_skips_the_embedder() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = HashEmbedder::new(16);
    let calls = Arc::clone(&embedder.calls);
    let mut store = VectorStore::open(StoreConfig::new(dir.path()), Box::new(embedder), None)
        .expect("store should open");
    let after_open = calls.load(Ordering::SeqCst);

    let results = store.query("anything at all", 5).expect("query");
    assert!(results.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), after_open);
}

#[test]
fn top_k_is_clamped_to_store_size() {
    let dir = TempDir::new().expect("temp dir");
    let mut store = open_hash_store(dir.path(), 32);
    store.ingest(RUST_DOC, "a").expect("ingest");
    store.ingest(PYTHON_DOC, "b").expect("ingest");
    store.ingest(SQL_DOC, "c").expect("ingest");

    let results = store.query("memory", 100).expect("query");
    assert_eq!(results.len(), 3);

    let results = store.query("memory", 2).expect("query");
    assert_eq!(results.len(), 2);
}

#[test]
fn results_are_ordered_by_distance_without_reranker() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = TableEmbedder::new(&[
        ("test", &[0.5, 0.5]),
        ("near", &[1.0, 0.0]),
        ("far", &[5.0, 0.0]),
        ("middle", &[0.0, 2.0]),
        ("origin", &[0.0, 0.0]),
    ]);
    let mut store = VectorStore::open(StoreConfig::new(dir.path()), Box::new(embedder), None)
        .expect("store should open");
    for doc in ["far", "middle", "near"] {
        store.ingest(doc, doc).expect("ingest");
    }

    let results = store.query("origin", 3).expect("query");
    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["near", "middle", "far"]);
    assert!(
        results
            .windows(2)
            .all(|pair| pair[0].distance <= pair[1].distance)
    );
    assert!(results.iter().all(|r| r.rerank_score.is_none()));
    assert!((results[0].distance - 1.0).abs() < f32::EPSILON);
    assert!((results[2].distance - 25.0).abs() < f32::EPSILON);
}

#[test]
fn reranker_reorders_and_scores_every_result() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = TableEmbedder::new(&[
        ("test", &[0.5, 0.5]),
        ("alpha", &[0.0, 1.0]),
        ("beta", &[0.0, 2.0]),
        ("gamma special", &[0.0, 3.0]),
        ("origin", &[0.0, 0.0]),
    ]);
    let reranker = KeywordReranker {
        keyword: "special".to_string(),
    };
    let mut store = VectorStore::open(
        StoreConfig::new(dir.path()),
        Box::new(embedder),
        Some(Box::new(reranker)),
    )
    .expect("store should open");
    for doc in ["alpha", "beta", "gamma special"] {
        store.ingest(doc, doc).expect("ingest");
    }
    assert_eq!(store.rerank_model(), Some("keyword"));

    let results = store.query("origin", 3).expect("query");
    let texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["gamma special", "alpha", "beta"]);
    assert!(results.iter().all(|r| r.rerank_score.is_some()));
    assert_eq!(results[0].rerank_score, Some(1.0));
}

#[test]
fn reranker_only_reorders_retrieved_candidates() {
    let dir = TempDir::new().expect("temp dir");
    let embedder = TableEmbedder::new(&[
        ("test", &[0.5, 0.5]),
        ("alpha", &[0.0, 1.0]),
        ("beta", &[0.0, 2.0]),
        ("gamma special", &[0.0, 3.0]),
        ("origin", &[0.0, 0.0]),
    ]);
    let reranker = KeywordReranker {
        keyword: "special".to_string(),
    };
    let mut store = VectorStore::open(
        StoreConfig::new(dir.path()),
        Box::new(embedder),
        Some(Box::new(reranker)),
    )
    .expect("store should open");
    for doc in ["alpha", "beta", "gamma special"] {
        store.ingest(doc, doc).expect("ingest");
    }

    let results = store.query("origin", 2).expect("query");
    let mut texts: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts.len(), 2);
    assert!(!texts.contains(&"gamma special"));
    assert!(results.iter().all(|r| r.rerank_score.is_some()));
    texts.sort_unstable();
    assert_eq!(texts, vec!["alpha", "beta"]);
}

#[test]
fn offsets_without_metadata_are_skipped() {
    let dir = TempDir::new().expect("temp dir");
    {
        let mut store = open_hash_store(dir.path(), 32);
        store.ingest(RUST_DOC, "rust.md").expect("ingest");
        store.ingest(PYTHON_DOC, "python.md").expect("ingest");
    }

    // drop the last record so the index has one vector without metadata
    let metadata_file = dir.path().join(METADATA_FILE);
    let mut log = MetadataLog::load(&metadata_file, "hash").expect("metadata");
    log.truncate(1);
    log.save(&metadata_file).expect("save metadata");

    let mut store = open_hash_store(dir.path(), 32);
    let report = store.consistency();
    assert!(!report.is_consistent);
    assert_eq!(report.length_difference(), -1);

    let results = store.query(PYTHON_DOC, 5).expect("query");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, "rust.md");
}

#[test]
fn malformed_metadata_is_not_an_empty_store() {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join(METADATA_FILE), "[this is not json").expect("write");

    let err = VectorStore::open(
        StoreConfig::new(dir.path()),
        Box::new(HashEmbedder::new(8)),
        None,
    )
    .err()
    .expect("malformed metadata must be reported");
    assert!(matches!(err, RagError::MalformedMetadata { .. }));
}
