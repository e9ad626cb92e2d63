use super::*;

#[test]
fn normalize_strips_namespace_and_suffix() {
    assert_eq!(
        normalize_model_name("Qdrant/all-MiniLM-L6-v2-onnx"),
        "all-minilm-l6-v2"
    );
    assert_eq!(
        normalize_model_name("sentence-transformers/all-MiniLM-L6-v2"),
        "all-minilm-l6-v2"
    );
    assert_eq!(normalize_model_name("all-MiniLM-L6-v2"), "all-minilm-l6-v2");
    assert_eq!(normalize_model_name("  BAAI/bge-small-en-v1.5 "), "bge-small-en-v1.5");
}

#[test]
fn resolves_sentence_transformers_name() {
    let model = resolve_embedding_model("all-MiniLM-L6-v2").expect("model should resolve");
    let dim = TextEmbedding::list_supported_models()
        .into_iter()
        .find(|info| info.model == model)
        .map(|info| info.dim);
    assert_eq!(dim, Some(384));
}

#[test]
fn resolves_full_model_code() {
    assert!(resolve_embedding_model("BAAI/bge-base-en-v1.5").is_ok());
}

#[test]
fn unknown_model_is_config_error() {
    let err = resolve_embedding_model("definitely-not-a-model").expect_err("should fail");
    assert!(matches!(err, RagError::Config(_)));
    assert!(err.to_string().contains("definitely-not-a-model"));
}

#[test]
#[ignore = "downloads the embedding model"]
fn encodes_with_model_dimension() {
    let mut embedder = FastEmbedder::new("all-MiniLM-L6-v2", 8).expect("model should load");
    let vectors = embedder
        .encode(&["hello world".to_string(), "second text".to_string()])
        .expect("encode should succeed");
    assert_eq!(vectors.len(), 2);
    assert!(vectors.iter().all(|v| v.len() == 384));

    let again = embedder
        .encode(&["hello world".to_string()])
        .expect("encode should succeed");
    assert_eq!(again[0], vectors[0]);
}
