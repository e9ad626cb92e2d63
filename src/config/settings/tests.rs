use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.embedding.provider, EmbeddingProvider::Fastembed);
    assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
    assert_eq!(config.embedding.batch_size, 32);
    assert_eq!(config.embedding.ollama.host, "localhost");
    assert_eq!(config.embedding.ollama.port, 11434);
    assert_eq!(config.rerank.model, None);
    assert_eq!(config.chunking, ChunkingConfig::default());
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.embedding.model = "  ".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.embedding.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.chunking.chunk_size = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidChunkSize(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.chunking.overlap = 500;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::OverlapTooLarge(500, 500))
    ));

    let mut invalid_config = config.clone();
    invalid_config.rerank.model = Some(String::new());
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config;
    invalid_config.index_dir = Some(PathBuf::new());
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidIndexDir)
    ));
}

#[test]
fn ollama_settings_only_checked_for_ollama_provider() {
    let mut config = Config::default();
    config.embedding.ollama.protocol = "ftp".to_string();
    assert!(config.validate().is_ok());

    config.embedding.provider = EmbeddingProvider::Ollama;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidProtocol(_))
    ));
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let mut config = Config::default();
    config.index_dir = Some(PathBuf::from("/data/rag"));
    config.rerank.model = Some("BAAI/bge-reranker-base".to_string());

    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    assert!(toml_str.contains("provider = \"fastembed\""));

    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_defaults() {
    let parsed: Config = toml::from_str(
        r#"
        [embedding]
        provider = "ollama"
        model = "nomic-embed-text"

        [chunking]
        chunk_size = 200
        "#,
    )
    .expect("should parse partial toml");

    assert_eq!(parsed.embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(parsed.embedding.batch_size, 32);
    assert_eq!(parsed.chunking.chunk_size, 200);
    assert_eq!(parsed.chunking.overlap, 50);
    assert_eq!(parsed.index_dir, None);
}

#[test]
fn setter_validation() {
    let mut embedding = EmbeddingConfig::default();
    assert!(embedding.set_model("bge-small-en-v1.5".to_string()).is_ok());
    assert!(embedding.set_batch_size(128).is_ok());
    assert!(embedding.set_model(String::new()).is_err());
    assert!(embedding.set_batch_size(0).is_err());
    assert!(embedding.set_batch_size(1001).is_err());
    assert_eq!(embedding.model, "bge-small-en-v1.5");
    assert_eq!(embedding.batch_size, 128);

    let mut ollama = OllamaConfig::default();
    assert!(ollama.set_protocol("https".to_string()).is_ok());
    assert!(ollama.set_host("example.com".to_string()).is_ok());
    assert!(ollama.set_port(8080).is_ok());
    assert!(ollama.set_protocol("ftp".to_string()).is_err());
    assert!(ollama.set_protocol("HTTP".to_string()).is_err());
    assert!(ollama.set_port(0).is_err());

    let mut rerank = RerankConfig::default();
    assert!(rerank.set_model(Some("BAAI/bge-reranker-base".to_string())).is_ok());
    assert!(rerank.set_model(Some(" ".to_string())).is_err());
    assert!(rerank.set_model(None).is_ok());
    assert_eq!(rerank.model, None);
}

#[test]
fn load_missing_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("missing config should load defaults");
    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert_eq!(config.embedding, EmbeddingConfig::default());
    assert_eq!(config.index_dir(), temp_dir.path().join("index"));
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let base_dir = temp_dir.path().join("nested");

    let mut config = Config {
        base_dir: base_dir.clone(),
        ..Config::default()
    };
    config.chunking.chunk_size = 300;
    config.save().expect("save should succeed");
    assert!(base_dir.join("config.toml").exists());

    let loaded = Config::load(&base_dir).expect("load should succeed");
    assert_eq!(loaded, config);
}

#[test]
fn load_rejects_invalid_values() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 10\noverlap = 20\n",
    )
    .expect("write");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn overrides_take_precedence() {
    let mut config = Config::default();
    config
        .apply_overrides(&ConfigOverrides {
            index_dir: Some(PathBuf::from("/tmp/rag-index")),
            embedding_model: Some("bge-small-en-v1.5".to_string()),
            rerank_model: Some("BAAI/bge-reranker-base".to_string()),
        })
        .expect("overrides should apply");

    assert_eq!(config.index_dir(), PathBuf::from("/tmp/rag-index"));
    assert_eq!(config.embedding.model, "bge-small-en-v1.5");
    assert_eq!(
        config.rerank.model.as_deref(),
        Some("BAAI/bge-reranker-base")
    );

    let store = config.store_config();
    assert_eq!(store.index_dir, PathBuf::from("/tmp/rag-index"));
    assert_eq!(store.chunking, config.chunking);
}

#[test]
fn empty_overrides_change_nothing() {
    let mut config = Config::default();
    let before = config.clone();
    config
        .apply_overrides(&ConfigOverrides::default())
        .expect("no overrides should apply");
    assert_eq!(config, before);
}

#[test]
fn home_relative_index_dir_is_expanded() {
    let config = Config {
        index_dir: Some(PathBuf::from("~/rag")),
        ..Config::default()
    };
    if let Some(home) = dirs::home_dir() {
        assert_eq!(config.index_dir(), home.join("rag"));
    }
}
