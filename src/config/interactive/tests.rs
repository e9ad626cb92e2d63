use super::load_existing_config as load_existing_config_impl;
use crate::config::{Config, EmbeddingProvider};
use std::fs;
use tempfile::TempDir;

#[test]
fn load_existing_config_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");

    assert_eq!(config.get_base_dir(), temp_dir.path());
    assert!(!config.embedding.model.is_empty());
    assert!(config.embedding.batch_size > 0);
}

#[test]
fn load_existing_config_reads_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.embedding.provider = EmbeddingProvider::Ollama;
    config.embedding.model = "nomic-embed-text".to_string();
    config.save().expect("save");

    let loaded = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(loaded, config);
}

#[test]
fn invalid_existing_config_falls_back_to_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    fs::write(temp_dir.path().join("config.toml"), "not = [valid").expect("write");

    let loaded = load_existing_config_impl(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(loaded.embedding, Config::default().embedding);
}

#[test]
fn show_config_renders() {
    let config = Config::default();
    assert!(super::show_config(&config).is_ok());
}
