use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use itertools::Itertools;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::RagError;
use crate::config::{Config, EmbeddingProvider};
use crate::documents::{is_supported, parse_document};
use crate::embeddings::{OllamaEmbedder, build_embedder};
use crate::mcp::rag_server;
use crate::mcp::tools::format_query_results;
use crate::output::{self, FileProgress};
use crate::rerank::build_reranker;
use crate::store::{
    FlatIndex, MetadataLog, UNKNOWN_SOURCE, VectorStore, check_consistency, index_path,
    metadata_path,
};

/// Load the configured models and open the vector store
#[inline]
pub fn build_store(config: &Config) -> Result<VectorStore> {
    let embedder = build_embedder(&config.embedding).context("Failed to load embedding model")?;
    let reranker =
        build_reranker(config.rerank.model.as_deref()).context("Failed to load rerank model")?;
    let store = VectorStore::open(config.store_config(), embedder, reranker)?;
    Ok(store)
}

/// Start the MCP server on stdio
#[inline]
pub async fn serve_mcp(config: Config) -> Result<()> {
    info!(
        "Initializing with embedding model: {}",
        config.embedding.model
    );

    let store = tokio::task::spawn_blocking(move || build_store(&config))
        .await
        .context("Vector store initialization task failed")??;

    info!(
        "Vector store initialized (dimension: {}, {} chunks)",
        store.dimension(),
        store.len()
    );

    let server = Arc::new(rag_server(Arc::new(Mutex::new(store))).await);
    server.serve_stdio().await
}

/// Expand command-line paths into the files to index.
///
/// Files named explicitly are always kept so unsupported formats are reported;
/// directories contribute only supported files, one level deep unless
/// `recursive` is set. Paths that do not exist are returned separately.
#[inline]
pub fn collect_files(paths: &[PathBuf], recursive: bool) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut files = Vec::new();
    let mut missing = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            let found = WalkDir::new(path)
                .min_depth(1)
                .max_depth(max_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable entry: {}", e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
                .map(walkdir::DirEntry::into_path);
            files.extend(found);
        } else {
            missing.push(path.clone());
        }
    }

    (files, missing)
}

/// Parse and ingest files into the store.
///
/// Returns `false` when any file could not be indexed.
#[inline]
pub fn index_files(config: &Config, paths: &[PathBuf], recursive: bool) -> Result<bool> {
    let (files, missing) = collect_files(paths, recursive);
    for path in &missing {
        eprintln!(
            "{}",
            output::error(&format!("File not found: {}", path.display()))
        );
    }

    if files.is_empty() {
        eprintln!("{}", output::warning("No supported files to index"));
        return Ok(false);
    }

    let mut store = build_store(config)?;
    let progress = FileProgress::new(files.len());
    let mut failed = missing.len();
    let mut added = 0;

    for file in &files {
        let name = file.display().to_string();
        progress.start_file(&name);

        let outcome = parse_document(file).and_then(|text| store.ingest(&text, &name));
        match outcome {
            Ok(report) if report.success => {
                let chunks = report.chunks_added.unwrap_or(0);
                added += chunks;
                progress.println(&output::success(&format!(
                    "Added {} chunks from {}",
                    chunks, name
                )));
            }
            Ok(report) => {
                failed += 1;
                progress.println(&output::error(&format!(
                    "Failed to index {}: {}",
                    name,
                    report.error.as_deref().unwrap_or("unknown error")
                )));
            }
            Err(e) => {
                failed += 1;
                progress.println(&output::error(&format!("Failed to index {}: {}", name, e)));
            }
        }
        progress.inc();
    }
    progress.finish();

    eprintln!(
        "{}",
        output::info(&format!(
            "Indexed {} of {} files ({} chunks added, {} chunks in store)",
            files.len() + missing.len() - failed,
            files.len() + missing.len(),
            added,
            store.len()
        ))
    );

    Ok(failed == 0)
}

/// Search the store from the command line
#[inline]
pub fn query_store(
    config: &Config,
    text: &str,
    top_k: usize,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let mut store = build_store(config)?;
    let results = store.query(text, top_k.max(1))?;

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?;
    } else {
        writeln!(out, "{}", format_query_results(&results))?;
    }
    Ok(())
}

/// Chunks grouped by the document they came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct DocumentListing<'a> {
    documents: &'a [SourceSummary],
    total: usize,
}

/// Group the metadata log by source, alphabetically
#[inline]
pub fn summarize_sources(log: &MetadataLog) -> Vec<SourceSummary> {
    let source_of = |source: &str| -> String {
        if source.is_empty() {
            UNKNOWN_SOURCE.to_string()
        } else {
            source.to_string()
        }
    };

    let groups = log
        .documents
        .iter()
        .sorted_by_key(|record| source_of(&record.source))
        .chunk_by(|record| source_of(&record.source));

    groups
        .into_iter()
        .map(|(source, records)| {
            let records: Vec<_> = records.collect();
            SourceSummary {
                source,
                chunks: records.len(),
                indexed_at: records
                    .iter()
                    .filter_map(|r| r.indexed_at.clone())
                    .max(),
            }
        })
        .collect()
}

/// Render a stored timestamp as `YYYY-MM-DD HH:MM`, or return it unchanged
#[inline]
pub fn format_indexed_at(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M";

    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format(DISPLAY).to_string();
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(DISPLAY).to_string();
    }
    raw.to_string()
}

/// List indexed documents without loading any model.
///
/// Returns `false` when the metadata log cannot be read.
#[inline]
pub fn list_documents(
    index_dir: &Path,
    json: bool,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<bool> {
    let log = match MetadataLog::load(&metadata_path(index_dir), "") {
        Ok(log) => log,
        Err(e) => {
            let detail = match e {
                RagError::MalformedMetadata { message, .. } => message,
                other => other.to_string(),
            };
            writeln!(
                err,
                "{}",
                output::error(&format!("Failed to read metadata: {}", detail))
            )?;
            return Ok(false);
        }
    };

    let summaries = summarize_sources(&log);
    debug!(
        "{} chunks across {} documents",
        log.len(),
        summaries.len()
    );

    if json {
        let listing = DocumentListing {
            documents: &summaries,
            total: summaries.len(),
        };
        writeln!(out, "{}", serde_json::to_string_pretty(&listing)?)?;
        return Ok(true);
    }

    if summaries.is_empty() {
        writeln!(out, "{}", output::info("No documents indexed yet"))?;
        return Ok(true);
    }

    writeln!(
        out,
        "{}",
        output::highlight(&format!("Indexed Documents ({} total)", summaries.len()))
    )?;
    writeln!(out)?;
    for summary in &summaries {
        writeln!(out, "📄 {}", summary.source)?;
        writeln!(out, "   Chunks: {}", summary.chunks)?;
        if let Some(indexed_at) = &summary.indexed_at {
            writeln!(out, "   Indexed: {}", format_indexed_at(indexed_at))?;
        }
    }

    Ok(true)
}

/// Report configuration and on-disk state of the store
#[inline]
pub fn show_status(config: &Config, out: &mut impl Write) -> Result<()> {
    let index_dir = config.index_dir();

    writeln!(out, "📊 Local RAG Status Report")?;
    writeln!(out, "{}", "=".repeat(50))?;
    writeln!(out)?;

    writeln!(out, "⚙️  Configuration:")?;
    writeln!(
        out,
        "   Embedding: {} ({})",
        config.embedding.model, config.embedding.provider
    )?;
    writeln!(
        out,
        "   Reranker: {}",
        config.rerank.model.as_deref().unwrap_or("disabled")
    )?;
    writeln!(
        out,
        "   Chunking: {} words, {} overlap",
        config.chunking.chunk_size, config.chunking.overlap
    )?;
    writeln!(out, "   Index Directory: {}", index_dir.display())?;
    writeln!(out)?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        writeln!(out, "🤖 Ollama Status:")?;
        let ollama = &config.embedding.ollama;
        match OllamaEmbedder::new(&config.embedding) {
            Ok(client) => match client.health_check() {
                Ok(()) => writeln!(
                    out,
                    "   ✅ Ollama: Connected ({}:{})",
                    ollama.host, ollama.port
                )?,
                Err(e) => writeln!(out, "   ⚠️  Ollama: Unhealthy - {:#}", e)?,
            },
            Err(e) => writeln!(out, "   ❌ Ollama: Failed to connect - {:#}", e)?,
        }
        writeln!(out)?;
    }

    writeln!(out, "🔍 Vector Index:")?;
    let index_file = index_path(&index_dir);
    let vectors = if index_file.exists() {
        match FlatIndex::read_header(&index_file) {
            Ok(header) => {
                writeln!(out, "   ✅ {} vectors", header.count)?;
                writeln!(out, "   Dimension: {}", header.dimension)?;
                Some(header.count)
            }
            Err(e) => {
                writeln!(out, "   ❌ Unreadable: {}", e)?;
                None
            }
        }
    } else {
        writeln!(out, "   Not created yet")?;
        Some(0)
    };
    writeln!(out)?;

    writeln!(out, "🗂️  Metadata:")?;
    let metadata_file = metadata_path(&index_dir);
    let log = if metadata_file.exists() {
        match MetadataLog::read(&metadata_file) {
            Ok(log) => {
                writeln!(out, "   ✅ {} chunk records", log.len())?;
                if !log.model.is_empty() {
                    writeln!(out, "   Model: {}", log.model)?;
                    if log.model != config.embedding.model {
                        writeln!(
                            out,
                            "   ⚠️  Created with a different model than configured ({})",
                            config.embedding.model
                        )?;
                    }
                }
                Some(log)
            }
            Err(e) => {
                writeln!(out, "   ❌ {}", e)?;
                None
            }
        }
    } else {
        writeln!(out, "   Not created yet")?;
        Some(MetadataLog::new(""))
    };
    writeln!(out)?;

    writeln!(out, "🔗 Consistency:")?;
    match (vectors, log) {
        (Some(vectors), Some(log)) => {
            let report = check_consistency(vectors, &log);
            if report.is_consistent {
                writeln!(out, "   ✅ Index and metadata are aligned")?;
            } else {
                if report.index_vectors != report.metadata_records {
                    writeln!(
                        out,
                        "   ❌ {} vectors but {} metadata records",
                        report.index_vectors, report.metadata_records
                    )?;
                }
                if !report.misnumbered.is_empty() {
                    writeln!(
                        out,
                        "   ❌ {} records have ids that differ from their position",
                        report.misnumbered.len()
                    )?;
                }
            }
        }
        _ => writeln!(out, "   ⚠️  Unable to check: store files are unreadable")?,
    }

    Ok(())
}
