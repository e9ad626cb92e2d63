//! MCP Tools Implementation
//!
//! Tool definitions and handlers for ingesting into and searching the local
//! vector store.

use crate::documents::{is_file_path, parse_document};
use crate::mcp::errors::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::ToolHandler;
use crate::store::{IngestReport, QueryResult, UNKNOWN_SOURCE, VectorStore};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Store handle shared between tool handlers.
pub type SharedStore = Arc<Mutex<VectorStore>>;

/// Number of results returned when `top_k` is not given
pub const DEFAULT_TOP_K: usize = 3;

/// Characters of chunk text shown per query result
pub const PREVIEW_CHARS: usize = 200;

/// Document ingestion tool handler
pub struct IngestDocumentHandler {
    store: SharedStore,
}

/// Similarity search tool handler
pub struct QueryRagStoreHandler {
    store: SharedStore,
}

impl IngestDocumentHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create the ingest_document tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "ingest_document".to_string(),
            description: Some(
                "Ingest a document into the vector store. The document can be raw text or a path to a file on disk."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "document": {
                        "type": "string",
                        "description": "Document text, or a path to a text, markdown, HTML or office file"
                    },
                    "source": {
                        "type": "string",
                        "description": "Optional: Identifier of the document's origin (default: 'unknown', or the file path)"
                    }
                },
                "required": ["document"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for IngestDocumentHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let document = required_str(&args, "ingest_document", "document")?.to_string();
        let source = args
            .get("source")
            .and_then(Value::as_str)
            .map(ToString::to_string);

        debug!(
            "Ingesting document: {} bytes, source={:?}",
            document.len(),
            source
        );

        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || -> Result<(IngestReport, String)> {
            let (text, source) = if is_file_path(&document) {
                let path = document.trim();
                let text = parse_document(Path::new(path))?;
                (text, source.unwrap_or_else(|| path.to_string()))
            } else {
                (document, source.unwrap_or_else(|| UNKNOWN_SOURCE.to_string()))
            };

            let mut store = store
                .lock()
                .map_err(|_| anyhow!("Vector store lock poisoned"))?;
            let report = store.ingest(&text, &source)?;
            Ok((report, source))
        })
        .await
        .context("Ingestion task failed")?;

        match outcome {
            Ok((report, source)) => Ok(format_ingest_report(&report, &source)),
            Err(e) => {
                error!("Failed to ingest document: {:#}", e);
                Ok(CallToolResult::error(format!(
                    "Failed to ingest document: {:#}",
                    e
                )))
            }
        }
    }
}

impl QueryRagStoreHandler {
    #[inline]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Create the query_rag_store tool definition
    #[inline]
    pub fn tool_definition() -> Tool {
        Tool {
            name: "query_rag_store".to_string(),
            description: Some(
                "Search the vector store for the chunks most relevant to a query".to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Maximum number of results (default: 3)"
                    }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for QueryRagStoreHandler {
    #[inline]
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult> {
        let args = params.arguments.unwrap_or_default();
        let query = required_str(&args, "query_rag_store", "query")?.to_string();
        let top_k = top_k_arg(args.get("top_k"));

        debug!("Querying store: query='{}', top_k={}", query, top_k);

        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || -> Result<Vec<QueryResult>> {
            let mut store = store
                .lock()
                .map_err(|_| anyhow!("Vector store lock poisoned"))?;
            Ok(store.query(&query, top_k)?)
        })
        .await
        .context("Query task failed")?;

        match outcome {
            Ok(results) => Ok(CallToolResult::text(format_query_results(&results))),
            Err(e) => {
                error!("Error querying vector store: {:#}", e);
                Ok(CallToolResult::error(format!("Query error: {:#}", e)))
            }
        }
    }
}

fn required_str<'a>(args: &'a HashMap<String, Value>, tool: &str, name: &str) -> Result<&'a str> {
    args.get(name).and_then(Value::as_str).ok_or_else(|| {
        McpError::InvalidToolParameters {
            tool: tool.to_string(),
            message: format!("Missing required parameter: {}", name),
        }
        .into()
    })
}

/// Render the result of an ingestion as tool output.
#[inline]
pub fn format_ingest_report(report: &IngestReport, source: &str) -> CallToolResult {
    if report.success {
        CallToolResult::text(format!(
            "Successfully ingested document from '{}'.\nCreated {} chunks.\nTotal documents in store: {}",
            source,
            report.chunks_added.unwrap_or(0),
            report.total_documents.unwrap_or(0)
        ))
    } else {
        CallToolResult::error(format!(
            "Failed to ingest document: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ))
    }
}

/// Render query results as tool output.
#[inline]
pub fn format_query_results(results: &[QueryResult]) -> String {
    if results.is_empty() {
        return "No results found. The vector store may be empty.".to_string();
    }

    let mut text = format!("Found {} relevant chunks:\n\n", results.len());
    for (i, result) in results.iter().enumerate() {
        let preview: String = result.text.chars().take(PREVIEW_CHARS).collect();
        let _ = writeln!(text, "{}. Source: {}", i + 1, result.source);
        let _ = writeln!(text, "   Distance: {:.4}", result.distance);
        if let Some(score) = result.rerank_score {
            let _ = writeln!(text, "   Rerank Score: {:.4}", score);
        }
        let _ = writeln!(text, "   Text: {}...\n", preview);
    }
    text
}

/// Read `top_k`, truncating fractional values; anything below 1 becomes 1
#[inline]
pub fn top_k_arg(value: Option<&Value>) -> usize {
    let requested = value.and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|k| k as i64)));
    requested.map_or(DEFAULT_TOP_K, |k| {
        usize::try_from(k.max(1)).unwrap_or(usize::MAX)
    })
}
