//! MCP (Model Context Protocol) Server Implementation
//!
//! This module provides an MCP server over stdio following the JSON-RPC 2.0
//! specification and MCP protocol version 2025-06-18. It exposes the local
//! vector store as two tools and two prompt templates.


pub mod errors;
pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;

pub use errors::McpError;
pub use prompts::{ExtractAnswerPrompt, SummarizeDocumentsPrompt};
pub use server::{ConnectionState, McpServer, PromptHandler, ToolHandler};
pub use tools::{IngestDocumentHandler, QueryRagStoreHandler, SharedStore};

/// Build a server with the store tools and prompt templates registered
#[inline]
pub async fn rag_server(store: SharedStore) -> McpServer {
    let server = McpServer::new(
        env!("CARGO_PKG_NAME").to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );

    server
        .register_tool(
            IngestDocumentHandler::tool_definition(),
            IngestDocumentHandler::new(std::sync::Arc::clone(&store)),
        )
        .await;
    server
        .register_tool(
            QueryRagStoreHandler::tool_definition(),
            QueryRagStoreHandler::new(store),
        )
        .await;
    server
        .register_prompt(ExtractAnswerPrompt::definition(), ExtractAnswerPrompt)
        .await;
    server
        .register_prompt(
            SummarizeDocumentsPrompt::definition(),
            SummarizeDocumentsPrompt,
        )
        .await;

    server
}
