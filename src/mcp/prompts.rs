//! Prompt templates that turn retrieved chunks into instructions for the client
//! model.

use crate::mcp::protocol::{GetPromptResult, Prompt, PromptArgument, PromptMessage, ToolContent};
use crate::mcp::server::PromptHandler;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use tracing::warn;

pub const DEFAULT_SUMMARY_LENGTH: &str = "200";

/// A retrieved chunk as passed in the `chunks` argument
#[derive(Debug, Clone, Deserialize)]
pub struct PromptChunk {
    #[serde(default)]
    pub text: String,
    #[serde(default = "unknown_source")]
    pub source: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

fn unknown_source() -> String {
    crate::store::UNKNOWN_SOURCE.to_string()
}

/// Decode the JSON-encoded chunk list, treating anything invalid as empty.
#[inline]
pub fn parse_chunks(raw: Option<&str>) -> Vec<PromptChunk> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Vec::new();
    };
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Ignoring invalid chunks argument: {}", e);
        Vec::new()
    })
}

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        description: Some(description.to_string()),
        required,
    }
}

fn user_message(text: String) -> PromptMessage {
    PromptMessage {
        role: "user".to_string(),
        content: ToolContent::Text { text },
    }
}

fn render_chunks(chunks: &[PromptChunk]) -> String {
    if chunks.is_empty() {
        return "(no documents were provided)\n".to_string();
    }

    let mut out = String::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let _ = write!(out, "[{}] Source: {}", i + 1, chunk.source);
        if let Some(distance) = chunk.distance {
            let _ = write!(out, " (distance: {:.4})", distance);
        }
        let _ = writeln!(out, "\n{}\n", chunk.text);
    }
    out
}

pub struct ExtractAnswerPrompt;

impl ExtractAnswerPrompt {
    #[inline]
    pub fn definition() -> Prompt {
        Prompt {
            name: "extract-answer".to_string(),
            description: Some(
                "Answer a question using only the retrieved document chunks, citing sources"
                    .to_string(),
            ),
            arguments: vec![
                argument("query", "The question to answer", true),
                argument(
                    "chunks",
                    "JSON array of retrieved chunks: [{text, source, distance?}]",
                    true,
                ),
            ],
        }
    }
}

impl PromptHandler for ExtractAnswerPrompt {
    #[inline]
    fn render(&self, arguments: &HashMap<String, String>) -> GetPromptResult {
        let query = arguments.get("query").map_or("", String::as_str);
        let chunks = parse_chunks(arguments.get("chunks").map(String::as_str));

        let mut text = String::new();
        let _ = writeln!(
            text,
            "Answer the question below using only the information in the provided documents."
        );
        let _ = writeln!(
            text,
            "Cite the source of every fact you use. If the documents do not contain the answer, say so.\n"
        );
        let _ = writeln!(text, "Question: {}\n", query);
        let _ = writeln!(text, "Documents:\n");
        text.push_str(&render_chunks(&chunks));

        GetPromptResult {
            description: Some(format!("Answer extraction for: {}", query)),
            messages: vec![user_message(text)],
        }
    }
}

pub struct SummarizeDocumentsPrompt;

impl SummarizeDocumentsPrompt {
    #[inline]
    pub fn definition() -> Prompt {
        Prompt {
            name: "summarize-documents".to_string(),
            description: Some("Summarize retrieved document chunks on a topic".to_string()),
            arguments: vec![
                argument("topic", "The topic the summary should focus on", true),
                argument(
                    "chunks",
                    "JSON array of retrieved chunks: [{text, source, distance?}]",
                    true,
                ),
                argument(
                    "max_length",
                    "Maximum summary length in words (default: 200)",
                    false,
                ),
            ],
        }
    }
}

impl PromptHandler for SummarizeDocumentsPrompt {
    #[inline]
    fn render(&self, arguments: &HashMap<String, String>) -> GetPromptResult {
        let topic = arguments.get("topic").map_or("", String::as_str);
        let max_length = arguments
            .get("max_length")
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_SUMMARY_LENGTH);
        let chunks = parse_chunks(arguments.get("chunks").map(String::as_str));

        let mut text = String::new();
        let _ = writeln!(
            text,
            "Summarize what the provided documents say about: {}\n",
            topic
        );
        let _ = writeln!(
            text,
            "Keep the summary under {} words and mention which sources each point comes from.\n",
            max_length
        );
        let _ = writeln!(text, "Documents:\n");
        text.push_str(&render_chunks(&chunks));

        GetPromptResult {
            description: Some(format!("Summary of documents about: {}", topic)),
            messages: vec![user_message(text)],
        }
    }
}
