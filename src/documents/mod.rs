
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::{RagError, Result};

/// Inputs longer than this are always treated as document text
const MAX_PATH_LEN: usize = 2000;
/// Non-existent paths are only recognized below this length
const MAX_GUESSED_PATH_LEN: usize = 500;

/// Extensions read verbatim
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown", "rst", "csv", "log"];
/// Extensions reduced to visible text
pub const HTML_EXTENSIONS: &[&str] = &["html", "htm"];
/// Extensions converted through pandoc
pub const PANDOC_EXTENSIONS: &[&str] = &["docx", "odt", "rtf", "epub", "org", "tex"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Html,
    Pandoc,
}

impl DocumentFormat {
    /// Format for a path, judged by its extension
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = extension_of(path)?;
        if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Text)
        } else if HTML_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Html)
        } else if PANDOC_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Pandoc)
        } else {
            None
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Whether a path has an extension this module can parse
#[inline]
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_some()
}

/// Read a document from disk as plain text
#[inline]
pub fn parse_document(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(RagError::NotFound(path.to_path_buf()));
    }

    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        RagError::UnsupportedFormat(
            extension_of(path).map_or_else(|| "(no extension)".to_string(), |e| format!(".{}", e)),
        )
    })?;

    debug!("Parsing {} as {:?}", path.display(), format);
    match format {
        DocumentFormat::Text => {
            let bytes = fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        DocumentFormat::Html => {
            let bytes = fs::read(path)?;
            Ok(html_to_text(&String::from_utf8_lossy(&bytes)))
        }
        DocumentFormat::Pandoc => convert_with_pandoc(path),
    }
}

/// Visible text of an HTML document, one line per block of text
#[inline]
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut lines = Vec::new();
    collect_text(root, &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    lines.push(text);
                }
            }
            Node::Element(el) if matches!(el.name(), "script" | "style" | "noscript" | "head") => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, lines);
                }
            }
            _ => {}
        }
    }
}

fn convert_with_pandoc(path: &Path) -> Result<String> {
    let output = Command::new("pandoc")
        .arg("-t")
        .arg("plain")
        .arg("--wrap=none")
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                RagError::UnsupportedFormat(format!(
                    "{} requires pandoc, which is not installed",
                    path.display()
                ))
            } else {
                RagError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(RagError::Other(anyhow::anyhow!(
            "pandoc failed to convert {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Guess whether tool input names a file rather than carrying document text.
///
/// Existing files always count. Otherwise the input must be short, free of
/// whitespace, contain a path separator, not look like a URL, and end in a file
/// name with a short extension.
#[inline]
pub fn is_file_path(input: &str) -> bool {
    let input = input.trim();
    if input.is_empty() || input.len() > MAX_PATH_LEN || input.contains('\n') {
        return false;
    }

    if Path::new(input).is_file() {
        return true;
    }

    if input.len() >= MAX_GUESSED_PATH_LEN
        || input.contains("://")
        || input.contains(char::is_whitespace)
    {
        return false;
    }
    if !input.contains('/') && !input.contains('\\') {
        return false;
    }

    let file_name = input.rsplit(['/', '\\']).next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
