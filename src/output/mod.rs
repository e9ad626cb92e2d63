// Terminal output helpers for the CLI: styled status lines and file progress


use std::io::IsTerminal;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
    Info,
    Warning,
    Highlight,
}

impl MessageKind {
    #[inline]
    pub fn icon(self) -> Option<&'static str> {
        match self {
            Self::Success => Some("✅"),
            Self::Error => Some("❌"),
            Self::Info => Some("📘"),
            Self::Warning => Some("⚠️"),
            Self::Highlight => None,
        }
    }
}

/// Colors are used only on a terminal and only when `NO_COLOR` is unset
#[inline]
pub fn colors_enabled(no_color: bool, is_tty: bool) -> bool {
    !no_color && is_tty
}

/// Whether stdout currently supports colored output
#[inline]
pub fn stdout_colors_enabled() -> bool {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
    colors_enabled(no_color, std::io::stdout().is_terminal())
}

/// Render a message with its icon, styled when `colors` is set
#[inline]
pub fn colorize(text: &str, kind: MessageKind, colors: bool) -> String {
    let line = match kind.icon() {
        Some(icon) => format!("{} {}", icon, text),
        None => text.to_string(),
    };

    let styled = style(line).force_styling(colors);
    let styled = match kind {
        MessageKind::Success => styled.green(),
        MessageKind::Error => styled.red(),
        MessageKind::Info => styled.blue(),
        MessageKind::Warning => styled.yellow(),
        MessageKind::Highlight => styled.cyan().bold(),
    };
    styled.to_string()
}

#[inline]
pub fn success(text: &str) -> String {
    colorize(text, MessageKind::Success, stdout_colors_enabled())
}

#[inline]
pub fn error(text: &str) -> String {
    colorize(text, MessageKind::Error, stdout_colors_enabled())
}

#[inline]
pub fn info(text: &str) -> String {
    colorize(text, MessageKind::Info, stdout_colors_enabled())
}

#[inline]
pub fn warning(text: &str) -> String {
    colorize(text, MessageKind::Warning, stdout_colors_enabled())
}

#[inline]
pub fn highlight(text: &str) -> String {
    colorize(text, MessageKind::Highlight, stdout_colors_enabled())
}

/// Per-file progress for batch indexing.
///
/// A bar is drawn only when more than one file is processed; otherwise the
/// messages go straight to stderr.
pub struct FileProgress {
    bar: Option<ProgressBar>,
}

impl FileProgress {
    #[inline]
    pub fn new(total_files: usize) -> Self {
        Self::with_visibility(total_files, total_files > 1)
    }

    /// Progress that never draws a bar
    #[inline]
    pub fn hidden(total_files: usize) -> Self {
        Self::with_visibility(total_files, false)
    }

    fn with_visibility(total_files: usize, visible: bool) -> Self {
        let bar = visible.then(|| {
            let bar = ProgressBar::new(total_files as u64);
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {wide_msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar
        });
        Self { bar }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    #[inline]
    pub fn start_file(&self, name: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Indexing {}", name));
        }
    }

    /// Print a line without tearing the bar
    #[inline]
    pub fn println(&self, message: &str) {
        match &self.bar {
            Some(bar) => bar.println(message),
            None => eprintln!("{}", message),
        }
    }

    #[inline]
    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.bar.as_ref().map_or(0, ProgressBar::position)
    }

    #[inline]
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
