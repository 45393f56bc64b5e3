//! CLI output formatting utilities.

use crate::session::{Notice, NoticeLevel};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a session notice with the matching style.
    pub fn notice(notice: &Notice) {
        match notice.level {
            NoticeLevel::Success => Self::success(&notice.message),
            NoticeLevel::Info => Self::info(&notice.message),
            NoticeLevel::Warning => Self::warning(&notice.message),
            NoticeLevel::Error => Self::error(&notice.message),
        }
    }

    /// Print a context excerpt, cut at `max_len` characters.
    pub fn excerpt(content: &str, max_len: usize) {
        println!("   {}", style(content_preview(content, max_len)).dim());
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Flatten and truncate content with ellipsis.
fn content_preview(content: &str, max_len: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_len) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
