use html2text::from_read;
use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").unwrap())
}

fn horizontal_whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\S\n]+").unwrap())
}

fn blank_lines() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\n(?:[^\S\n]*\n)+").unwrap())
}

/// Prepare raw input for narration.
///
/// HTML is flattened to text and URLs are dropped. Horizontal whitespace
/// collapses to a single space, but line breaks survive because the chunker
/// splits on them.
pub fn clean_text(text: &str) -> String {
    let plain_text = if looks_like_html(text) {
        from_read(text.as_bytes(), usize::MAX)
    } else {
        text.replace("\r\n", "\n")
    };

    let without_urls = url_pattern().replace_all(&plain_text, "");
    let collapsed = horizontal_whitespace().replace_all(&without_urls, " ");
    let paragraphs = blank_lines().replace_all(&collapsed, "\n\n");

    paragraphs
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn looks_like_html(text: &str) -> bool {
    let trimmed = text.trim_start();
    trimmed.starts_with('<') && trimmed.contains("</")
}
