//! Markdown → HTML conversion for description-like fields. The capability
//! is resolved once at construction: when disabled (or compiled out via the
//! `markdown` feature), `format` is the identity function. Formatting never
//! fails the caller.

use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct TextFormatter {
    enabled: bool,
}

impl TextFormatter {
    pub fn new(enable_markdown: bool) -> Self {
        let enabled = enable_markdown && cfg!(feature = "markdown");
        if enable_markdown && !enabled {
            warn!("markdown support requested but not compiled in — descriptions stay plain text");
        } else if enabled {
            info!("markdown support enabled — descriptions will be converted to HTML");
        }
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Convert `text` to HTML when markdown formatting is enabled; return it
    /// unchanged otherwise. Empty input is always returned as-is.
    pub fn format(&self, text: &str) -> String {
        if !self.enabled || text.is_empty() {
            return text.to_string();
        }
        render_markdown(text)
    }
}

#[cfg(feature = "markdown")]
fn render_markdown(text: &str) -> String {
    let mut options = comrak::Options::default();
    // Match the Azure DevOps rendering expectations: tables, fenced code
    // blocks, newline-to-<br>, and heading anchors for in-page navigation.
    options.extension.table = true;
    options.extension.header_ids = Some(String::new());
    options.render.hardbreaks = true;
    comrak::markdown_to_html(text, &options)
}

#[cfg(not(feature = "markdown"))]
fn render_markdown(text: &str) -> String {
    text.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_formatter_is_identity() {
        let f = TextFormatter::new(false);
        let input = "# Heading\n\nsome *markdown*";
        assert_eq!(f.format(input), input);
    }

    #[test]
    fn empty_input_stays_empty() {
        let f = TextFormatter::new(true);
        assert_eq!(f.format(""), "");
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn converts_basic_markdown() {
        let f = TextFormatter::new(true);
        let html = f.format("some *emphasis*");
        assert!(html.contains("<em>emphasis</em>"));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn converts_tables_and_fenced_code() {
        let f = TextFormatter::new(true);
        let html = f.format("| a | b |\n|---|---|\n| 1 | 2 |\n\n```\ncode\n```\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<code>"));
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn single_newlines_become_breaks() {
        let f = TextFormatter::new(true);
        let html = f.format("line one\nline two");
        assert!(html.contains("<br"));
    }
}
