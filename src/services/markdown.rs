use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};

/// Renders post content from Markdown to sanitized HTML.
pub struct MarkdownRenderer {
    sanitizer: Builder<'static>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut sanitizer = Builder::default();
        sanitizer
            .add_generic_attributes(["class"])
            .link_rel(Some("noopener noreferrer"))
            .url_schemes(["http", "https", "mailto"].into_iter().collect());
        Self { sanitizer }
    }

    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        let parser = Parser::new_ext(markdown, options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        self.sanitizer.clean(&html_output).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_paragraph_and_emphasis() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("Some **bold** and *italic* text.");
        assert!(html.contains("<p>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn test_render_strips_scripts() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("Hello <script>alert('x')</script> world");
        assert!(!html.contains("<script>"));
        assert!(html.contains("Hello"));
    }

    #[test]
    fn test_render_drops_javascript_links() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[click](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }
}
