//! Per-block HTML preview
//!
//! Each block is rendered independently through the converter, so one
//! failing block never blanks its neighbours. Results are memoized on the
//! exact block content.

use std::collections::HashMap;

use crate::converter::Converter;
use crate::editing::Document;
use crate::models::{Block, BlockId};

const MATHJAX_SCRIPT: &str = r#"<script>
window.MathJax = {
  tex: { inlineMath: [['$', '$'], ['\\(', '\\)']], displayMath: [['$$', '$$'], ['\\[', '\\]']], processEscapes: true },
  options: { skipHtmlTags: ['script', 'noscript', 'style', 'textarea', 'pre', 'code'] }
};
</script>
<script id="MathJax-script" async src="https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js"></script>"#;

const PAGE_STYLE: &str = r#"<style>
.block-preview-wrapper { border-bottom: 1px solid #ddd; padding: 5px 0; }
.block-preview-error { color: #b00020; font-family: monospace; white-space: pre-wrap; }
</style>"#;

/// Rendered preview of one block
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Preview {
    Html(String),
    Error { block_id: BlockId, message: String },
}

impl Preview {
    pub fn is_error(&self) -> bool {
        matches!(self, Preview::Error { .. })
    }

    /// HTML for display; errors become an inline marker
    pub fn to_html(&self) -> String {
        match self {
            Preview::Html(html) => html.clone(),
            Preview::Error { block_id, message } => format!(
                r#"<div class="block-preview-error">Error rendering block {}: {}</div>"#,
                html_escape::encode_text(block_id.as_str()),
                html_escape::encode_text(message)
            ),
        }
    }
}

/// Memoizing front for `markdown_to_html`
#[derive(Debug)]
pub struct PreviewCache<C> {
    converter: C,
    rendered: HashMap<String, String>,
}

impl<C: Converter> PreviewCache<C> {
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            rendered: HashMap::new(),
        }
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Render one block, reusing a previous result for identical content
    pub fn render(&mut self, block: &Block) -> Preview {
        if let Some(html) = self.rendered.get(&block.content) {
            return Preview::Html(html.clone());
        }

        match self.converter.markdown_to_html(&block.content) {
            Ok(html) => {
                self.rendered.insert(block.content.clone(), html.clone());
                Preview::Html(html)
            }
            Err(e) => {
                log::warn!("Preview failed for block {}: {e}", block.id);
                Preview::Error {
                    block_id: block.id.clone(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Render every block in document order
    pub fn render_document(&mut self, document: &Document) -> Vec<(BlockId, Preview)> {
        document
            .iter()
            .map(|block| (block.id.clone(), self.render(block)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.rendered.clear();
    }

    pub fn len(&self) -> usize {
        self.rendered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty()
    }
}

/// Standalone HTML page showing every block's preview
pub fn render_page<C: Converter>(document: &Document, cache: &mut PreviewCache<C>) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Preview</title>\n",
    );
    page.push_str(PAGE_STYLE);
    page.push('\n');
    page.push_str(MATHJAX_SCRIPT);
    page.push_str("\n</head>\n<body>\n");

    for (id, preview) in cache.render_document(document) {
        page.push_str(&format!(
            "<div id=\"preview-block-{}\" class=\"block-preview-wrapper\">{}</div>\n",
            html_escape::encode_double_quoted_attribute(id.as_str()),
            preview.to_html()
        ));
    }

    page.push_str("</body>\n</html>\n");
    page
}
