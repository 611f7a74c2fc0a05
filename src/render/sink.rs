//! Where diffed token lists go.
//!
//! The streaming renderer publishes through a [`RenderSink`] so the same
//! pipeline drives a real view, the virtual document, or a test collector.

use crate::markdown::{
    escape_html, highlight, render_html, split_language_and_path, Token,
};
use crate::render::selection::{capture_selection, restore_selection, VirtualDocument};

/// Assemble a frame's display HTML: code blocks get a title bar and
/// syntax highlighting, lists render from their raw source, everything
/// else was pre-rendered at lex time.
pub fn tokens_to_html(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Code { language, text } => {
                let (lang, path) = split_language_and_path(language);
                let title = path.unwrap_or_else(|| lang.clone());
                out.push_str("<div class=\"code-block\"><div class=\"code-title\"><span>");
                out.push_str(&escape_html(&title));
                out.push_str("</span></div><pre class=\"code-pre\"><code class=\"language-");
                out.push_str(&lang);
                out.push_str("\">");
                out.push_str(&highlight(text, language));
                out.push_str("</code></pre></div>");
            }
            Token::List { raw } => out.push_str(&render_html(raw)),
            Token::Other {
                html, block_type, ..
            } => {
                out.push_str("<div class=\"markdown-block ");
                out.push_str(block_type);
                out.push_str("\">");
                out.push_str(html);
                out.push_str("</div>");
            }
        }
    }
    out
}

/// Output port of the streaming renderer.
pub trait RenderSink {
    /// A changed token list is ready to display.
    fn render(&mut self, tokens: &[Token]);

    /// The first think-block of the turn just appeared; scroll once.
    fn scroll_to_bottom(&mut self);
}

/// Test sink: records every published frame and scroll request.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub frames: Vec<Vec<Token>>,
    pub scroll_requests: usize,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently rendered frame, if any.
    pub fn last_frame(&self) -> Option<&[Token]> {
        self.frames.last().map(|f| f.as_slice())
    }
}

impl RenderSink for CollectingSink {
    fn render(&mut self, tokens: &[Token]) {
        self.frames.push(tokens.to_vec());
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_requests += 1;
    }
}

/// Sink that materialises each token as one text leaf of a
/// [`VirtualDocument`] and keeps the user's selection stable across the
/// wholesale re-render: capture before the subtree is replaced, restore
/// after the new tree is committed. Also assembles the frame's display
/// HTML.
#[derive(Debug, Default)]
pub struct DocumentSink {
    doc: VirtualDocument,
    html: String,
    pub scroll_requests: usize,
}

impl DocumentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &VirtualDocument {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut VirtualDocument {
        &mut self.doc
    }

    /// Display HTML of the most recent frame.
    pub fn html(&self) -> &str {
        &self.html
    }

    fn leaf_text(token: &Token) -> &str {
        match token {
            Token::Code { text, .. } => text,
            Token::List { raw } => raw,
            Token::Other { raw, .. } => raw,
        }
    }
}

impl RenderSink for DocumentSink {
    fn render(&mut self, tokens: &[Token]) {
        let snapshot = capture_selection(&self.doc);
        self.html = tokens_to_html(tokens);
        self.doc
            .set_texts(tokens.iter().map(|t| Self::leaf_text(t).to_string()));
        if let Some(snapshot) = snapshot {
            restore_selection(&mut self.doc, &snapshot);
        }
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::lex;
    use crate::render::selection::TextDocument;

    // ── Collecting sink ──

    #[test]
    fn collecting_sink_records_frames_in_order() {
        let mut sink = CollectingSink::new();
        sink.render(&lex("one\n"));
        sink.render(&lex("one two\n"));
        assert_eq!(sink.frames.len(), 2);
        assert!(sink.last_frame().is_some());
    }

    // ── Document sink ──

    #[test]
    fn document_sink_builds_one_leaf_per_token() {
        let mut sink = DocumentSink::new();
        sink.render(&lex("para one\n\n- a\n- b\n\n```rust\nlet x;\n```\n"));
        assert_eq!(sink.document().text_leaves().len(), 3);
    }

    #[test]
    fn selection_survives_append_only_rerender() {
        let mut sink = DocumentSink::new();
        sink.render(&lex("stable paragraph\n\nsecond block\n"));
        sink.document_mut().select(0, 2, 0, 8);

        // New content appends a block; the selected leaves keep their
        // positions in the enumeration.
        sink.render(&lex("stable paragraph\n\nsecond block\n\nthird\n"));
        assert_eq!(
            sink.document().selection_indices(),
            Some((0, 2, 0, 8))
        );
    }

    #[test]
    fn selection_is_dropped_when_tree_shrinks_past_it() {
        let mut sink = DocumentSink::new();
        sink.render(&lex("one\n\ntwo\n\nthree\n"));
        sink.document_mut().select(2, 0, 2, 3);

        sink.render(&lex("one\n"));
        assert!(sink.document().selection().is_none());
    }

    // ── HTML assembly ──

    #[test]
    fn frame_html_highlights_code_and_titles_it() {
        let html = tokens_to_html(&lex("```rust:src/lib.rs\nlet x = 1;\n```\n"));
        assert!(html.contains("code-block"));
        assert!(html.contains("<span>src/lib.rs</span>"));
        assert!(html.contains("language-rust"));
        assert!(html.contains("<span")); // highlighter markup
    }

    #[test]
    fn frame_html_renders_lists_and_blocks() {
        let html = tokens_to_html(&lex("- item one\n\nplain *text*\n"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>item one</li>"));
        assert!(html.contains("markdown-block paragraph"));
        assert!(html.contains("<em>text</em>"));
    }

    #[test]
    fn document_sink_exposes_frame_html() {
        let mut sink = DocumentSink::new();
        sink.render(&lex("# Heading\n"));
        assert!(sink.html().contains("markdown-block heading"));
        assert!(sink.html().contains("<h1>Heading</h1>"));
    }

    #[test]
    fn scroll_requests_accumulate() {
        let mut sink = DocumentSink::new();
        sink.scroll_to_bottom();
        sink.scroll_to_bottom();
        assert_eq!(sink.scroll_requests, 2);
    }
}
