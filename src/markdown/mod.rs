//! Markdown processing for streamed model output.
//!
//! - `latex`: delimiter normalization that never touches code spans
//! - `think`: reasoning-block extraction and collapsible markup emission
//! - `tokens`: block-level lexing, memoization, and structural diffing
//! - `highlight`: syntax highlighting with an escaped-text fallback

pub mod highlight;
pub mod latex;
pub mod think;
pub mod tokens;

pub use highlight::{highlight, split_language_and_path, strip_stale_spans};
pub use latex::normalize_latex;
pub use think::{preprocess_markdown, PreprocessInput, Preprocessed, ThinkBlock};
pub use tokens::{lex, render_html, tokens_equal, Token, TokenCache};

/// HTML-escape `&`, `<` and `>`.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Format a user bubble: escape markup, then keep line breaks visible.
pub fn format_user_message(input: &str) -> String {
    escape_html(input).replace('\n', "<br>")
}
