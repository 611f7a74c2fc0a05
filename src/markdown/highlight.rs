//! Syntax highlighting behind a total function: any failure (unknown
//! language, highlighter error) falls back to HTML-escaped plain text and
//! never propagates into the render loop.

use std::sync::LazyLock;

use regex::Regex;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::escape_html;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Streams sometimes echo highlighter markup back inside code fences.
static STALE_SPANS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<span class="hljs-[^"]*">|</span>"#).expect("valid regex"));

const THEME: &str = "InspiredGitHub";
const DEFAULT_LANGUAGE: &str = "bash";

/// Highlight `code` as `language`, returning HTML. Falls back to escaped
/// plain text when the language is unknown or highlighting fails.
pub fn highlight(code: &str, language: &str) -> String {
    let (token, _) = split_language_and_path(language);
    let syntax = SYNTAXES
        .find_syntax_by_token(&token)
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text());

    let Some(theme) = THEMES.themes.get(THEME) else {
        return escape_html(code);
    };

    match highlighted_html_for_string(code, &SYNTAXES, syntax, theme) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!(language = %token, error = %e, "highlighting failed, falling back to plain text");
            escape_html(code)
        }
    }
}

/// Split a fence info string of the form `lang:path/to/file` into the
/// lowercased language token and an optional display filename. An empty
/// info string defaults to bash.
pub fn split_language_and_path(info: &str) -> (String, Option<String>) {
    let info = info.trim();
    let (lang, path) = match info.split_once(':') {
        Some((lang, path)) => (lang, Some(path.to_string()).filter(|p| !p.is_empty())),
        None => (info, None),
    };
    let lang = if lang.is_empty() {
        DEFAULT_LANGUAGE.to_string()
    } else {
        lang.to_lowercase()
    };
    (lang, path)
}

/// Remove stale highlighter spans a model may have copied into a fence.
pub fn strip_stale_spans(code: &str) -> String {
    STALE_SPANS.replace_all(code, "").into_owned()
}
