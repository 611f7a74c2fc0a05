//! LaTeX delimiter normalization.
//!
//! Models emit `\[..\]` / `\(..\)` display and inline math, but the
//! downstream math renderer expects `$$..$$` / `$..$`. Rewriting must never
//! reach into code: fenced blocks pass through untouched, then inline
//! single-backtick spans, and only the remaining plain text is rewritten.

use std::sync::LazyLock;

use regex::Regex;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]*`").expect("valid regex"));

// Non-greedy and single-line on purpose: a `\[` left open across lines is
// not a math span, it falls through to the lone-bracket escape below.
static DISPLAY_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\[(.*?)\\\]").expect("valid regex"));
static INLINE_MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\((.*?)\\\)").expect("valid regex"));

// One backslash + bracket gets doubled; an already-doubled `\\[` stays.
static LONE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\{1,2})\[").expect("valid regex"));
static LONE_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\\{1,2})\]").expect("valid regex"));

/// Normalize LaTeX delimiters in `content`, leaving fenced and inline code
/// spans byte-identical.
pub fn normalize_latex(content: &str) -> String {
    map_outside_matches(content, &FENCED_CODE, |outside| {
        map_outside_matches(outside, &INLINE_CODE, rewrite_plain_span)
    })
}

/// Apply `f` to the stretches of `text` not matched by `re`; matched
/// stretches are copied through unchanged.
fn map_outside_matches(text: &str, re: &Regex, f: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in re.find_iter(text) {
        out.push_str(&f(&text[last..m.start()]));
        out.push_str(m.as_str());
        last = m.end();
    }
    out.push_str(&f(&text[last..]));
    out
}

fn rewrite_plain_span(span: &str) -> String {
    let s = DISPLAY_MATH.replace_all(span, |caps: &regex::Captures| {
        format!("$${}$$", &caps[1])
    });
    let s = INLINE_MATH.replace_all(&s, |caps: &regex::Captures| format!("${}$", &caps[1]));
    let s = LONE_OPEN.replace_all(&s, |caps: &regex::Captures| {
        if caps[1].len() == 2 {
            caps[0].to_string()
        } else {
            r"\\[".to_string()
        }
    });
    let s = LONE_CLOSE.replace_all(&s, |caps: &regex::Captures| {
        if caps[1].len() == 2 {
            caps[0].to_string()
        } else {
            r"\\]".to_string()
        }
    });
    s.into_owned()
}
