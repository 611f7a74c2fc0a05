//! Reasoning-block extraction.
//!
//! Splits raw model output at the end tag into a collapsible "thought"
//! segment plus the visible remainder, and emits the display markup. The
//! tag stored on the message wins over the currently configured tag: tags
//! are user-configurable and may have changed since the message streamed.

use regex::RegexBuilder;

use super::escape_html;
use super::latex::normalize_latex;
use crate::models::{Message, Role};

/// The derived view of a reasoning segment. Recomputed on every render,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ThinkBlock {
    /// Everything before the end tag, trimmed. The literal start tag is
    /// not stripped here; only the split point matters.
    pub hidden_text: String,
    /// Everything after the end tag, untouched.
    pub remainder: String,
    /// `" (12.3s)"`, or empty when no duration is known.
    pub duration_label: String,
    pub expanded: bool,
}

/// Inputs the preprocessor needs beyond the content itself.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessInput<'a> {
    /// Explicit per-message expansion state; overrides the default.
    pub expanded_hint: Option<bool>,
    /// The end tag captured when this message streamed, if any.
    pub stored_end_tag: Option<&'a str>,
    /// The currently configured end tag.
    pub current_end_tag: &'a str,
    /// Collapses reasoning by default while active.
    pub deep_query_mode: bool,
    /// Duration of the in-flight stream's thinking phase, if live.
    pub live_duration_ms: Option<u64>,
    /// History to consult for a persisted duration.
    pub history: &'a [Message],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessed {
    /// Markup ready for the lexer.
    pub markup: String,
    /// Present when an end tag was found in the content.
    pub think: Option<ThinkBlock>,
}

/// Transform raw model output into display markup: LaTeX normalization
/// first (code spans untouched), then the reasoning split. All branches
/// produce a valid string; there are no error conditions.
pub fn preprocess_markdown(content: &str, input: &PreprocessInput) -> Preprocessed {
    let normalized = normalize_latex(content);

    let split = find_end_tag(&normalized, input);
    let Some((index, tag_len)) = split else {
        return Preprocessed {
            markup: escape_bare_tags(&normalized, input.current_end_tag),
            think: None,
        };
    };

    let hidden_text = normalized[..index].trim().to_string();
    let remainder = normalized[index + tag_len..].to_string();
    let duration_label = duration_label(content, input);
    let expanded = input.expanded_hint.unwrap_or(!input.deep_query_mode);

    let block = ThinkBlock {
        hidden_text,
        remainder,
        duration_label,
        expanded,
    };
    Preprocessed {
        markup: block_markup(&block),
        think: Some(block),
    }
}

/// Locate the end tag: the message's own tag first, then the configured
/// default. Returns byte index and tag length.
fn find_end_tag(content: &str, input: &PreprocessInput) -> Option<(usize, usize)> {
    for tag in [input.stored_end_tag, Some(input.current_end_tag)]
        .into_iter()
        .flatten()
    {
        if tag.is_empty() {
            continue;
        }
        if let Some(index) = content.find(tag) {
            return Some((index, tag.len()));
        }
    }
    None
}

/// `" (5.0s)"` from the live stream if one is running, else from the
/// matching history entry, else empty. History matching compares the raw
/// content as stored, before LaTeX normalization.
fn duration_label(raw_content: &str, input: &PreprocessInput) -> String {
    let ms = input.live_duration_ms.or_else(|| {
        input
            .history
            .iter()
            .find(|msg| msg.role == Role::Assistant && msg.content.raw() == raw_content)
            .and_then(|msg| msg.thinking_time)
    });
    match ms {
        Some(ms) => format!(" ({:.1}s)", ms as f64 / 1000.0),
        None => String::new(),
    }
}

fn block_markup(block: &ThinkBlock) -> String {
    let (chevron, display) = if block.expanded {
        ("up", "block")
    } else {
        ("down", "none")
    };
    let hidden = escape_html(&block.hidden_text).replace('\n', "<br>");
    format!(
        "<div class=\"think-block\">\n\
         \x20   <button class=\"think-toggle\">\n\
         \x20       <span>Thought Process{label}</span>\n\
         \x20       <i class=\"fa fa-chevron-{chevron}\" aria-hidden=\"true\"></i>\n\
         \x20   </button>\n\
         \x20   <div class=\"think-content\" style=\"display: {display};\">{hidden}</div>\n\
         </div>{remainder}",
        label = block.duration_label,
        remainder = block.remainder,
    )
}

/// No tag found: escape any bare occurrences of the configured tag so a
/// partially streamed tag is never interpreted as literal markup.
fn escape_bare_tags(content: &str, current_end_tag: &str) -> String {
    if current_end_tag.is_empty() {
        return content.to_string();
    }
    let Ok(re) = RegexBuilder::new(&regex::escape(current_end_tag))
        .case_insensitive(true)
        .build()
    else {
        return content.to_string();
    };
    re.replace_all(content, |caps: &regex::Captures| escape_html(&caps[0]))
        .into_owned()
}
