//! End-tag detection on the accumulated stream.

/// End tags some providers emit regardless of what was requested.
pub const FALLBACK_END_TAGS: &[&str] = &["</think>", "<|end_of_thought|>"];

/// Whether `text` contains the configured end tag or any known fallback.
/// A plain substring test — tags are literal strings, never patterns —
/// called once per chunk on the whole accumulator. Absence of the tag is
/// the normal state while the model is still thinking.
pub fn has_end_tag(text: &str, configured_tag: &str) -> bool {
    FALLBACK_END_TAGS.iter().any(|tag| text.contains(tag))
        || (!configured_tag.is_empty() && text.contains(configured_tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_configured_tag() {
        assert!(has_end_tag("foo</think>bar", "</think>"));
    }

    #[test]
    fn start_tag_alone_is_not_enough() {
        assert!(!has_end_tag("foo<think>bar", "</think>"));
    }

    #[test]
    fn fallback_tags_match_regardless_of_configuration() {
        assert!(has_end_tag("done<|end_of_thought|>rest", "</reasoning>"));
        assert!(has_end_tag("done</think>rest", "</reasoning>"));
    }

    #[test]
    fn custom_tag_with_regex_metacharacters_is_literal() {
        assert!(has_end_tag("x[END].y", "[END]."));
        assert!(!has_end_tag("xAENDBy", "[END]."));
    }

    #[test]
    fn partial_tag_does_not_match() {
        assert!(!has_end_tag("foo</thi", "</think>"));
    }

    #[test]
    fn empty_configured_tag_never_matches() {
        assert!(!has_end_tag("anything", ""));
    }
}
