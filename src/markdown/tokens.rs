//! Block-level lexing and the re-render gate.
//!
//! Every chunk of a stream re-lexes the whole accumulated document, so two
//! things keep that cheap: the cache skips lexing entirely when the input
//! string is unchanged, and `tokens_equal` decides structurally whether the
//! renderer needs to recompute anything at all. Equality is structural on
//! purpose — each lex produces a fresh allocation, so identity comparison
//! would re-render on every chunk.

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag};

use super::highlight::strip_stale_spans;

/// One top-level markdown block.
#[derive(Debug, Clone)]
pub enum Token {
    /// Fenced or indented code: compared by content and language.
    Code { language: String, text: String },
    /// Lists are rendered separately downstream; compared by raw source.
    List { raw: String },
    /// Everything else, pre-rendered to HTML; compared by raw source.
    Other {
        raw: String,
        html: String,
        block_type: &'static str,
    },
}

fn parse_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render a markdown fragment to HTML.
pub fn render_html(fragment: &str) -> String {
    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(fragment, parse_options()));
    out
}

/// Lex `content` into top-level block tokens.
pub fn lex(content: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;

    // State of the top-level block currently being walked.
    let mut block_range = 0..0;
    let mut block_kind = BlockKind::Other("paragraph");
    let mut code_lang = String::new();
    let mut code_text = String::new();

    for (event, range) in Parser::new_ext(content, parse_options()).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    // Start events span the whole element in the source.
                    block_range = range.clone();
                    block_kind = match &tag {
                        Tag::CodeBlock(kind) => {
                            code_text.clear();
                            code_lang = match kind {
                                CodeBlockKind::Fenced(info) => info.trim().to_string(),
                                CodeBlockKind::Indented => String::new(),
                            };
                            BlockKind::Code
                        }
                        Tag::List(_) => BlockKind::List,
                        other => BlockKind::Other(block_type_name(other)),
                    };
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let raw = content[block_range.clone()].to_string();
                    tokens.push(match block_kind {
                        BlockKind::Code => Token::Code {
                            language: std::mem::take(&mut code_lang),
                            text: strip_stale_spans(&code_text),
                        },
                        BlockKind::List => Token::List { raw },
                        BlockKind::Other(block_type) => Token::Other {
                            html: render_html(&raw),
                            raw,
                            block_type,
                        },
                    });
                }
            }
            Event::Text(text) => {
                if depth > 0 && matches!(block_kind, BlockKind::Code) {
                    code_text.push_str(&text);
                }
            }
            Event::Rule if depth == 0 => {
                let raw = content[range.clone()].to_string();
                tokens.push(Token::Other {
                    html: render_html(&raw),
                    raw,
                    block_type: "hr",
                });
            }
            _ => {}
        }
    }

    tokens
}

enum BlockKind {
    Code,
    List,
    Other(&'static str),
}

fn block_type_name(tag: &Tag) -> &'static str {
    match tag {
        Tag::Paragraph => "paragraph",
        Tag::Heading { .. } => "heading",
        Tag::BlockQuote(_) => "blockquote",
        Tag::HtmlBlock => "html",
        Tag::Table(_) => "table",
        Tag::FootnoteDefinition(_) => "footnote",
        _ => "block",
    }
}

/// Structural token-list equality: same length, pairwise same kind, code
/// compared by `(text, language)`, everything else by raw source.
pub fn tokens_equal(a: &[Token], b: &[Token]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(ta, tb)| match (ta, tb) {
        (
            Token::Code {
                language: la,
                text: xa,
            },
            Token::Code {
                language: lb,
                text: xb,
            },
        ) => xa == xb && la == lb,
        (Token::List { raw: ra }, Token::List { raw: rb }) => ra == rb,
        (Token::Other { raw: ra, .. }, Token::Other { raw: rb, .. }) => ra == rb,
        _ => false,
    })
}

/// Memoizes the most recent lexing: re-lexes only when the input string
/// actually changed.
#[derive(Default)]
pub struct TokenCache {
    content: String,
    tokens: Vec<Token>,
    lex_count: usize,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_tokens(&mut self, content: &str) -> &[Token] {
        if content != self.content {
            self.tokens = lex(content);
            self.content = content.to_string();
            self.lex_count += 1;
        }
        &self.tokens
    }

    /// How many times the lexer actually ran.
    pub fn lex_count(&self) -> usize {
        self.lex_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<&'static str> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Code { .. } => "code",
                Token::List { .. } => "list",
                Token::Other { block_type, .. } => block_type,
            })
            .collect()
    }

    // ── Lexing ──

    #[test]
    fn lexes_mixed_document_into_blocks() {
        let doc = "# Title\n\nSome paragraph.\n\n- one\n- two\n\n```rust\nlet x = 1;\n```\n";
        let tokens = lex(doc);
        assert_eq!(kinds(&tokens), vec!["heading", "paragraph", "list", "code"]);
    }

    #[test]
    fn code_token_captures_language_and_text() {
        let tokens = lex("```python:scripts/run.py\nprint('hi')\n```\n");
        match &tokens[0] {
            Token::Code { language, text } => {
                assert_eq!(language, "python:scripts/run.py");
                assert_eq!(text, "print('hi')\n");
            }
            other => panic!("expected code token, got {other:?}"),
        }
    }

    #[test]
    fn code_inside_list_stays_part_of_the_list() {
        let doc = "- item\n\n  ```rust\n  let x = 1;\n  ```\n";
        let tokens = lex(doc);
        assert_eq!(kinds(&tokens), vec!["list"]);
    }

    #[test]
    fn stale_highlight_spans_are_stripped_from_code() {
        let doc = "```\nlet <span class=\"hljs-keyword\">mut</span> x;\n```\n";
        match &lex(doc)[0] {
            Token::Code { text, .. } => assert_eq!(text, "let mut x;\n"),
            other => panic!("expected code token, got {other:?}"),
        }
    }

    #[test]
    fn html_block_is_an_other_token() {
        let tokens = lex("<div class=\"think-block\">hi</div>\n\nafter\n");
        assert_eq!(kinds(&tokens), vec!["html", "paragraph"]);
    }

    #[test]
    fn other_tokens_carry_rendered_html() {
        let tokens = lex("plain *emphasis* here\n");
        match &tokens[0] {
            Token::Other { html, .. } => assert!(html.contains("<em>emphasis</em>")),
            other => panic!("expected other token, got {other:?}"),
        }
    }

    #[test]
    fn thematic_break_is_tokenized() {
        let tokens = lex("above\n\n---\n\nbelow\n");
        assert_eq!(kinds(&tokens), vec!["paragraph", "hr", "paragraph"]);
    }

    #[test]
    fn empty_input_lexes_to_nothing() {
        assert!(lex("").is_empty());
    }

    // ── Equality ──

    #[test]
    fn equality_is_structural_not_identity() {
        let a = lex("hello *world*\n");
        let b = lex("hello *world*\n");
        assert!(tokens_equal(&a, &b));
    }

    #[test]
    fn equality_detects_text_change() {
        assert!(!tokens_equal(&lex("hello\n"), &lex("hello!\n")));
    }

    #[test]
    fn equality_detects_length_change() {
        assert!(!tokens_equal(&lex("one\n"), &lex("one\n\ntwo\n")));
    }

    #[test]
    fn code_equality_compares_language() {
        let a = lex("```rust\nx\n```\n");
        let b = lex("```python\nx\n```\n");
        assert!(!tokens_equal(&a, &b));
    }

    #[test]
    fn kind_mismatch_is_unequal() {
        let a = lex("- item\n");
        let b = lex("item\n");
        assert!(!tokens_equal(&a, &b));
    }

    // ── Cache ──

    #[test]
    fn cache_skips_relex_for_unchanged_content() {
        let mut cache = TokenCache::new();
        let first = cache.get_tokens("# hi\n").to_vec();
        let second = cache.get_tokens("# hi\n").to_vec();
        assert!(tokens_equal(&first, &second));
        assert_eq!(cache.lex_count(), 1);
    }

    #[test]
    fn cache_relexes_on_change() {
        let mut cache = TokenCache::new();
        cache.get_tokens("one\n");
        cache.get_tokens("one two\n");
        cache.get_tokens("one two\n");
        assert_eq!(cache.lex_count(), 2);
    }
}
