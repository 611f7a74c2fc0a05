//! The streaming turn driver.
//!
//! Consumes a chunked text stream and, on every chunk: appends to the
//! accumulator, checks for the end tag (freezing the thinking timer on the
//! first hit), preprocesses the accumulated text into display markup,
//! lexes it, and publishes to the sink only when the token list actually
//! changed. Ends in one of three ways: the transport completes
//! (`Completed`), cancellation wins (`Aborted`), or the transport fails
//! (error — the caller decides what happens to the partial text, and by
//! default nothing is persisted).

use futures_util::StreamExt;

use crate::markdown::{preprocess_markdown, tokens_equal, PreprocessInput, Token, TokenCache};
use crate::models::Message;
use crate::render::RenderSink;
use crate::transport::TextChunkStream;

use super::session::CancelToken;
use super::tags::has_end_tag;
use super::timer::StreamTimer;
use super::StreamError;

/// The explicit session context the pipeline reads instead of globals:
/// current tags, and whether deep-query mode is active.
#[derive(Debug, Clone)]
pub struct StreamContext {
    pub start_tag: String,
    pub end_tag: String,
    pub deep_query_mode: bool,
}

impl StreamContext {
    pub fn with_tags(start_tag: &str, end_tag: &str) -> Self {
        Self {
            start_tag: start_tag.to_string(),
            end_tag: end_tag.to_string(),
            deep_query_mode: false,
        }
    }
}

/// Per-turn inputs.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions<'a> {
    /// Previously generated text to continue from; empty for a fresh send.
    pub seed: String,
    /// Persisted thinking duration to resume the timer from.
    pub resume_from_ms: Option<u64>,
    /// The end tag stored on the message being continued.
    pub stored_end_tag: Option<&'a str>,
    /// Persisted expansion state of the message being continued.
    pub expanded_hint: Option<bool>,
    /// Conversation history, for the preprocessor's duration lookup.
    pub history: &'a [Message],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    Completed,
    Aborted,
}

#[derive(Debug)]
pub struct TurnOutput {
    /// Everything accumulated this turn, seed included.
    pub text: String,
    /// Cumulative thinking duration.
    pub thinking_time: Option<u64>,
    pub end: TurnEnd,
}

/// Drives one streaming turn at a time. Reusable across turns; per-turn
/// state resets at the start of `run_turn`.
#[derive(Default)]
pub struct StreamingRenderer {
    cache: TokenCache,
    last_tokens: Vec<Token>,
    scrolled_for_think: bool,
}

impl StreamingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one turn to completion, abort, or failure.
    ///
    /// Chunks are processed strictly in arrival order; cancellation is
    /// checked between chunks, so nothing is appended after an abort.
    pub async fn run_turn(
        &mut self,
        mut chunks: TextChunkStream,
        mut cancel: CancelToken,
        context: &StreamContext,
        options: TurnOptions<'_>,
        sink: &mut impl RenderSink,
    ) -> Result<TurnOutput, StreamError> {
        self.cache = TokenCache::new();
        self.last_tokens.clear();
        self.scrolled_for_think = false;

        let mut accumulated = options.seed.clone();
        let mut timer = match options.resume_from_ms {
            Some(ms) => StreamTimer::resume_from(ms),
            None => StreamTimer::new(),
        };
        timer.start();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let total = timer.stop();
                    tracing::info!(total_ms = total, chars = accumulated.len(), "stream aborted");
                    return Ok(TurnOutput {
                        text: accumulated,
                        thinking_time: Some(total),
                        end: TurnEnd::Aborted,
                    });
                }
                next = chunks.next() => match next {
                    Some(Ok(chunk)) => {
                        accumulated.push_str(&chunk);
                        self.process_chunk(&accumulated, &mut timer, context, &options, sink);
                    }
                    Some(Err(e)) if e.is_abort() => {
                        let total = timer.stop();
                        tracing::info!(total_ms = total, "transport reported abort");
                        return Ok(TurnOutput {
                            text: accumulated,
                            thinking_time: Some(total),
                            end: TurnEnd::Aborted,
                        });
                    }
                    Some(Err(e)) => {
                        timer.stop();
                        tracing::warn!(error = %e, "stream failed");
                        return Err(StreamError::Transport(e));
                    }
                    None => {
                        let total = timer.stop();
                        tracing::debug!(total_ms = total, "stream completed");
                        return Ok(TurnOutput {
                            text: accumulated,
                            thinking_time: Some(total),
                            end: TurnEnd::Completed,
                        });
                    }
                }
            }
        }
    }

    fn process_chunk(
        &mut self,
        accumulated: &str,
        timer: &mut StreamTimer,
        context: &StreamContext,
        options: &TurnOptions<'_>,
        sink: &mut impl RenderSink,
    ) {
        // First no-tag → tag transition ends the thinking phase. Later
        // chunks keep accumulating but never restart the timer.
        if timer.is_running() && has_end_tag(accumulated, &context.end_tag) {
            let thinking_ms = timer.stop();
            tracing::info!(thinking_ms, "end tag detected, thinking phase over");
        }

        let pre = preprocess_markdown(
            accumulated,
            &PreprocessInput {
                expanded_hint: options.expanded_hint,
                stored_end_tag: options.stored_end_tag,
                current_end_tag: &context.end_tag,
                deep_query_mode: context.deep_query_mode,
                live_duration_ms: timer.banked_ms(),
                history: options.history,
            },
        );

        let tokens = self.cache.get_tokens(&pre.markup);
        if !tokens_equal(tokens, &self.last_tokens) {
            self.last_tokens = tokens.to_vec();
            sink.render(&self.last_tokens);
        }

        // One-time scroll when the think block first appears this turn.
        if pre.think.is_some() && !self.scrolled_for_think {
            self.scrolled_for_think = true;
            sink.scroll_to_bottom();
        }
    }
}
