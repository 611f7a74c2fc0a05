//! Chat transport — the HTTP boundary of the client core.
//!
//! The backend speaks plain streamed text: request bodies are JSON, chat
//! responses are raw UTF-8 chunks appended verbatim to the accumulator (no
//! envelope or framing). Everything the core needs is behind the
//! [`ChatTransport`] trait so tests can script streams in-process.

pub mod http;
pub mod mock;

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::ApiMessage;

pub use http::HttpTransport;
pub use mock::{ScriptStep, ScriptedTransport};

/// Raw text chunks as the transport delivers them, in arrival order.
pub type TextChunkStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("cannot reach server at {0}")]
    Connection(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Read(String),

    #[error("stream aborted")]
    Aborted,

    #[error("response parsing failed: {0}")]
    ResponseParsing(String),
}

impl TransportError {
    /// Cancellation, as opposed to a genuine failure. The two take
    /// different paths out of the streaming loop.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub model: String,
    pub system_content: String,
    pub parameters: BTreeMap<String, Value>,
    pub conversation: Vec<ApiMessage>,
    pub start_tag: String,
    pub is_deep_query_mode: bool,
}

/// Body of `POST /continue_generation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueRequest {
    pub conversation: Vec<ApiMessage>,
    pub model: String,
    pub system_content: String,
    pub parameters: BTreeMap<String, Value>,
}

/// Body of `POST /generate-title`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    pub message: String,
    pub model: String,
    pub assistant_response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleResponse {
    pub title: Option<String>,
}

/// The endpoints the client core consumes.
pub trait ChatTransport {
    /// Open a streaming chat completion.
    fn chat(
        &self,
        request: ChatRequest,
    ) -> impl std::future::Future<Output = Result<TextChunkStream, TransportError>> + Send;

    /// Continue the last assistant turn of `conversation`.
    fn continue_generation(
        &self,
        request: ContinueRequest,
    ) -> impl std::future::Future<Output = Result<TextChunkStream, TransportError>> + Send;

    /// Ask the backend for a short conversation title. Best-effort — the
    /// caller logs and ignores failures.
    fn generate_title(
        &self,
        request: TitleRequest,
    ) -> impl std::future::Future<Output = Result<TitleResponse, TransportError>> + Send;

    /// Models the backend currently serves.
    fn list_models(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<String>, TransportError>> + Send;
}
