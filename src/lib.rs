//! chatstream — streaming chat client core for OpenAI-compatible LLM
//! backends.
//!
//! The centrepiece is the streaming render pipeline: chunks arrive from
//! the transport, accumulate, get scanned for the configurable reasoning
//! end tag, pass through LaTeX-safe markdown preprocessing and block-level
//! lexing, and reach the render sink only when the token list structurally
//! changed — with the user's text selection preserved across each
//! wholesale re-render. Around that sit conversation history persistence,
//! settings, and the chat service that orchestrates one turn at a time.

pub mod chat;
pub mod config;
pub mod db;
pub mod markdown;
pub mod models;
pub mod render;
pub mod settings;
pub mod stream;
pub mod transport;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for embedding applications: RUST_LOG wins, the
/// crate-level default otherwise.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("chatstream v{}", config::APP_VERSION);
}
