//! Chat orchestration — ties transport, streaming renderer, and the
//! conversation store together behind one service.

pub mod service;

pub use service::ChatService;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::stream::StreamError;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("no model selected")]
    NoModelSelected,

    #[error("no message at index {0}")]
    MessageNotFound(usize),

    #[error("conversation {0} not found")]
    ConversationNotFound(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("stream failed: {0}")]
    Stream(#[from] StreamError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}
