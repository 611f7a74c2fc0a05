//! The streaming turn: tag detection, thinking timer, cancellation, and
//! the per-chunk render pipeline.

pub mod renderer;
pub mod session;
pub mod tags;
pub mod timer;

pub use renderer::{StreamContext, StreamingRenderer, TurnEnd, TurnOptions, TurnOutput};
pub use session::{cancel_pair, CancelHandle, CancelToken, SessionSlot};
pub use tags::{has_end_tag, FALLBACK_END_TAGS};
pub use timer::StreamTimer;

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
}
