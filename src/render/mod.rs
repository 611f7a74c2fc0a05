//! Render-side components: the sink the streaming renderer publishes token
//! lists to, and selection preservation across wholesale re-renders.

pub mod selection;
pub mod sink;

pub use selection::{
    capture_selection, restore_selection, LeafId, RawSelection, SelectionSnapshot, TextDocument,
    VirtualDocument,
};
pub use sink::{tokens_to_html, CollectingSink, DocumentSink, RenderSink};
