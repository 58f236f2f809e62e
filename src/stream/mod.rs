//! Streaming access to large XML documents.
//!
//! [`ElementStream`] turns a document into enter/close events and keeps the
//! closed subtree available until the next pull. [`ElementStream::release`]
//! is the explicit reclaim step that keeps memory bounded by depth rather
//! than document size.

pub mod element;
pub mod emitter;
mod reclaim;

pub use element::{Element, ElementId, Node};
pub use emitter::{ElementStream, EventKind, StreamEvent};
