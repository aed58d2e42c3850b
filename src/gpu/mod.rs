//! GPU plumbing: device ownership and binary buffer packing.

pub mod buffer_writer;
pub mod render_context;

pub use buffer_writer::BufferWriter;
pub use render_context::{RenderContext, RenderContextError};
