//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the galton crate.
///
/// Only unrecoverable conditions live here. Capacity overflows are a
/// separate, non-fatal channel ([`crate::scene::CapacityError`]) absorbed
/// at the component boundary.
#[derive(Debug)]
pub enum GaltonError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// The device reported an unrecoverable error (lost / out of memory)
    /// during or after a submission.
    DeviceLost(String),
    /// Invalid board configuration.
    Config(String),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// Viewer event-loop failure.
    Viewer(String),
}

impl fmt::Display for GaltonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::DeviceLost(msg) => write!(f, "GPU device lost: {msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Viewer(msg) => write!(f, "viewer error: {msg}"),
        }
    }
}

impl std::error::Error for GaltonError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for GaltonError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for GaltonError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
