//! Shared utilities.
//!
//! Helpers for frame timing and hue-based color generation.

pub mod frame_timing;
pub mod hsv;
