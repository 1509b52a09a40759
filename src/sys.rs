//! Host-facing primitives: geometry helpers and the window surface.

pub mod geometry;
pub mod window;
