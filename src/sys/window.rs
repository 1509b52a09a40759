//! The window surface the engine consumes from its host.
//!
//! The layout engine never owns windows. It only stores [`WindowId`]s and asks
//! a [`WindowHandle`] for geometry and placement when a window is tracked or a
//! grab starts. Everything else (creation, destruction, painting) belongs to
//! the host shell.

use std::fmt;

use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Opaque identity of a host window. Equality is the only thing the engine
/// relies on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(raw: u64) -> Self { Self(raw) }
}

impl fmt::Debug for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "WindowId({})", self.0) }
}

pub trait WindowHandle {
    fn id(&self) -> WindowId;

    fn frame_rect(&self) -> Rect;

    fn set_frame_rect(&mut self, rect: Rect);

    fn monitor_index(&self) -> usize;

    fn workspace_index(&self) -> usize;

    fn raise(&mut self);

    fn activate(&mut self);

    /// Dialogs, popups and other transient windows should start floating.
    fn is_floating_hint(&self) -> bool { false }
}
