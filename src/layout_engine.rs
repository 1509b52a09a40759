//! Tree-based tiling layout: the node arena, the operations that reshape it
//! and the engine that turns host events into window frames.

mod drop;
pub mod engine;
mod error;
mod gaps;
pub(crate) mod graph;
mod navigation;
pub mod resize;
mod tree;

pub use drop::{
    DropAction, DropContext, DropEngine, DropMargins, DropPlan, DropPreview, DropRegion,
    PreviewStyle, plan_drop,
};
pub use engine::{DeferredAction, EventResponse, GrabKind, LayoutCommand, LayoutEngine};
pub use error::{LayoutError, LayoutResult};
pub use gaps::GapModel;
pub use graph::{Direction, LayoutKind, NodeKind, Orientation, WindowMode};
pub use resize::{MIN_PERCENT, ResizeEdges, ResizeEngine};
pub use tree::{LayoutTree, Node, NodeId, NodeKey, monitor_key, workspace_key};
