use thiserror::Error;

use super::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Parent {0:?} is not in the layout tree")]
    InvalidParent(NodeId),
    #[error("No node matches {0}")]
    NodeNotFound(String),
    #[error("Layout violation: {0}")]
    LayoutViolation(String),
    #[error("Node {0:?} has no geometry yet")]
    GeometryUnavailable(NodeId),
    #[error("Nothing to do: {0}")]
    NoOp(&'static str),
}

impl LayoutError {
    /// Refusals and no-ops are expected while the user drives the layout and
    /// are only worth a debug line. Lookups that fail point at a desync with
    /// the host.
    pub fn is_refusal(&self) -> bool {
        matches!(self, LayoutError::LayoutViolation(_) | LayoutError::NoOp(_))
    }
}

pub type LayoutResult<T> = Result<T, LayoutError>;
