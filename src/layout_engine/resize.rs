use bitflags::bitflags;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::error::{LayoutError, LayoutResult};
use super::graph::Direction;
use super::tree::{LayoutTree, NodeId};
use crate::sys::geometry::RectExt;

/// Smallest share either side of a resize pair may shrink to.
pub const MIN_PERCENT: f64 = 0.05;

bitflags! {
    /// Window edges held by a resize grab.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ResizeEdges: u8 {
        const LEFT   = 1 << 0;
        const RIGHT  = 1 << 1;
        const TOP    = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

impl ResizeEdges {
    /// The corner nearest to the pointer, for hosts that only report a
    /// resize started without saying which edges are held.
    pub fn from_pointer(pointer: Point, window_center: Point) -> Self {
        let horizontal =
            if pointer.x < window_center.x { ResizeEdges::LEFT } else { ResizeEdges::RIGHT };
        let vertical =
            if pointer.y < window_center.y { ResizeEdges::TOP } else { ResizeEdges::BOTTOM };
        horizontal | vertical
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        [
            (ResizeEdges::LEFT, Direction::Left),
            (ResizeEdges::RIGHT, Direction::Right),
            (ResizeEdges::TOP, Direction::Up),
            (ResizeEdges::BOTTOM, Direction::Down),
        ]
        .into_iter()
        .filter(move |(edge, _)| self.contains(*edge))
        .map(|(_, direction)| direction)
    }
}

/// How far the grabbed edge moved outwards along `direction`.
fn edge_delta(direction: Direction, initial: Rect, current: Rect) -> f64 {
    match direction {
        Direction::Left => initial.x0 - current.x0,
        Direction::Right => current.x1 - initial.x1,
        Direction::Up => initial.y0 - current.y0,
        Direction::Down => current.y1 - initial.y1,
    }
}

/// State of a live resize grab. Every step is computed from the percents
/// captured at grab begin, so replaying a frame gives the same result.
#[derive(Debug, Clone)]
pub struct ResizeEngine {
    node: NodeId,
    edges: ResizeEdges,
    initial_frame: Rect,
    snapshot: Vec<(NodeId, f64)>,
}

impl ResizeEngine {
    pub fn begin(
        tree: &LayoutTree,
        node: NodeId,
        edges: ResizeEdges,
        initial_frame: Rect,
    ) -> LayoutResult<Self> {
        let monitor = tree
            .monitor_of(node)
            .ok_or_else(|| LayoutError::NodeNotFound(format!("monitor of {node:?}")))?;
        let snapshot = tree
            .descendants(monitor)
            .into_iter()
            .filter_map(|id| tree.get(id).map(|n| (id, n.percent)))
            .collect();
        debug!(?node, ?edges, "Resize grab started");
        Ok(ResizeEngine { node, edges, initial_frame, snapshot })
    }

    pub fn node(&self) -> NodeId { self.node }

    fn initial_percent(&self, node: NodeId) -> Option<f64> {
        self.snapshot.iter().find(|(id, _)| *id == node).map(|(_, percent)| *percent)
    }

    /// Applies one live frame of the grabbed window. Returns true when any
    /// percent changed.
    pub fn update(&self, tree: &mut LayoutTree, current_frame: Rect) -> bool {
        let mut changed = false;
        for direction in self.edges.directions() {
            match self.resize_edge(tree, direction, current_frame) {
                Ok(()) => changed = true,
                Err(err) => debug!(node = ?self.node, ?direction, %err, "Resize step skipped"),
            }
        }
        changed
    }

    fn resize_edge(
        &self,
        tree: &mut LayoutTree,
        direction: Direction,
        current_frame: Rect,
    ) -> LayoutResult<()> {
        let pair = tree
            .next_visible(self.node, direction)
            .ok_or(LayoutError::NoOp("no neighbor behind the grabbed edge"))?;

        let node_path: Vec<_> = tree.ancestors(self.node).collect();
        let pair_path: Vec<_> = tree.ancestors(pair).collect();
        let common = node_path
            .iter()
            .copied()
            .find(|n| pair_path.contains(n))
            .ok_or(LayoutError::NoOp("nodes share no ancestor"))?;
        let under_common = |path: &[NodeId]| -> Option<NodeId> {
            let index = path.iter().position(|&n| n == common)?;
            index.checked_sub(1).map(|i| path[i])
        };
        let (Some(first), Some(second)) = (under_common(&node_path), under_common(&pair_path))
        else {
            return Err(LayoutError::NoOp("nodes are nested in each other"));
        };

        if tree.layout(common).split_orientation() != Some(direction.orientation()) {
            return Err(LayoutError::NoOp("common ancestor does not split along this axis"));
        }
        if tree.tiled_children(tree.children(common)).len() <= 1 {
            return Err(LayoutError::NoOp("nothing to share space with"));
        }
        let size = tree
            .rect(common)
            .ok_or(LayoutError::GeometryUnavailable(common))?
            .axis_len(direction.orientation());
        if size <= 0.0 {
            return Err(LayoutError::GeometryUnavailable(common));
        }

        let (Some(initial_first), Some(initial_second)) =
            (self.initial_percent(first), self.initial_percent(second))
        else {
            return Err(LayoutError::NoOp("pair was not part of the snapshot"));
        };
        let total = initial_first + initial_second;
        if total <= 2.0 * MIN_PERCENT {
            return Err(LayoutError::NoOp("pair is already at its minimum size"));
        }

        let delta = edge_delta(direction, self.initial_frame, current_frame) / size;
        let first_percent = (initial_first + delta).clamp(MIN_PERCENT, total - MIN_PERCENT);
        let second_percent = total - first_percent;
        if let Some(entry) = tree.get_mut(first) {
            entry.percent = first_percent;
        }
        if let Some(entry) = tree.get_mut(second) {
            entry.percent = second_percent;
        }
        trace!(?first, ?second, first_percent, second_percent, "Resized pair");
        Ok(())
    }

    /// Puts every percent back to its value at grab begin.
    pub fn cancel(self, tree: &mut LayoutTree) {
        for (node, percent) in self.snapshot {
            if let Some(entry) = tree.get_mut(node) {
                entry.percent = percent;
            }
        }
        debug!(node = ?self.node, "Resize grab cancelled");
    }
}
