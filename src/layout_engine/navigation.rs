//! Directional focus, move and swap over the layout tree.
//!
//! Navigation is confined to one monitor. Stacked and tabbed containers are a
//! single slot when walking between siblings; only [`LayoutTree::focus`] looks
//! inside them.

use kurbo::Point;
use tracing::{debug, trace};

use super::error::{LayoutError, LayoutResult};
use super::graph::{Direction, NodeKind, Orientation};
use super::tree::{LayoutTree, NodeId};
use crate::sys::geometry::RectExt;

fn point_along(point: Point, orientation: Orientation) -> f64 {
    match orientation {
        Orientation::Horizontal => point.x,
        Orientation::Vertical => point.y,
    }
}

impl LayoutTree {
    /// The adjacent tiled sibling of `from` in `direction`, if its parent
    /// splits along the direction's axis.
    fn move_over(&self, from: NodeId, direction: Direction) -> Option<NodeId> {
        let parent = self.parent(from)?;
        if self.layout(parent).split_orientation() != Some(direction.orientation()) {
            return None;
        }
        let siblings = self.tiled_children(self.children(parent));
        let position = siblings.iter().position(|&s| s == from)?;
        if direction.is_forward() {
            siblings.get(position + 1).copied()
        } else {
            position.checked_sub(1).map(|i| siblings[i])
        }
    }

    /// Walks down from `target` to the node a user arriving from `direction`
    /// would land on. Groups and windows are terminal.
    fn descend_into_target(
        &self,
        target: NodeId,
        direction: Direction,
        reference: Option<Point>,
    ) -> NodeId {
        let mut current = target;
        loop {
            let layout = self.layout(current);
            if self.kind(current) == Some(NodeKind::Window) || layout.is_group() {
                return current;
            }
            let children = self.tiled_children(self.children(current));
            let next = if layout.split_orientation() == Some(direction.orientation()) {
                let edge = if direction.is_forward() { children.first() } else { children.last() };
                edge.copied()
            } else {
                let perpendicular = direction.orientation().other();
                reference
                    .and_then(|point| {
                        let coord = point_along(point, perpendicular);
                        children.iter().copied().find(|&child| {
                            self.rect(child).is_some_and(|rect| {
                                let start = rect.axis_start(perpendicular);
                                coord >= start && coord < start + rect.axis_len(perpendicular)
                            })
                        })
                    })
                    .or_else(|| children.first().copied())
            };
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }

    /// The tiled node next to `from` in `direction`, climbing through
    /// ancestors until a sibling exists. Stops at the monitor.
    pub fn next_visible(&self, from: NodeId, direction: Direction) -> Option<NodeId> {
        if self.get(from)?.is_floating() {
            return None;
        }
        let reference = self.rect(from).map(|rect| rect.center());
        for node in self.ancestors(from) {
            if !matches!(self.kind(node), Some(NodeKind::Window | NodeKind::Container)) {
                break;
            }
            if let Some(sibling) = self.move_over(node, direction) {
                let target = self.descend_into_target(sibling, direction, reference);
                trace!(?from, ?direction, ?target, "Found neighbor");
                return Some(target);
            }
        }
        None
    }

    /// Resolves a group or container down to the window that would receive
    /// focus.
    fn resolve_focus(&self, mut node: NodeId, direction: Direction) -> Option<NodeId> {
        loop {
            if self.kind(node)? == NodeKind::Window {
                return Some(node);
            }
            node = if self.layout(node).is_group() {
                self.active_child(node)?
            } else {
                let descended = self.descend_into_target(node, direction, None);
                if descended == node {
                    return None;
                }
                descended
            };
        }
    }

    /// Marks `node` as the active child of every group it sits in.
    pub fn select_tabs(&mut self, node: NodeId) {
        let path: Vec<_> = self.ancestors(node).collect();
        for pair in path.windows(2) {
            let (child, parent) = (pair[0], pair[1]);
            if let Some(entry) = self.get_mut(parent) {
                if entry.layout.is_group() {
                    entry.last_tab_focus = Some(child);
                }
            }
        }
    }

    /// The window that should take focus when moving from `node` in
    /// `direction`. Moves between tabs first when the direction runs along
    /// the group's axis.
    pub fn focus(&mut self, node: NodeId, direction: Direction) -> Option<NodeId> {
        let tab = self.parent(node).and_then(|parent| {
            if self.layout(parent).group_orientation() != Some(direction.orientation()) {
                return None;
            }
            let tabs = self.tiled_children(self.children(parent));
            let position = tabs.iter().position(|&t| t == node)?;
            if direction.is_forward() {
                tabs.get(position + 1).copied()
            } else {
                position.checked_sub(1).map(|i| tabs[i])
            }
        });
        let target = tab.or_else(|| self.next_visible(node, direction))?;
        let window = self.resolve_focus(target, direction)?;
        self.select_tabs(window);
        debug!(?node, ?direction, ?window, "Focus moved");
        Some(window)
    }

    /// Moves `node` next to its neighbor in `direction`.
    pub fn move_node(&mut self, node: NodeId, direction: Direction) -> bool {
        let Some(target) = self.next_visible(node, direction) else {
            debug!(?node, ?direction, "Move reached the monitor boundary");
            return false;
        };
        let same_parent = self.parent(node) == self.parent(target);
        // Within one parent the node hops over the target; entering another
        // container it lands on the near side of the target.
        let after = direction.is_forward() == same_parent;
        let result = self.relocate(node, target, after);
        match result {
            Ok(()) => {
                debug!(?node, ?direction, ?target, "Moved node");
                true
            }
            Err(err) => {
                debug!(?node, ?direction, %err, "Move refused");
                false
            }
        }
    }

    fn relocate(&mut self, node: NodeId, target: NodeId, after: bool) -> LayoutResult<()> {
        let old_parent = self.detach(node)?;
        if after {
            self.attach_after(node, target)?;
        } else {
            self.attach_before(node, target)?;
        }
        let new_parent = self.parent(node).ok_or(LayoutError::InvalidParent(target))?;
        self.reset_sibling_percent(old_parent);
        self.reset_sibling_percent(new_parent);
        self.remove_unnecessary_container(old_parent);
        Ok(())
    }

    /// Exchanges the tree positions of `a` and `b`.
    pub fn swap_pairs(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> LayoutResult<()> {
        let (Some(a), Some(b)) = (a, b) else {
            return Err(LayoutError::NoOp("swap needs two nodes"));
        };
        self.swap_slots(a, b)
    }

    /// Exchanges positions and percents, so the two nodes trade geometry.
    pub fn swap(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> LayoutResult<()> {
        self.swap_pairs(a, b)?;
        let (Some(a), Some(b)) = (a, b) else {
            return Ok(());
        };
        let percent_a = self.node(a)?.percent;
        let percent_b = self.node(b)?.percent;
        if let Some(entry) = self.get_mut(a) {
            entry.percent = percent_b;
        }
        if let Some(entry) = self.get_mut(b) {
            entry.percent = percent_a;
        }
        debug!(?a, ?b, "Swapped nodes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::tree::tests::{add_window, no_gaps, single_monitor};
    use crate::layout_engine::LayoutKind;

    fn abc() -> (LayoutTree, NodeId, [NodeId; 3]) {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        let c = add_window(&mut tree, mon, 3);
        tree.render("setup");
        (tree, mon, [a, b, c])
    }

    #[test]
    fn next_visible_walks_siblings() {
        let (tree, _, [a, b, c]) = abc();
        assert_eq!(tree.next_visible(a, Direction::Right), Some(b));
        assert_eq!(tree.next_visible(b, Direction::Right), Some(c));
        assert_eq!(tree.next_visible(c, Direction::Left), Some(b));
        assert_eq!(tree.next_visible(c, Direction::Right), None);
        assert_eq!(tree.next_visible(a, Direction::Up), None);
    }

    #[test]
    fn next_visible_climbs_out_of_containers() {
        let (mut tree, _, [a, b, c]) = abc();
        let container = tree.split(b, Orientation::Vertical, None).unwrap();
        let d = add_window(&mut tree, container, 4);
        tree.render("split");

        assert_eq!(tree.next_visible(d, Direction::Up), Some(b));
        assert_eq!(tree.next_visible(d, Direction::Right), Some(c));
        assert_eq!(tree.next_visible(b, Direction::Left), Some(a));
        // Entering the vertical container from the side picks the child level
        // with the origin's center (y = 250 is d's top edge).
        assert_eq!(tree.next_visible(a, Direction::Right), Some(d));
    }

    #[test]
    fn groups_are_one_slot() {
        let (mut tree, _, [a, b, _]) = abc();
        let group = tree.split(b, Orientation::Horizontal, Some(LayoutKind::Tabbed)).unwrap();
        let e = add_window(&mut tree, group, 5);
        tree.render("group");

        assert_eq!(tree.next_visible(a, Direction::Right), Some(group));
        assert_eq!(tree.next_visible(e, Direction::Left), Some(a));

        tree.get_mut(group).unwrap().last_tab_focus = Some(e);
        assert_eq!(tree.focus(a, Direction::Right), Some(e));
    }

    #[test]
    fn focus_moves_between_tabs_along_group_axis() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let x = add_window(&mut tree, mon, 1);
        let group = tree.split(x, Orientation::Horizontal, Some(LayoutKind::Tabbed)).unwrap();
        let y = add_window(&mut tree, group, 2);
        tree.render("tabs");

        assert_eq!(tree.focus(x, Direction::Right), Some(y));
        assert_eq!(tree.get(group).unwrap().last_tab_focus, Some(y));
        assert_eq!(tree.focus(y, Direction::Left), Some(x));
        assert_eq!(tree.focus(x, Direction::Down), None);
    }

    #[test]
    fn move_node_hops_over_sibling() {
        let (mut tree, mon, [a, b, c]) = abc();
        tree.get_mut(a).unwrap().percent = 0.5;
        assert!(tree.move_node(a, Direction::Right));
        assert_eq!(tree.children(mon), &[b, a, c]);
        assert!(tree.children(mon).iter().all(|&n| tree.get(n).unwrap().percent == 1.0 / 3.0));
        assert!(!tree.move_node(c, Direction::Right));
    }

    #[test]
    fn move_node_collapses_origin() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        let container = tree.split(b, Orientation::Vertical, None).unwrap();
        let c = add_window(&mut tree, container, 3);
        tree.render("setup");

        assert!(tree.move_node(b, Direction::Left));
        assert_eq!(tree.children(mon), &[a, b, c]);
        assert!(!tree.contains(container));
        assert_eq!(tree.get(c).unwrap().percent, 1.0 / 3.0);
    }

    #[test]
    fn swap_exchanges_geometry() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let c = add_window(&mut tree, mon, 3);
        tree.get_mut(a).unwrap().percent = 0.7;
        tree.get_mut(c).unwrap().percent = 0.3;
        let before = tree.render("before");

        tree.swap(Some(a), Some(c)).unwrap();
        assert_eq!(tree.children(mon), &[c, a]);
        let after = tree.render("after");
        assert_eq!(after[0], (before[1].0, before[0].1));
        assert_eq!(after[1], (before[0].0, before[1].1));
    }

    #[test]
    fn swap_pairs_keeps_percents() {
        let (mut tree, mon, [a, b, _]) = abc();
        tree.get_mut(a).unwrap().percent = 0.5;
        tree.swap_pairs(Some(a), Some(b)).unwrap();
        assert_eq!(tree.children(mon)[1], a);
        assert_eq!(tree.get(a).unwrap().percent, 0.5);
    }

    #[test]
    fn swap_with_missing_node_is_noop() {
        let (mut tree, _, [a, _, _]) = abc();
        assert!(matches!(tree.swap(Some(a), None), Err(LayoutError::NoOp(_))));
    }
}
