use std::fmt;

use kurbo::{Rect, Size};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use tracing::{debug, trace};

use super::error::{LayoutError, LayoutResult};
use super::gaps::GapModel;
use super::graph::{LayoutKind, NodeKind, Orientation, WindowMode};
use crate::sys::geometry::RectExt;
use crate::sys::window::WindowId;

slotmap::new_key_type! {
    pub struct NodeId;
}

pub fn workspace_key(workspace: usize) -> String { format!("ws{workspace}") }

pub fn monitor_key(monitor: usize, workspace: usize) -> String {
    format!("mo{monitor}ws{workspace}")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub layout: LayoutKind,
    pub mode: WindowMode,
    /// Share of the parent's split axis, in `0.0..=1.0`.
    pub percent: f64,
    pub rect: Option<Rect>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub window: Option<WindowId>,
    pub name: Option<String>,
    pub last_tab_focus: Option<NodeId>,
    /// Set on a drop target while a center drop would create a container.
    #[serde(skip)]
    pub create_con: bool,
    /// Set on the dragged window while a drop preview is shown.
    #[serde(skip)]
    pub detach_window: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            layout: LayoutKind::None,
            mode: WindowMode::Default,
            percent: 0.0,
            rect: None,
            parent: None,
            children: Vec::new(),
            window: None,
            name: None,
            last_tab_focus: None,
            create_con: false,
            detach_window: false,
        }
    }

    pub fn is_window(&self) -> bool { self.kind == NodeKind::Window }

    /// Everything except floating windows takes part in tiling.
    pub fn is_tiled(&self) -> bool { !self.is_window() || self.mode.is_tiled() }

    pub fn is_floating(&self) -> bool { self.is_window() && self.mode == WindowMode::Float }
}

/// The ways a node can be looked up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKey<'a> {
    Node(NodeId),
    Window(WindowId),
    Name(&'a str),
}

impl From<NodeId> for NodeKey<'_> {
    fn from(node: NodeId) -> Self { NodeKey::Node(node) }
}

impl From<WindowId> for NodeKey<'_> {
    fn from(wid: WindowId) -> Self { NodeKey::Window(wid) }
}

impl<'a> From<&'a str> for NodeKey<'a> {
    fn from(name: &'a str) -> Self { NodeKey::Name(name) }
}

impl fmt::Display for NodeKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKey::Node(node) => write!(f, "{node:?}"),
            NodeKey::Window(wid) => write!(f, "{wid:?}"),
            NodeKey::Name(name) => write!(f, "name {name:?}"),
        }
    }
}

/// Arena of layout nodes rooted at a single `Root` node.
#[derive(Clone, Debug, Serialize)]
pub struct LayoutTree {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    #[serde(skip)]
    gaps: GapModel,
}

impl Default for LayoutTree {
    fn default() -> Self { Self::new(GapModel::default()) }
}

impl LayoutTree {
    pub fn new(gaps: GapModel) -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = Node::new(NodeKind::Root);
        root.name = Some("root".to_string());
        let root = nodes.insert(root);
        LayoutTree { nodes, root, gaps }
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn gaps(&self) -> &GapModel { &self.gaps }

    pub fn gaps_mut(&mut self) -> &mut GapModel { &mut self.gaps }

    pub fn contains(&self, node: NodeId) -> bool { self.nodes.contains_key(node) }

    pub fn get(&self, node: NodeId) -> Option<&Node> { self.nodes.get(node) }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Node> { self.nodes.get_mut(node) }

    pub fn node(&self, node: NodeId) -> LayoutResult<&Node> {
        self.nodes.get(node).ok_or_else(|| LayoutError::NodeNotFound(format!("{node:?}")))
    }

    fn node_mut(&mut self, node: NodeId) -> LayoutResult<&mut Node> {
        self.nodes.get_mut(node).ok_or_else(|| LayoutError::NodeNotFound(format!("{node:?}")))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { self.nodes.get(node)?.parent }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> { self.nodes.get(node).map(|n| n.kind) }

    pub fn layout(&self, node: NodeId) -> LayoutKind {
        self.nodes.get(node).map(|n| n.layout).unwrap_or_default()
    }

    pub fn window_at(&self, node: NodeId) -> Option<WindowId> { self.nodes.get(node)?.window }

    pub fn rect(&self, node: NodeId) -> Option<Rect> { self.nodes.get(node)?.rect }

    pub fn set_rect(&mut self, node: NodeId, rect: Option<Rect>) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.rect = rect;
        }
    }

    pub fn set_name(&mut self, node: NodeId, name: String) {
        if let Some(node) = self.nodes.get_mut(node) {
            node.name = Some(name);
        }
    }

    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&c| c == node)
    }

    /// `node` followed by each of its ancestors up to the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.contains(node).then_some(node), move |&n| self.parent(n))
    }

    /// True when `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).skip(1).any(|n| n == ancestor)
    }

    pub fn monitor_of(&self, node: NodeId) -> Option<NodeId> {
        self.ancestors(node).find(|&n| self.kind(n) == Some(NodeKind::Monitor))
    }

    pub fn workspace_of(&self, node: NodeId) -> Option<NodeId> {
        self.ancestors(node).find(|&n| self.kind(n) == Some(NodeKind::Workspace))
    }

    /// Pre-order walk of the subtree rooted at `node`, `node` included.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    pub fn find_node<'a>(&self, key: impl Into<NodeKey<'a>>) -> Option<NodeId> {
        let key = key.into();
        if let NodeKey::Node(node) = key {
            return self.contains(node).then_some(node);
        }
        self.descendants(self.root).into_iter().find(|&id| {
            let node = &self.nodes[id];
            match key {
                NodeKey::Window(wid) => node.window == Some(wid),
                NodeKey::Name(name) => node.name.as_deref() == Some(name),
                NodeKey::Node(_) => false,
            }
        })
    }

    pub fn nodes_by_type(&self, kind: NodeKind) -> Vec<NodeId> {
        self.filter_nodes(|node| node.kind == kind)
    }

    pub fn nodes_by_layout(&self, layout: LayoutKind) -> Vec<NodeId> {
        self.filter_nodes(|node| node.kind.is_structural() && node.layout == layout)
    }

    pub fn nodes_by_mode(&self, mode: WindowMode) -> Vec<NodeId> {
        self.filter_nodes(|node| node.is_window() && node.mode == mode)
    }

    fn filter_nodes(&self, pred: impl Fn(&Node) -> bool) -> Vec<NodeId> {
        self.descendants(self.root).into_iter().filter(|&id| pred(&self.nodes[id])).collect()
    }

    /// Drops floating windows from `children`; structural nodes pass through.
    pub fn tiled_children(&self, children: &[NodeId]) -> Vec<NodeId> {
        children
            .iter()
            .copied()
            .filter(|&c| self.nodes.get(c).is_some_and(Node::is_tiled))
            .collect()
    }

    pub fn tiled_window_count(&self, node: NodeId) -> usize {
        self.descendants(node)
            .into_iter()
            .filter(|&id| {
                let node = &self.nodes[id];
                node.is_window() && node.is_tiled()
            })
            .count()
    }

    /// The visible child of a stacked or tabbed container.
    pub fn active_child(&self, group: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(group)?;
        node.last_tab_focus
            .filter(|focus| node.children.contains(focus))
            .or_else(|| node.children.first().copied())
    }

    pub fn create_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        window: Option<WindowId>,
        mode: Option<WindowMode>,
    ) -> LayoutResult<NodeId> {
        let index = self.nodes.get(parent).ok_or(LayoutError::InvalidParent(parent))?.children.len();
        self.create_at(parent, index, kind, window, mode)
    }

    pub fn insert_node_before(
        &mut self,
        reference: NodeId,
        kind: NodeKind,
        window: Option<WindowId>,
        mode: Option<WindowMode>,
    ) -> LayoutResult<NodeId> {
        let (parent, index) = self.position_of(reference)?;
        self.create_at(parent, index, kind, window, mode)
    }

    pub fn insert_node_after(
        &mut self,
        reference: NodeId,
        kind: NodeKind,
        window: Option<WindowId>,
        mode: Option<WindowMode>,
    ) -> LayoutResult<NodeId> {
        let (parent, index) = self.position_of(reference)?;
        self.create_at(parent, index + 1, kind, window, mode)
    }

    /// Creates a monitor or workspace node carrying its composite key.
    pub fn create_named_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: String,
        layout: LayoutKind,
    ) -> LayoutResult<NodeId> {
        let node = self.create_node(parent, kind, None, None)?;
        let entry = &mut self.nodes[node];
        entry.name = Some(name);
        entry.layout = layout;
        Ok(node)
    }

    fn position_of(&self, node: NodeId) -> LayoutResult<(NodeId, usize)> {
        let parent = self.node(node)?.parent.ok_or_else(|| {
            LayoutError::LayoutViolation("the root node has no siblings".to_string())
        })?;
        let index = self.index_in_parent(node).ok_or(LayoutError::InvalidParent(parent))?;
        Ok((parent, index))
    }

    fn create_at(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: NodeKind,
        window: Option<WindowId>,
        mode: Option<WindowMode>,
    ) -> LayoutResult<NodeId> {
        match self.nodes.get(parent) {
            Some(p) if p.kind.is_structural() => {}
            _ => return Err(LayoutError::InvalidParent(parent)),
        }
        let mut node = Node::new(kind);
        node.window = window;
        node.mode = match (kind, mode) {
            (_, Some(mode)) => mode,
            (NodeKind::Window, None) => WindowMode::Tile,
            _ => WindowMode::Default,
        };
        let tiled = node.is_tiled();
        let id = self.nodes.insert(node);
        self.link(id, parent, index);
        if tiled {
            self.reset_sibling_percent(parent);
        }
        trace!(?id, %kind, ?parent, "Created node");
        Ok(id)
    }

    fn link(&mut self, node: NodeId, parent: NodeId, index: usize) {
        let entry = &mut self.nodes[parent];
        let index = index.min(entry.children.len());
        entry.children.insert(index, node);
        if entry.layout.is_group() && entry.last_tab_focus.is_none() {
            entry.last_tab_focus = Some(node);
        }
        self.nodes[node].parent = Some(parent);
    }

    /// Unlinks `node` from its parent without touching percents or collapsing
    /// anything. Returns the former parent.
    pub fn detach(&mut self, node: NodeId) -> LayoutResult<NodeId> {
        let parent = self.node(node)?.parent.ok_or_else(|| {
            LayoutError::LayoutViolation("the root node cannot be detached".to_string())
        })?;
        let entry = &mut self.nodes[parent];
        entry.children.retain(|&c| c != node);
        if entry.last_tab_focus == Some(node) {
            entry.last_tab_focus = entry.children.first().copied();
        }
        self.nodes[node].parent = None;
        Ok(parent)
    }

    /// Links a detached node under `parent` at `index` (clamped).
    pub fn attach(&mut self, node: NodeId, parent: NodeId, index: usize) -> LayoutResult<()> {
        match self.nodes.get(parent) {
            Some(p) if p.kind.is_structural() => {}
            _ => return Err(LayoutError::InvalidParent(parent)),
        }
        if self.node(node)?.parent.is_some() {
            return Err(LayoutError::LayoutViolation(format!("{node:?} is still attached")));
        }
        if node == parent || self.is_ancestor(node, parent) {
            return Err(LayoutError::LayoutViolation(format!(
                "{node:?} cannot be placed inside its own subtree"
            )));
        }
        self.link(node, parent, index);
        Ok(())
    }

    pub fn attach_before(&mut self, node: NodeId, reference: NodeId) -> LayoutResult<()> {
        let (parent, index) = self.position_of(reference)?;
        self.attach(node, parent, index)
    }

    pub fn attach_after(&mut self, node: NodeId, reference: NodeId) -> LayoutResult<()> {
        let (parent, index) = self.position_of(reference)?;
        self.attach(node, parent, index + 1)
    }

    /// Removes `node` and its whole subtree. Containers left behind with one
    /// child or none are collapsed.
    pub fn remove_node(&mut self, node: NodeId) -> LayoutResult<Node> {
        if node == self.root {
            return Err(LayoutError::LayoutViolation("the root node cannot be removed".to_string()));
        }
        let was_tiled = self.node(node)?.is_tiled();
        let parent = self.detach(node)?;
        let mut stack = self.nodes[node].children.clone();
        while let Some(next) = stack.pop() {
            if let Some(removed) = self.nodes.remove(next) {
                stack.extend(removed.children);
            }
        }
        let removed = self
            .nodes
            .remove(node)
            .ok_or_else(|| LayoutError::NodeNotFound(format!("{node:?}")))?;
        if was_tiled {
            self.reset_sibling_percent(parent);
        }
        self.remove_unnecessary_container(parent);
        debug!(?node, kind = %removed.kind, "Removed node");
        Ok(removed)
    }

    /// Collapses a container holding at most one child, or only floating
    /// windows. A single tiled child takes over the container's slot and
    /// percent. Otherwise the container is dropped, any floating windows move
    /// up into its slot and the parent's percents are reset.
    pub fn remove_unnecessary_container(&mut self, container: NodeId) -> bool {
        let Some(entry) = self.nodes.get(container) else {
            return false;
        };
        if entry.kind != NodeKind::Container {
            return false;
        }
        let tiled = self.tiled_children(&entry.children);
        if entry.children.len() > 1 && !tiled.is_empty() {
            return false;
        }
        let Some(parent) = entry.parent else {
            return false;
        };
        let Some(index) = self.index_in_parent(container) else {
            return false;
        };
        let percent = entry.percent;
        let children = entry.children.clone();
        match tiled.as_slice() {
            [child] => {
                let child = *child;
                let parent_entry = &mut self.nodes[parent];
                parent_entry.children[index] = child;
                if parent_entry.last_tab_focus == Some(container) {
                    parent_entry.last_tab_focus = Some(child);
                }
                let child_entry = &mut self.nodes[child];
                child_entry.parent = Some(parent);
                child_entry.percent = percent;
                self.nodes.remove(container);
            }
            _ => {
                let parent_entry = &mut self.nodes[parent];
                parent_entry.children.splice(index..=index, children.iter().copied());
                if parent_entry.last_tab_focus == Some(container) {
                    parent_entry.last_tab_focus = parent_entry.children.first().copied();
                }
                for &child in &children {
                    self.nodes[child].parent = Some(parent);
                }
                self.nodes.remove(container);
                self.reset_sibling_percent(parent);
                self.remove_unnecessary_container(parent);
            }
        }
        trace!(?container, ?parent, "Collapsed container");
        true
    }

    /// Gives every tiled child of `parent` an equal share.
    pub fn reset_sibling_percent(&mut self, parent: NodeId) {
        let Some(entry) = self.nodes.get(parent) else {
            return;
        };
        let tiled = self.tiled_children(&entry.children);
        if tiled.is_empty() {
            return;
        }
        let share = 1.0 / tiled.len() as f64;
        for child in tiled {
            self.nodes[child].percent = share;
        }
    }

    /// Exchanges the tree positions of two nodes. Percents stay with the
    /// slots' original owners.
    pub fn swap_slots(&mut self, a: NodeId, b: NodeId) -> LayoutResult<()> {
        if a == b {
            return Err(LayoutError::NoOp("a node cannot be swapped with itself"));
        }
        if self.is_ancestor(a, b) || self.is_ancestor(b, a) {
            return Err(LayoutError::LayoutViolation(format!(
                "{a:?} and {b:?} are in an ancestor relationship"
            )));
        }
        let (parent_a, index_a) = self.position_of(a)?;
        let (parent_b, index_b) = self.position_of(b)?;
        self.nodes[parent_a].children[index_a] = b;
        self.nodes[parent_b].children[index_b] = a;
        self.nodes[a].parent = Some(parent_b);
        self.nodes[b].parent = Some(parent_a);
        if parent_a != parent_b {
            for (parent, old, new) in [(parent_a, a, b), (parent_b, b, a)] {
                let entry = &mut self.nodes[parent];
                if entry.last_tab_focus == Some(old) {
                    entry.last_tab_focus = Some(new);
                }
            }
        }
        Ok(())
    }

    /// Wraps `node` in a new container, or re-lays out its container when it
    /// is the container's only child.
    pub fn split(
        &mut self,
        node: NodeId,
        orientation: Orientation,
        group: Option<LayoutKind>,
    ) -> LayoutResult<NodeId> {
        let layout = match group {
            Some(group) if group.is_group() => group,
            _ => LayoutKind::from(orientation),
        };
        let entry = self.node(node)?;
        if !matches!(entry.kind, NodeKind::Window | NodeKind::Container) {
            return Err(LayoutError::LayoutViolation(format!(
                "only windows and containers can be split, not {}",
                entry.kind
            )));
        }
        let (percent, rect) = (entry.percent, entry.rect);
        let parent = entry.parent.ok_or(LayoutError::InvalidParent(node))?;
        let parent_entry = &self.nodes[parent];
        if parent_entry.layout.is_group() {
            return Err(LayoutError::LayoutViolation(format!(
                "cannot split inside a {} container",
                parent_entry.layout
            )));
        }
        if parent_entry.kind == NodeKind::Container && parent_entry.children.len() == 1 {
            self.set_layout(parent, layout)?;
            return Ok(parent);
        }

        let index = self.index_in_parent(node).ok_or(LayoutError::InvalidParent(parent))?;
        let mut container = Node::new(NodeKind::Container);
        container.layout = layout;
        container.percent = percent;
        container.rect = rect;
        let container = self.nodes.insert(container);
        self.nodes[parent].children[index] = container;
        self.nodes[container].parent = Some(parent);
        let parent_entry = &mut self.nodes[parent];
        if parent_entry.last_tab_focus == Some(node) {
            parent_entry.last_tab_focus = Some(container);
        }
        self.nodes[node].parent = None;
        self.link(node, container, 0);
        self.nodes[node].percent = 1.0;
        debug!(?node, ?container, %layout, "Split node");
        Ok(container)
    }

    /// Flips a split container between horizontal and vertical. Percents are
    /// kept as they are.
    pub fn toggle_layout(&mut self, node: NodeId) -> LayoutResult<LayoutKind> {
        let entry = self.node_mut(node)?;
        if !entry.layout.is_split() {
            return Err(LayoutError::NoOp("only split layouts can be toggled"));
        }
        entry.layout = entry.layout.toggled();
        Ok(entry.layout)
    }

    pub fn set_layout(&mut self, node: NodeId, layout: LayoutKind) -> LayoutResult<()> {
        let entry = self.node(node)?;
        if !entry.kind.is_structural() {
            return Err(LayoutError::LayoutViolation(format!("{node:?} is a window")));
        }
        if entry.layout == layout {
            return Err(LayoutError::NoOp("layout already set"));
        }
        let active = self.active_child(node);
        let entry = &mut self.nodes[node];
        entry.layout = layout;
        if layout.is_group() {
            entry.last_tab_focus = active;
        }
        Ok(())
    }

    /// Recomputes geometry under every monitor that has a work area and
    /// returns the frame of each window, gaps applied to tiled ones.
    pub fn render(&mut self, reason: &str) -> Vec<(WindowId, Rect)> {
        let mut frames = Vec::new();
        for monitor in self.nodes_by_type(NodeKind::Monitor) {
            let Some(rect) = self.nodes[monitor].rect else {
                trace!(?monitor, "Skipping monitor without a work area");
                continue;
            };
            self.layout_children(monitor, rect);
            for id in self.descendants(monitor) {
                let node = &self.nodes[id];
                let (Some(wid), Some(rect)) = (node.window, node.rect) else {
                    continue;
                };
                let frame = if node.is_tiled() {
                    self.process_gap(id).unwrap_or(rect)
                } else {
                    rect
                };
                frames.push((wid, frame));
            }
        }
        debug!(reason, frames = frames.len(), "Rendered layout");
        frames
    }

    fn layout_children(&mut self, node: NodeId, rect: Rect) {
        let entry = &self.nodes[node];
        let layout = entry.layout;
        let children = entry.children.clone();
        let tiled = self.tiled_children(&children);

        if layout.is_group() {
            for &child in &tiled {
                self.place(child, rect);
            }
        } else {
            let orientation = layout.split_orientation().unwrap_or(Orientation::Horizontal);
            let total: f64 = tiled.iter().map(|&c| self.nodes[c].percent).sum();
            let extent = rect.axis_len(orientation);
            let mut cursor = rect.axis_start(orientation);
            for &child in &tiled {
                let share = if total > 0.0 {
                    self.nodes[child].percent / total
                } else {
                    1.0 / tiled.len() as f64
                };
                let len = extent * share;
                self.place(child, rect.with_axis_span(orientation, cursor, len));
                cursor += len;
            }
        }

        let fallback = rect.centered(Size::new(rect.width() / 2.0, rect.height() / 2.0));
        for child in children.into_iter().filter(|c| !tiled.contains(c)) {
            let entry = &mut self.nodes[child];
            entry.rect.get_or_insert(fallback);
        }
    }

    fn place(&mut self, node: NodeId, rect: Rect) {
        self.nodes[node].rect = Some(rect);
        if !self.nodes[node].children.is_empty() {
            self.layout_children(node, rect);
        }
    }

    /// The node's rect with the effective gap removed from every side.
    pub fn process_gap(&self, node: NodeId) -> Option<Rect> {
        let rect = self.nodes.get(node)?.rect?;
        let tiled = self.monitor_of(node).map(|m| self.tiled_window_count(m)).unwrap_or(0);
        Some(rect.shrink(self.gaps.effective(tiled)))
    }

    pub fn clear_drop_markers(&mut self) {
        for (_, node) in self.nodes.iter_mut() {
            node.create_con = false;
            node.detach_window = false;
        }
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_tree(self.root);
        let mut out = String::new();
        let _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let entry = &self.nodes[node];
        let status = match entry.parent {
            Some(parent) if self.nodes[parent].layout.is_group() => {
                if self.active_child(parent) == Some(node) { "☒ " } else { "☐ " }
            }
            _ => "",
        };
        let desc = match entry.window {
            Some(wid) => {
                format!("{status}{} {wid:?} {} {:.2}", entry.kind, entry.mode, entry.percent)
            }
            None => format!(
                "{status}{} {} {}",
                entry.kind,
                entry.name.as_deref().unwrap_or("-"),
                entry.layout
            ),
        };
        let children: Vec<_> = entry.children.iter().map(|&c| self.ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}
