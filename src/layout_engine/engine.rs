use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use super::drop::{DropEngine, DropPlan, DropPreview};
use super::error::{LayoutError, LayoutResult};
use super::gaps::GapModel;
use super::graph::{Direction, LayoutKind, NodeKind, Orientation, WindowMode};
use super::resize::{ResizeEdges, ResizeEngine};
use super::tree::{LayoutTree, NodeId, NodeKey, monitor_key, workspace_key};
use crate::common::collections::HashSet;
use crate::common::config::LayoutSettings;
use crate::model::{Queue, Task};
use crate::sys::window::{WindowHandle, WindowId};

const RENDER_TASK: &str = "render";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutCommand {
    MoveFocus(Direction),
    MoveNode(Direction),
    SwapWindows(Direction),
    Split(Orientation),
    ToggleLayout,
    SetLayout(LayoutKind),
    ToggleFloat,
    GapIncrease,
    GapDecrease,
    Rebalance,
    Debug,
}

/// Work the engine hands back to the host one tick at a time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredAction {
    Render { reason: String },
    Focus(WindowId),
    Raise(Vec<WindowId>),
}

#[derive(Debug, Default, Clone, PartialEq)]
#[must_use]
pub struct EventResponse {
    pub frames: Vec<(WindowId, Rect)>,
    pub raise_windows: Vec<WindowId>,
    pub focus_window: Option<WindowId>,
}

impl EventResponse {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.raise_windows.is_empty() && self.focus_window.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabKind {
    Move,
    Resize(ResizeEdges),
}

#[derive(Debug)]
struct Grab {
    window: WindowId,
    node: NodeId,
    kind: GrabKind,
    resize: Option<ResizeEngine>,
    plan: Option<DropPlan>,
}

#[derive(Serialize)]
struct EngineState<'a> {
    active_workspace: usize,
    focused_window: Option<WindowId>,
    monitors: &'a [Rect],
    tree: &'a LayoutTree,
}

pub struct LayoutEngine {
    tree: LayoutTree,
    queue: Queue<DeferredAction>,
    settings: LayoutSettings,
    drop_engine: DropEngine,
    monitors: Vec<Rect>,
    workspace_count: usize,
    active_workspace: usize,
    focused_window: Option<WindowId>,
    /// Windows whose host asked for them to float.
    floating_hints: HashSet<WindowId>,
    grab: Option<Grab>,
    preview: Option<DropPreview>,
    render_frozen: bool,
}

impl LayoutEngine {
    pub fn new(settings: &LayoutSettings) -> Self {
        LayoutEngine {
            tree: LayoutTree::new(GapModel::from_settings(&settings.gaps)),
            queue: Queue::new(),
            settings: settings.clone(),
            drop_engine: DropEngine::from_settings(&settings.drop),
            monitors: Vec::new(),
            workspace_count: 0,
            active_workspace: 0,
            focused_window: None,
            floating_hints: HashSet::default(),
            grab: None,
            preview: None,
            render_frozen: false,
        }
    }

    pub fn tree(&self) -> &LayoutTree { &self.tree }

    pub fn queue(&self) -> &Queue<DeferredAction> { &self.queue }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn active_workspace(&self) -> usize { self.active_workspace }

    pub fn workspace_count(&self) -> usize { self.workspace_count }

    pub fn focused_window(&self) -> Option<WindowId> { self.focused_window }

    /// The drop hint to paint, if a move grab is hovering a window.
    pub fn drop_preview(&self) -> Option<DropPreview> { self.preview }

    pub fn find_node<'a>(&self, key: impl Into<NodeKey<'a>>) -> Option<NodeId> {
        self.tree.find_node(key)
    }

    pub fn nodes_by_type(&self, kind: NodeKind) -> Vec<NodeId> { self.tree.nodes_by_type(kind) }

    pub fn nodes_by_layout(&self, layout: LayoutKind) -> Vec<NodeId> {
        self.tree.nodes_by_layout(layout)
    }

    pub fn nodes_by_mode(&self, mode: WindowMode) -> Vec<NodeId> {
        self.tree.nodes_by_mode(mode)
    }

    pub fn draw_tree(&self) -> String { self.tree.draw_tree() }

    pub fn serialize_state(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&EngineState {
            active_workspace: self.active_workspace,
            focused_window: self.focused_window,
            monitors: &self.monitors,
            tree: &self.tree,
        })
    }

    fn skips_workspace(&self, workspace: usize) -> bool {
        self.settings.tiling.skip_workspaces.contains(&workspace)
    }

    /// Whether windows on the handle's workspace are tiled at all.
    pub fn is_workspace_tiled<W: WindowHandle + ?Sized>(&self, window: &W) -> bool {
        !self.skips_workspace(window.workspace_index())
    }

    /// Applies new layout settings. Windows on newly skipped workspaces
    /// float; windows on workspaces no longer skipped tile again unless their
    /// host asked for them to float.
    pub fn set_layout_settings(&mut self, settings: &LayoutSettings) {
        let previously_skipped = std::mem::take(&mut self.settings.tiling.skip_workspaces);
        self.settings = settings.clone();
        *self.tree.gaps_mut() = GapModel::from_settings(&settings.gaps);
        self.drop_engine = DropEngine::from_settings(&settings.drop);
        for workspace in self.settings.tiling.skip_workspaces.clone() {
            self.set_workspace_mode(workspace, WindowMode::Float);
        }
        for workspace in previously_skipped {
            if !self.skips_workspace(workspace) {
                self.set_workspace_mode(workspace, WindowMode::Tile);
            }
        }
        self.request_render("settings changed");
    }

    fn set_workspace_mode(&mut self, workspace: usize, mode: WindowMode) {
        let Some(ws) = self.tree.find_node(workspace_key(workspace).as_str()) else {
            return;
        };
        let mut changed = 0;
        for node in self.tree.descendants(ws) {
            let Some(entry) = self.tree.get_mut(node) else { continue };
            let hinted = entry.window.is_some_and(|wid| self.floating_hints.contains(&wid));
            let update = match mode {
                WindowMode::Float => entry.mode != WindowMode::Float,
                _ => entry.mode == WindowMode::Float && !hinted,
            };
            if !entry.is_window() || !update {
                continue;
            }
            entry.mode = mode;
            changed += 1;
            if let Some(parent) = entry.parent {
                self.tree.reset_sibling_percent(parent);
                self.tree.remove_unnecessary_container(parent);
            }
        }
        if changed > 0 {
            debug!(workspace, %mode, changed, "Changed window modes");
        }
    }

    fn request_render(&mut self, reason: &str) {
        if self.render_frozen {
            trace!(reason, "Render suppressed while frozen");
            return;
        }
        let task = Task::new(RENDER_TASK, DeferredAction::Render { reason: reason.to_string() });
        if self.queue.coalesce(task) {
            trace!(reason, "Coalesced render request");
        }
    }

    fn freeze_render(&mut self) { self.render_frozen = true; }

    fn unfreeze_render(&mut self, reason: &str) {
        self.render_frozen = false;
        self.request_render(reason);
    }

    /// Drains one deferred task.
    pub fn tick(&mut self) -> EventResponse {
        let Some(task) = self.queue.dequeue() else {
            return EventResponse::default();
        };
        trace!(task = %task.name, "Running deferred task");
        match task.action {
            DeferredAction::Render { reason } => {
                if self.render_frozen {
                    trace!(reason, "Dropped render queued before a grab");
                    return EventResponse::default();
                }
                let frames = self.tree.render(&reason);
                EventResponse {
                    frames,
                    raise_windows: self.visible_tabs(),
                    focus_window: None,
                }
            }
            DeferredAction::Focus(wid) => EventResponse {
                frames: Vec::new(),
                raise_windows: vec![wid],
                focus_window: Some(wid),
            },
            DeferredAction::Raise(windows) => EventResponse {
                raise_windows: windows,
                ..Default::default()
            },
        }
    }

    /// Front windows of every stacked/tabbed container on the active
    /// workspace.
    fn visible_tabs(&self) -> Vec<WindowId> {
        let Some(ws) = self.tree.find_node(workspace_key(self.active_workspace).as_str()) else {
            return Vec::new();
        };
        self.tree
            .descendants(ws)
            .into_iter()
            .filter(|&n| self.tree.layout(n).is_group())
            .filter_map(|group| {
                let mut node = self.tree.active_child(group)?;
                while self.tree.window_at(node).is_none() {
                    node = if self.tree.layout(node).is_group() {
                        self.tree.active_child(node)?
                    } else {
                        *self.tree.children(node).first()?
                    };
                }
                self.tree.window_at(node)
            })
            .collect()
    }

    fn log_error(&self, operation: &str, err: &LayoutError) {
        if err.is_refusal() {
            debug!(operation, %err, "Layout operation refused");
        } else {
            warn!(operation, %err, "Layout operation failed");
        }
    }

    fn focused_node(&self) -> LayoutResult<NodeId> {
        let wid = self.focused_window.ok_or(LayoutError::NoOp("no window is focused"))?;
        self.tree.find_node(wid).ok_or_else(|| LayoutError::NodeNotFound(format!("{wid:?}")))
    }

    fn monitor_node(&self, monitor: usize, workspace: usize) -> Option<NodeId> {
        self.tree.find_node(monitor_key(monitor, workspace).as_str())
    }

    fn create_workspace_node(&mut self, index: usize) -> LayoutResult<()> {
        let root = self.tree.root();
        let ws = match self.tree.children(root).get(index).copied() {
            Some(next) => self.tree.insert_node_before(next, NodeKind::Workspace, None, None)?,
            None => self.tree.create_node(root, NodeKind::Workspace, None, None)?,
        };
        self.tree.set_name(ws, workspace_key(index));
        for (monitor, rect) in self.monitors.clone().into_iter().enumerate() {
            let mon = self.tree.create_named_node(
                ws,
                NodeKind::Monitor,
                monitor_key(monitor, index),
                LayoutKind::HSplit,
            )?;
            self.tree.set_rect(mon, Some(rect));
        }
        Ok(())
    }

    /// Rewrites the composite keys of workspace `from` (and its monitors) to
    /// index `to`.
    fn rename_workspace(&mut self, from: usize, to: usize) {
        let Some(ws) = self.tree.find_node(workspace_key(from).as_str()) else {
            return;
        };
        self.tree.set_name(ws, workspace_key(to));
        for (monitor, node) in self.tree.children(ws).to_vec().into_iter().enumerate() {
            self.tree.set_name(node, monitor_key(monitor, to));
        }
    }

    fn insert_workspace(&mut self, index: usize) -> LayoutResult<()> {
        if index < self.workspace_count {
            for w in (index..self.workspace_count).rev() {
                self.rename_workspace(w, w + 1);
            }
            self.create_workspace_node(index)?;
            self.workspace_count += 1;
            if self.active_workspace >= index {
                self.active_workspace += 1;
            }
        } else {
            while self.workspace_count <= index {
                self.create_workspace_node(self.workspace_count)?;
                self.workspace_count += 1;
            }
        }
        Ok(())
    }

    /// Adds workspace `index`. Existing workspaces at or after `index` move
    /// up by one; indices past the end are filled in.
    #[instrument(skip(self))]
    pub fn add_workspace(&mut self, index: usize) -> bool {
        match self.insert_workspace(index) {
            Ok(()) => {
                debug!(count = self.workspace_count, "Added workspace");
                self.request_render("workspace added");
                true
            }
            Err(err) => {
                self.log_error("add_workspace", &err);
                false
            }
        }
    }

    /// Removes workspace `index` and shifts later workspaces down by one.
    #[instrument(skip(self))]
    pub fn remove_workspace(&mut self, index: usize) -> bool {
        let Some(ws) = self.tree.find_node(workspace_key(index).as_str()) else {
            warn!("No such workspace");
            return false;
        };
        let orphaned = self.tree.tiled_window_count(ws);
        if orphaned > 0 {
            warn!(orphaned, "Removing a workspace that still has windows");
        }
        if let Err(err) = self.tree.remove_node(ws) {
            self.log_error("remove_workspace", &err);
            return false;
        }
        for w in index + 1..self.workspace_count {
            self.rename_workspace(w, w - 1);
        }
        self.workspace_count -= 1;
        if self.active_workspace > index
            || (self.active_workspace == index && index >= self.workspace_count)
        {
            self.active_workspace = self.active_workspace.saturating_sub(1);
        }
        if self.focused_window.is_some_and(|wid| self.tree.find_node(wid).is_none()) {
            self.focused_window = None;
        }
        self.request_render("workspace removed");
        true
    }

    #[instrument(skip(self))]
    pub fn set_active_workspace(&mut self, index: usize) {
        if index >= self.workspace_count {
            self.add_workspace(index);
        }
        self.active_workspace = index;
        self.request_render("workspace activated");
    }

    fn rehome_monitors(&mut self, old_count: usize) -> LayoutResult<()> {
        for workspace in 0..self.workspace_count {
            let ws = self
                .tree
                .find_node(workspace_key(workspace).as_str())
                .ok_or_else(|| LayoutError::NodeNotFound(workspace_key(workspace)))?;
            for monitor in old_count..self.monitors.len() {
                self.tree.create_named_node(
                    ws,
                    NodeKind::Monitor,
                    monitor_key(monitor, workspace),
                    LayoutKind::HSplit,
                )?;
            }
            let Some(primary) = self.monitor_node(0, workspace) else {
                continue;
            };
            for monitor in self.monitors.len()..old_count {
                let Some(gone) = self.monitor_node(monitor, workspace) else { continue };
                for child in self.tree.children(gone).to_vec() {
                    self.tree.detach(child)?;
                    let end = self.tree.children(primary).len();
                    self.tree.attach(child, primary, end)?;
                }
                self.tree.remove_node(gone)?;
                self.tree.reset_sibling_percent(primary);
            }
            for (monitor, rect) in self.monitors.iter().enumerate() {
                if let Some(node) = self.monitor_node(monitor, workspace) {
                    self.tree.set_rect(node, Some(*rect));
                }
            }
        }
        Ok(())
    }

    /// Replaces the monitor work areas. Monitors that disappeared hand their
    /// children over to monitor 0 of the same workspace.
    #[instrument(skip(self))]
    pub fn set_monitors(&mut self, work_areas: Vec<Rect>) -> bool {
        if work_areas.is_empty() {
            warn!("Ignoring monitor change without any monitors");
            return false;
        }
        let old_count = self.monitors.len();
        self.monitors = work_areas;
        if let Err(err) = self.rehome_monitors(old_count) {
            self.log_error("set_monitors", &err);
            return false;
        }
        debug!(count = self.monitors.len(), "Monitors changed");
        self.request_render("monitors changed");
        true
    }

    fn should_float<W: WindowHandle + ?Sized>(&self, window: &W) -> bool {
        self.skips_workspace(window.workspace_index()) || window.is_floating_hint()
    }

    fn placement_monitor<W: WindowHandle + ?Sized>(&mut self, window: &W) -> LayoutResult<NodeId> {
        let workspace = window.workspace_index();
        if workspace >= self.workspace_count && !self.add_workspace(workspace) {
            return Err(LayoutError::NodeNotFound(workspace_key(workspace)));
        }
        self.monitor_node(window.monitor_index(), workspace)
            .or_else(|| self.monitor_node(0, workspace))
            .ok_or_else(|| LayoutError::NodeNotFound(monitor_key(window.monitor_index(), workspace)))
    }

    fn place_window<W: WindowHandle + ?Sized>(&mut self, window: &W) -> LayoutResult<NodeId> {
        let wid = window.id();
        let monitor = self.placement_monitor(window)?;
        if window.is_floating_hint() {
            self.floating_hints.insert(wid);
        }
        if self.should_float(window) {
            let node =
                self.tree.create_node(monitor, NodeKind::Window, Some(wid), Some(WindowMode::Float))?;
            self.tree.set_rect(node, Some(window.frame_rect()));
            return Ok(node);
        }
        let anchor = self.focused_node().ok().filter(|&focused| {
            self.tree.monitor_of(focused) == Some(monitor)
                && self.tree.get(focused).is_some_and(|n| n.is_tiled())
        });
        match anchor {
            Some(anchor) => {
                self.tree.insert_node_after(anchor, NodeKind::Window, Some(wid), Some(WindowMode::Tile))
            }
            None => self.tree.create_node(monitor, NodeKind::Window, Some(wid), Some(WindowMode::Tile)),
        }
    }

    /// Starts managing a window. Tiled windows are placed after the focused
    /// window when it shares the monitor, otherwise at the end.
    #[instrument(skip(self, window), fields(wid = ?window.id()))]
    pub fn track_window<W: WindowHandle + ?Sized>(&mut self, window: &W) -> bool {
        if self.tree.find_node(window.id()).is_some() {
            debug!("Window is already tracked");
            return false;
        }
        match self.place_window(window) {
            Ok(node) => {
                debug!(?node, "Tracking window");
                self.request_render("window tracked");
                true
            }
            Err(err) => {
                self.log_error("track_window", &err);
                false
            }
        }
    }

    #[instrument(skip(self))]
    pub fn untrack_window(&mut self, wid: WindowId) -> bool {
        let Some(node) = self.tree.find_node(wid) else {
            warn!("Untracking a window that is not in the tree");
            return false;
        };
        if self.grab.as_ref().is_some_and(|g| g.window == wid) {
            debug!("Window went away mid-grab");
            self.abort_grab();
        }
        if let Err(err) = self.tree.remove_node(node) {
            self.log_error("untrack_window", &err);
            return false;
        }
        if self.focused_window == Some(wid) {
            self.focused_window = None;
        }
        self.floating_hints.remove(&wid);
        self.request_render("window untracked");
        true
    }

    fn is_skipped_workspace_node(&self, ws: NodeId) -> bool {
        let Some(name) = self.tree.get(ws).and_then(|n| n.name.as_deref()) else {
            return false;
        };
        self.settings.tiling.skip_workspaces.iter().any(|&w| workspace_key(w) == name)
    }

    fn relocate_window<W: WindowHandle + ?Sized>(
        &mut self,
        node: NodeId,
        window: &W,
    ) -> LayoutResult<bool> {
        let monitor = self.placement_monitor(window)?;
        let current = self.tree.monitor_of(node);
        if current == Some(monitor) {
            return Ok(false);
        }
        let left_skipped = current
            .and_then(|m| self.tree.workspace_of(m))
            .is_some_and(|ws| self.is_skipped_workspace_node(ws));
        let entering_skipped = self.skips_workspace(window.workspace_index());

        let old_parent = self.tree.detach(node)?;
        let end = self.tree.children(monitor).len();
        self.tree.attach(node, monitor, end)?;
        if let Some(entry) = self.tree.get_mut(node) {
            if entering_skipped {
                entry.mode = WindowMode::Float;
                entry.rect = Some(window.frame_rect());
            } else if left_skipped && !window.is_floating_hint() {
                entry.mode = WindowMode::Tile;
            }
        }
        self.tree.reset_sibling_percent(old_parent);
        self.tree.reset_sibling_percent(monitor);
        self.tree.remove_unnecessary_container(old_parent);
        Ok(true)
    }

    /// Re-homes a window that the host moved to another monitor or workspace.
    #[instrument(skip(self, window), fields(wid = ?window.id()))]
    pub fn update_window_location<W: WindowHandle + ?Sized>(&mut self, window: &W) -> bool {
        let Some(node) = self.tree.find_node(window.id()) else {
            warn!("Window is not tracked");
            return false;
        };
        match self.relocate_window(node, window) {
            Ok(moved) => {
                if moved {
                    self.request_render("window moved");
                }
                moved
            }
            Err(err) => {
                self.log_error("update_window_location", &err);
                false
            }
        }
    }

    /// Records host focus and brings the window's tab to the front.
    pub fn window_focused(&mut self, wid: WindowId) {
        let Some(node) = self.tree.find_node(wid) else {
            trace!(?wid, "Focus on an untracked window");
            return;
        };
        self.focused_window = Some(wid);
        self.tree.select_tabs(node);
    }

    fn focus_target(&mut self, direction: Direction) -> LayoutResult<WindowId> {
        let node = self.focused_node()?;
        let target = self
            .tree
            .focus(node, direction)
            .ok_or(LayoutError::NoOp("no window in that direction"))?;
        self.tree.window_at(target).ok_or(LayoutError::NoOp("target is not a window"))
    }

    pub fn move_node(&mut self, direction: Direction) -> bool {
        let node = match self.focused_node() {
            Ok(node) => node,
            Err(err) => {
                self.log_error("move_node", &err);
                return false;
            }
        };
        let moved = self.tree.move_node(node, direction);
        if moved {
            self.request_render("node moved");
        }
        moved
    }

    pub fn swap_node(&mut self, direction: Direction) -> bool {
        let result = self.focused_node().and_then(|node| {
            let neighbor = self.tree.next_visible(node, direction);
            self.tree.swap(Some(node), neighbor)
        });
        self.finish("swap_node", result)
    }

    pub fn split_node(&mut self, orientation: Orientation, group: Option<LayoutKind>) -> bool {
        let result = self
            .focused_node()
            .and_then(|node| self.tree.split(node, orientation, group).map(|_| ()));
        self.finish("split_node", result)
    }

    /// Flips the split axis of the focused window's container.
    pub fn toggle_layout(&mut self) -> bool {
        let result = self.focused_parent().and_then(|parent| self.tree.toggle_layout(parent).map(|_| ()));
        self.finish("toggle_layout", result)
    }

    pub fn set_layout(&mut self, layout: LayoutKind) -> bool {
        let result = self.focused_node().and_then(|node| {
            let parent = self.tree.parent(node).ok_or(LayoutError::InvalidParent(node))?;
            self.tree.set_layout(parent, layout)?;
            if layout.is_group() {
                self.tree.select_tabs(node);
            }
            Ok(())
        });
        self.finish("set_layout", result)
    }

    fn focused_parent(&self) -> LayoutResult<NodeId> {
        let node = self.focused_node()?;
        self.tree.parent(node).ok_or(LayoutError::InvalidParent(node))
    }

    pub fn toggle_float(&mut self) -> bool {
        let result = self.focused_node().and_then(|node| {
            let entry = self
                .tree
                .get_mut(node)
                .ok_or_else(|| LayoutError::NodeNotFound(format!("{node:?}")))?;
            entry.mode = match entry.mode {
                WindowMode::Float => WindowMode::Tile,
                _ => WindowMode::Float,
            };
            let parent = entry.parent.ok_or(LayoutError::InvalidParent(node))?;
            self.tree.reset_sibling_percent(parent);
            self.tree.remove_unnecessary_container(parent);
            Ok(())
        });
        self.finish("toggle_float", result)
    }

    fn finish(&mut self, operation: &'static str, result: LayoutResult<()>) -> bool {
        match result {
            Ok(()) => {
                self.request_render(operation);
                true
            }
            Err(err) => {
                self.log_error(operation, &err);
                false
            }
        }
    }

    fn rebalance(&mut self) -> bool {
        let Some(monitor) = self.focused_node().ok().and_then(|n| self.tree.monitor_of(n)) else {
            return false;
        };
        for node in self.tree.descendants(monitor) {
            self.tree.reset_sibling_percent(node);
        }
        self.request_render("rebalance");
        true
    }

    #[instrument(skip(self))]
    pub fn handle_command(&mut self, command: LayoutCommand) -> bool {
        match command {
            LayoutCommand::MoveFocus(direction) => match self.focus_target(direction) {
                Ok(wid) => {
                    self.focused_window = Some(wid);
                    self.queue.enqueue(Task::new("focus", DeferredAction::Focus(wid)));
                    true
                }
                Err(err) => {
                    self.log_error("move_focus", &err);
                    false
                }
            },
            LayoutCommand::MoveNode(direction) => self.move_node(direction),
            LayoutCommand::SwapWindows(direction) => self.swap_node(direction),
            LayoutCommand::Split(orientation) => self.split_node(orientation, None),
            LayoutCommand::ToggleLayout => self.toggle_layout(),
            LayoutCommand::SetLayout(layout) => self.set_layout(layout),
            LayoutCommand::ToggleFloat => self.toggle_float(),
            LayoutCommand::GapIncrease => {
                let changed = self.tree.gaps_mut().increase();
                if changed {
                    self.request_render("gap increased");
                }
                changed
            }
            LayoutCommand::GapDecrease => {
                let changed = self.tree.gaps_mut().decrease();
                if changed {
                    self.request_render("gap decreased");
                }
                changed
            }
            LayoutCommand::Rebalance => self.rebalance(),
            LayoutCommand::Debug => {
                info!("{}", self.tree.draw_tree());
                true
            }
        }
    }

    /// Rebuilds the tree from the live window set, keeping workspaces and
    /// monitors.
    #[instrument(skip(self, windows))]
    pub fn reload_tree<'a, W, I>(&mut self, windows: I)
    where
        W: WindowHandle + ?Sized + 'a,
        I: IntoIterator<Item = &'a W>,
    {
        self.abort_grab();
        let count = self.workspace_count;
        let focused = self.focused_window.take();
        self.tree = LayoutTree::new(self.tree.gaps().clone());
        self.workspace_count = 0;
        if count > 0 {
            self.add_workspace(count - 1);
        }
        for window in windows {
            self.track_window(window);
        }
        if let Some(wid) = focused {
            self.window_focused(wid);
        }
        info!(windows = self.tree.nodes_by_type(NodeKind::Window).len(), "Reloaded layout tree");
    }

    /// Starts a modal move or resize of a window. Rendering is frozen until
    /// the grab ends.
    #[instrument(skip(self, window), fields(wid = ?window.id()))]
    pub fn begin_grab<W: WindowHandle + ?Sized>(&mut self, window: &W, kind: GrabKind) -> bool {
        if self.grab.is_some() {
            debug!("A grab is already active");
            return false;
        }
        let wid = window.id();
        let Some(node) = self.tree.find_node(wid) else {
            warn!("Grab on an untracked window");
            return false;
        };
        // Hit-testing and resize math read node rects, which may predate a
        // render that is still queued.
        let _ = self.tree.render("grab begin");
        let tiled = self.tree.get(node).is_some_and(|n| n.is_tiled());
        let mut resize = None;
        match kind {
            GrabKind::Move if tiled => {
                if let Some(entry) = self.tree.get_mut(node) {
                    entry.mode = WindowMode::GrabTile;
                }
            }
            GrabKind::Resize(edges) if tiled => {
                match ResizeEngine::begin(&self.tree, node, edges, window.frame_rect()) {
                    Ok(engine) => resize = Some(engine),
                    Err(err) => self.log_error("begin_grab", &err),
                }
            }
            _ => {}
        }
        self.grab = Some(Grab { window: wid, node, kind, resize, plan: None });
        self.freeze_render();
        true
    }

    /// Feeds one live frame of a grab: the window's current frame and the
    /// pointer position.
    pub fn update_grab(&mut self, wid: WindowId, frame: Rect, pointer: Point) -> bool {
        let Some(grab) = self.grab.as_ref() else {
            return false;
        };
        if grab.window != wid || !self.tree.contains(grab.node) {
            return false;
        }
        let (node, kind, resizing) = (grab.node, grab.kind, grab.resize.is_some());
        match kind {
            GrabKind::Move if self.tree.get(node).map(|n| n.mode) == Some(WindowMode::GrabTile) => {
                self.update_drop(node, pointer)
            }
            GrabKind::Resize(_) if resizing => {
                let Some(resize) = self.grab.as_ref().and_then(|g| g.resize.as_ref()) else {
                    return false;
                };
                resize.update(&mut self.tree, frame)
            }
            _ => {
                self.tree.set_rect(node, Some(frame));
                true
            }
        }
    }

    fn update_drop(&mut self, node: NodeId, pointer: Point) -> bool {
        let Some(scope) = self.tree.workspace_of(node) else {
            return false;
        };
        match self.drop_engine.evaluate(&self.tree, scope, node, pointer) {
            Ok(Some(plan)) => {
                self.preview = Some(self.drop_engine.preview(&mut self.tree, &plan));
                if let Some(grab) = self.grab.as_mut() {
                    grab.plan = Some(plan);
                }
                true
            }
            Ok(None) => {
                self.clear_preview();
                false
            }
            Err(err) => {
                self.log_error("update_grab", &err);
                false
            }
        }
    }

    fn clear_preview(&mut self) {
        self.preview = None;
        self.tree.clear_drop_markers();
        if let Some(grab) = self.grab.as_mut() {
            grab.plan = None;
        }
    }

    /// Abandons the active grab: the dragged window goes back to tiling,
    /// resize percents are restored and no drop is committed.
    pub fn cancel_grab(&mut self) -> bool {
        if self.grab.is_none() {
            return false;
        }
        self.abort_grab();
        true
    }

    fn abort_grab(&mut self) {
        self.clear_preview();
        let Some(grab) = self.grab.take() else {
            return;
        };
        if let Some(entry) = self.tree.get_mut(grab.node) {
            if entry.mode == WindowMode::GrabTile {
                entry.mode = WindowMode::Tile;
            }
        }
        if let Some(resize) = grab.resize {
            resize.cancel(&mut self.tree);
        }
        debug!(wid = ?grab.window, "Grab cancelled");
        self.unfreeze_render("grab cancelled");
    }

    #[instrument(skip(self))]
    pub fn end_grab(&mut self, wid: WindowId, cancelled: bool) -> bool {
        if !self.grab.as_ref().is_some_and(|g| g.window == wid) {
            return false;
        }
        if cancelled {
            self.abort_grab();
            return false;
        }
        let plan = self.grab.as_ref().and_then(|g| g.plan);
        self.preview = None;
        let Some(grab) = self.grab.take() else {
            return false;
        };
        let committed = match plan {
            Some(plan) => match self.drop_engine.commit(&mut self.tree, &plan) {
                Ok(()) => true,
                Err(err) => {
                    self.log_error("end_grab", &err);
                    false
                }
            },
            None => true,
        };
        self.tree.clear_drop_markers();
        if let Some(entry) = self.tree.get_mut(grab.node) {
            if entry.mode == WindowMode::GrabTile {
                entry.mode = WindowMode::Tile;
            }
        }
        self.unfreeze_render("grab ended");
        committed
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::reactor::testing::TestWindow;
    use crate::layout_engine::DropAction;

    fn engine_with(windows: &[&TestWindow]) -> LayoutEngine {
        let mut engine = LayoutEngine::new(&LayoutSettings::default());
        engine.tree.gaps_mut().size = 0;
        engine.set_monitors(vec![Rect::new(0., 0., 1000., 500.)]);
        engine.add_workspace(0);
        for window in windows {
            assert!(engine.track_window(*window));
        }
        let _ = engine.tick();
        engine
    }

    fn drain(engine: &mut LayoutEngine) -> Vec<EventResponse> {
        std::iter::from_fn(|| (!engine.queue.is_empty()).then(|| engine.tick())).collect()
    }

    fn mode_of(engine: &LayoutEngine, wid: WindowId) -> WindowMode {
        let node = engine.find_node(wid).unwrap();
        engine.tree.get(node).unwrap().mode
    }

    #[test]
    fn render_requests_are_coalesced() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let c = TestWindow::new(3);
        let mut engine = engine_with(&[]);
        engine.track_window(&a);
        engine.track_window(&b);
        engine.track_window(&c);
        assert_eq!(engine.queue.len(), 1);

        let response = engine.tick();
        assert_eq!(response.frames.len(), 3);
        assert!(engine.tick().is_empty());
    }

    #[test]
    fn new_windows_follow_focus() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(a.id());
        let c = TestWindow::new(3);
        engine.track_window(&c);

        let mon = engine.find_node("mo0ws0").unwrap();
        let order: Vec<_> =
            engine.tree.children(mon).iter().map(|&n| engine.tree.window_at(n).unwrap()).collect();
        assert_eq!(order, vec![a.id(), c.id(), b.id()]);
    }

    #[test]
    fn cancelled_grab_reverts_and_commits_nothing() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        let mon = engine.find_node("mo0ws0").unwrap();
        let before = engine.tree.children(mon).to_vec();

        assert!(engine.begin_grab(&b, GrabKind::Move));
        assert_eq!(mode_of(&engine, b.id()), WindowMode::GrabTile);
        assert!(engine.update_grab(b.id(), b.frame_rect(), Point::new(10., 250.)));
        assert!(engine.drop_preview().is_some());

        assert!(engine.cancel_grab());
        assert_eq!(mode_of(&engine, b.id()), WindowMode::Tile);
        assert_eq!(engine.drop_preview(), None);
        assert!(!engine.tree.get(engine.find_node(b.id()).unwrap()).unwrap().detach_window);

        assert!(!engine.end_grab(b.id(), false));
        assert_eq!(engine.tree.children(mon), before.as_slice());
    }

    #[test]
    fn ending_a_move_grab_commits_the_drop() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);

        engine.begin_grab(&b, GrabKind::Move);
        engine.update_grab(b.id(), b.frame_rect(), Point::new(10., 250.));
        let plan = engine.grab.as_ref().and_then(|g| g.plan).unwrap();
        assert_eq!(plan.action, DropAction::InsertSibling { before: true });
        // Nothing renders while the grab is live.
        engine.track_window(&TestWindow::new(9));
        assert!(engine.queue.is_empty());

        assert!(engine.end_grab(b.id(), false));
        assert_eq!(mode_of(&engine, b.id()), WindowMode::Tile);
        let mon = engine.find_node("mo0ws0").unwrap();
        assert_eq!(engine.tree.window_at(engine.tree.children(mon)[0]), Some(b.id()));
        assert_eq!(engine.queue.len(), 1);
    }

    #[test]
    fn end_grab_with_cancel_flag_aborts() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.begin_grab(&b, GrabKind::Move);
        engine.update_grab(b.id(), b.frame_rect(), Point::new(10., 250.));
        assert!(!engine.end_grab(b.id(), true));
        assert_eq!(mode_of(&engine, b.id()), WindowMode::Tile);
        let mon = engine.find_node("mo0ws0").unwrap();
        assert_eq!(engine.tree.window_at(engine.tree.children(mon)[1]), Some(b.id()));
    }

    #[test]
    fn resize_grab_moves_percents_and_cancel_restores() {
        let a = TestWindow::new(1).with_frame(Rect::new(0., 0., 500., 500.));
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        let node = engine.find_node(a.id()).unwrap();

        engine.begin_grab(&a, GrabKind::Resize(ResizeEdges::RIGHT));
        engine.update_grab(a.id(), Rect::new(0., 0., 600., 500.), Point::ZERO);
        assert!((engine.tree.get(node).unwrap().percent - 0.6).abs() < 1e-9);

        engine.cancel_grab();
        assert!((engine.tree.get(node).unwrap().percent - 0.5).abs() < 1e-9);
    }

    #[test]
    fn removing_a_workspace_shifts_later_ones() {
        let mut engine = engine_with(&[]);
        engine.add_workspace(2);
        let window = TestWindow::new(1).on(0, 2);
        engine.track_window(&window);

        assert!(engine.remove_workspace(1));
        assert_eq!(engine.workspace_count(), 2);
        assert_eq!(engine.find_node("ws2"), None);
        let node = engine.find_node(window.id()).unwrap();
        let ws = engine.tree.workspace_of(node).unwrap();
        assert_eq!(engine.tree.get(ws).unwrap().name.as_deref(), Some("ws1"));
        assert_eq!(engine.tree.monitor_of(node), engine.find_node("mo0ws1"));
    }

    #[test]
    fn lost_monitor_hands_windows_to_primary() {
        let mut engine = engine_with(&[]);
        engine.set_monitors(vec![Rect::new(0., 0., 1000., 500.), Rect::new(1000., 0., 2000., 500.)]);
        let a = TestWindow::new(1);
        let b = TestWindow::new(2).on(1, 0);
        engine.track_window(&a);
        engine.track_window(&b);
        assert_eq!(
            engine.tree.monitor_of(engine.find_node(b.id()).unwrap()),
            engine.find_node("mo1ws0")
        );

        engine.set_monitors(vec![Rect::new(0., 0., 1000., 500.)]);
        assert_eq!(engine.find_node("mo1ws0"), None);
        let primary = engine.find_node("mo0ws0").unwrap();
        assert_eq!(engine.tree.monitor_of(engine.find_node(b.id()).unwrap()), Some(primary));
        let frames = drain(&mut engine).into_iter().flat_map(|r| r.frames).collect::<Vec<_>>();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|(_, rect)| rect.x1 <= 1000.));
    }

    #[test]
    fn skipped_workspaces_float() {
        let mut settings = LayoutSettings::default();
        settings.tiling.skip_workspaces = vec![1];
        let mut engine = LayoutEngine::new(&settings);
        engine.set_monitors(vec![Rect::new(0., 0., 1000., 500.)]);
        engine.add_workspace(1);

        let window = TestWindow::new(1).on(0, 1);
        assert!(!engine.is_workspace_tiled(&window));
        engine.track_window(&window);
        assert_eq!(mode_of(&engine, window.id()), WindowMode::Float);
        assert_eq!(engine.nodes_by_mode(WindowMode::Float).len(), 1);

        let dialog = TestWindow::new(2).floating();
        engine.track_window(&dialog);
        assert_eq!(mode_of(&engine, dialog.id()), WindowMode::Float);
    }

    #[test]
    fn unskipped_workspaces_tile_again() {
        let mut skipping = LayoutSettings::default();
        skipping.tiling.skip_workspaces = vec![1];
        let mut engine = LayoutEngine::new(&skipping);
        engine.set_monitors(vec![Rect::new(0., 0., 1000., 500.)]);
        engine.add_workspace(1);
        let window = TestWindow::new(1).on(0, 1);
        let dialog = TestWindow::new(2).on(0, 1).floating();
        engine.track_window(&window);
        engine.track_window(&dialog);
        assert_eq!(mode_of(&engine, window.id()), WindowMode::Float);

        engine.set_layout_settings(&LayoutSettings::default());
        assert_eq!(mode_of(&engine, window.id()), WindowMode::Tile);
        assert_eq!(mode_of(&engine, dialog.id()), WindowMode::Float);
        let node = engine.find_node(window.id()).unwrap();
        assert_eq!(engine.tree.get(node).unwrap().percent, 1.0);

        engine.set_layout_settings(&skipping);
        assert_eq!(mode_of(&engine, window.id()), WindowMode::Float);
    }

    #[test]
    fn floating_a_container_empty_of_tiles_collapses_it() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let c = TestWindow::new(3);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(b.id());
        assert!(engine.handle_command(LayoutCommand::Split(Orientation::Vertical)));
        assert!(engine.track_window(&c));
        let b_node = engine.find_node(b.id()).unwrap();
        let container = engine.tree.parent(b_node).unwrap();
        assert_eq!(engine.tree.children(container).len(), 2);

        assert!(engine.handle_command(LayoutCommand::ToggleFloat));
        assert!(engine.tree.contains(container));
        engine.window_focused(c.id());
        assert!(engine.handle_command(LayoutCommand::ToggleFloat));
        assert!(!engine.tree.contains(container));

        let a_node = engine.find_node(a.id()).unwrap();
        assert_eq!(engine.tree.get(a_node).unwrap().percent, 1.0);
        let frames = drain(&mut engine).into_iter().flat_map(|r| r.frames).collect::<Vec<_>>();
        assert!(frames.contains(&(a.id(), Rect::new(0., 0., 1000., 500.))));
    }

    #[test]
    fn focus_command_is_deferred() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(a.id());

        assert!(engine.handle_command(LayoutCommand::MoveFocus(Direction::Right)));
        assert_eq!(engine.focused_window(), Some(b.id()));
        let response = engine.tick();
        assert_eq!(response.focus_window, Some(b.id()));
        assert_eq!(response.raise_windows, vec![b.id()]);

        assert!(!engine.handle_command(LayoutCommand::MoveFocus(Direction::Right)));
    }

    #[test]
    fn toggle_float_and_gaps() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(b.id());

        assert!(engine.handle_command(LayoutCommand::ToggleFloat));
        assert_eq!(mode_of(&engine, b.id()), WindowMode::Float);
        let a_node = engine.find_node(a.id()).unwrap();
        assert_eq!(engine.tree.get(a_node).unwrap().percent, 1.0);

        assert!(engine.handle_command(LayoutCommand::GapIncrease));
        assert_eq!(engine.tree.gaps().size, 1);
        assert!(engine.handle_command(LayoutCommand::GapDecrease));
        assert!(!engine.handle_command(LayoutCommand::GapDecrease));
        assert_eq!(engine.tree.gaps().size, 0);
    }

    #[test]
    fn layout_commands_change_the_parent() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(b.id());
        let mon = engine.find_node("mo0ws0").unwrap();

        assert!(engine.handle_command(LayoutCommand::ToggleLayout));
        assert_eq!(engine.tree.layout(mon), LayoutKind::VSplit);
        assert!(engine.handle_command(LayoutCommand::Split(Orientation::Horizontal)));
        let parent = engine.tree.parent(engine.find_node(b.id()).unwrap()).unwrap();
        assert_eq!(engine.tree.layout(parent), LayoutKind::HSplit);
        assert!(engine.handle_command(LayoutCommand::SetLayout(LayoutKind::Tabbed)));
        assert_eq!(engine.nodes_by_layout(LayoutKind::Tabbed), vec![parent]);

        let responses = drain(&mut engine);
        assert!(responses.iter().any(|r| r.raise_windows == vec![b.id()]));
    }

    #[test]
    fn reload_rebuilds_from_live_windows() {
        let a = TestWindow::new(1);
        let b = TestWindow::new(2);
        let mut engine = engine_with(&[&a, &b]);
        engine.window_focused(a.id());
        engine.handle_command(LayoutCommand::Split(Orientation::Vertical));

        engine.reload_tree([&a, &b]);
        let mon = engine.find_node("mo0ws0").unwrap();
        assert_eq!(engine.tree.children(mon).len(), 2);
        assert_eq!(engine.nodes_by_type(NodeKind::Container), vec![]);
        assert_eq!(engine.focused_window(), Some(a.id()));
    }

    #[test]
    fn state_serializes_to_json() {
        let a = TestWindow::new(1);
        let engine = engine_with(&[&a]);
        let json = engine.serialize_state().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["active_workspace"], 0);
        assert!(json.contains("mo0ws0"));
    }

    #[test]
    fn commands_round_trip_through_serde() {
        let command: LayoutCommand = serde_json::from_str(r#"{"move_focus":"left"}"#).unwrap();
        assert_eq!(command, LayoutCommand::MoveFocus(Direction::Left));
        let command: LayoutCommand = serde_json::from_str(r#""toggle_float""#).unwrap();
        assert_eq!(command, LayoutCommand::ToggleFloat);
    }
}
