//! Drag-and-drop re-parenting.
//!
//! The hovered window's rect is cut into five regions. Which region the pointer
//! is in, together with the layout and kind of the hovered window's parent,
//! decides where the dragged window ends up. [`plan_drop`] makes that decision
//! without touching the tree; [`DropEngine::commit`] carries it out.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::error::{LayoutError, LayoutResult};
use super::graph::{Direction, LayoutKind, NodeKind, Orientation};
use super::tree::{LayoutTree, NodeId};
use crate::common::config::DropSettings;
use crate::sys::geometry::contains_inclusive;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DropRegion {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DropRegion {
    const EDGES: [DropRegion; 4] =
        [DropRegion::Left, DropRegion::Right, DropRegion::Top, DropRegion::Bottom];

    pub fn direction(self) -> Option<Direction> {
        match self {
            DropRegion::Left => Some(Direction::Left),
            DropRegion::Right => Some(Direction::Right),
            DropRegion::Top => Some(Direction::Up),
            DropRegion::Bottom => Some(Direction::Down),
            DropRegion::Center => None,
        }
    }

    /// The band of `rect` covered by this edge region at `margin` (a fraction
    /// of the rect's extent). The center region is the whole rect.
    pub fn band(self, rect: Rect, margin: f64) -> Rect {
        let w = rect.width() * margin;
        let h = rect.height() * margin;
        match self {
            DropRegion::Left => Rect::new(rect.x0, rect.y0, rect.x0 + w, rect.y1),
            DropRegion::Right => Rect::new(rect.x1 - w, rect.y0, rect.x1, rect.y1),
            DropRegion::Top => Rect::new(rect.x0, rect.y0, rect.x1, rect.y0 + h),
            DropRegion::Bottom => Rect::new(rect.x0, rect.y1 - h, rect.x1, rect.y1),
            DropRegion::Center => rect,
        }
    }

    /// First edge band containing `pointer`, else the center.
    pub fn hit(rect: Rect, pointer: Point, margin: f64) -> Self {
        let pointer = Point::new(
            pointer.x.clamp(rect.x0, rect.x1.max(rect.x0)),
            pointer.y.clamp(rect.y0, rect.y1.max(rect.y0)),
        );
        Self::EDGES
            .into_iter()
            .find(|region| contains_inclusive(region.band(rect, margin), pointer))
            .unwrap_or(DropRegion::Center)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropMargins {
    /// Fraction of the target used for hit-testing the edge regions.
    pub hover: f64,
    /// Fraction of the target covered by the edge preview.
    pub preview: f64,
}

impl Default for DropMargins {
    fn default() -> Self { DropMargins { hover: 0.3, preview: 0.5 } }
}

impl From<&DropSettings> for DropMargins {
    fn from(settings: &DropSettings) -> Self {
        DropMargins {
            hover: settings.hover_margin,
            preview: settings.preview_margin,
        }
    }
}

/// Style class the host paints the drop hint with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStyle {
    Tiled,
    Stacked,
    Tabbed,
}

impl PreviewStyle {
    fn for_layout(layout: LayoutKind) -> Self {
        match layout {
            LayoutKind::Stacked => PreviewStyle::Stacked,
            LayoutKind::Tabbed => PreviewStyle::Tabbed,
            _ => PreviewStyle::Tiled,
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            PreviewStyle::Tiled => "window-tilepreview-tiled",
            PreviewStyle::Stacked => "window-tilepreview-stacked",
            PreviewStyle::Tabbed => "window-tilepreview-tabbed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropPreview {
    pub rect: Rect,
    pub style: PreviewStyle,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropAction {
    /// Become another tab of the target's stacked/tabbed parent.
    JoinGroup { group: NodeId },
    /// Put the target and the dragged window together in a new container.
    CreateContainer { layout: LayoutKind },
    /// Append to the target's parent container.
    MergeIntoParent { parent: NodeId },
    /// Sit next to the target in its split parent.
    InsertSibling { before: bool },
    /// Wrap the target in a container split along the region's axis.
    WrapTarget { orientation: Orientation, before: bool },
    /// Split the target's whole group container and sit next to it.
    SplitGroup { group: NodeId, orientation: Orientation, before: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DropPlan {
    pub dragged: NodeId,
    pub target: NodeId,
    pub region: DropRegion,
    pub action: DropAction,
    pub preview: DropPreview,
}

/// What the planner knows about the hovered window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DropContext {
    pub dragged: NodeId,
    pub target: NodeId,
    /// The target's rect with gaps applied.
    pub target_rect: Rect,
    pub parent: NodeId,
    pub parent_kind: NodeKind,
    pub parent_layout: LayoutKind,
    pub parent_rect: Rect,
    /// Layout of a container created by a center drop on a monitor child.
    pub center_layout: LayoutKind,
}

impl DropContext {
    pub fn new(
        tree: &LayoutTree,
        dragged: NodeId,
        target: NodeId,
        center_layout: LayoutKind,
    ) -> LayoutResult<Self> {
        let parent = tree.parent(target).ok_or(LayoutError::InvalidParent(target))?;
        let parent_node = tree.node(parent)?;
        let target_rect =
            tree.process_gap(target).ok_or(LayoutError::GeometryUnavailable(target))?;
        let parent_rect = parent_node.rect.ok_or(LayoutError::GeometryUnavailable(parent))?;
        Ok(DropContext {
            dragged,
            target,
            target_rect,
            parent,
            parent_kind: parent_node.kind,
            parent_layout: parent_node.layout,
            parent_rect,
            center_layout,
        })
    }
}

/// Decides where a drop at `pointer` would put the dragged window.
pub fn plan_drop(ctx: &DropContext, pointer: Point, margins: DropMargins) -> DropPlan {
    let region = DropRegion::hit(ctx.target_rect, pointer, margins.hover);
    let edge_preview = DropPreview {
        rect: region.band(ctx.target_rect, margins.preview),
        style: PreviewStyle::Tiled,
    };

    let (action, preview) = match region.direction() {
        None if ctx.parent_layout.is_group() => (
            DropAction::JoinGroup { group: ctx.parent },
            DropPreview {
                rect: ctx.target_rect,
                style: PreviewStyle::for_layout(ctx.parent_layout),
            },
        ),
        None if ctx.parent_kind == NodeKind::Monitor => (
            DropAction::CreateContainer { layout: ctx.center_layout },
            DropPreview {
                rect: ctx.target_rect,
                style: PreviewStyle::for_layout(ctx.center_layout),
            },
        ),
        None => (
            DropAction::MergeIntoParent { parent: ctx.parent },
            DropPreview {
                rect: ctx.parent_rect,
                style: PreviewStyle::for_layout(ctx.parent_layout),
            },
        ),
        Some(direction) => {
            let orientation = direction.orientation();
            let before = !direction.is_forward();
            let action = if ctx.parent_layout.is_group() {
                DropAction::SplitGroup { group: ctx.parent, orientation, before }
            } else if ctx.parent_layout.split_orientation().unwrap_or(Orientation::Horizontal)
                == orientation
            {
                DropAction::InsertSibling { before }
            } else {
                DropAction::WrapTarget { orientation, before }
            };
            (action, edge_preview)
        }
    };

    DropPlan {
        dragged: ctx.dragged,
        target: ctx.target,
        region,
        action,
        preview,
    }
}

impl LayoutTree {
    /// The tiled, visible window under `pointer` inside `scope`, skipping
    /// `exclude`. Only the active child of a stacked/tabbed container can be
    /// hit.
    pub fn window_at_pointer(
        &self,
        scope: NodeId,
        pointer: Point,
        exclude: NodeId,
    ) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|&id| {
            let Some(node) = self.get(id) else { return false };
            if id == exclude || !node.is_window() || !node.is_tiled() {
                return false;
            }
            let visible = self.ancestors(id).zip(self.ancestors(id).skip(1)).all(
                |(child, parent)| {
                    !self.layout(parent).is_group() || self.active_child(parent) == Some(child)
                },
            );
            visible && node.rect.is_some_and(|rect| contains_inclusive(rect, pointer))
        })
    }
}

/// Evaluates and applies drops with the configured margins.
#[derive(Clone, Debug, PartialEq)]
pub struct DropEngine {
    pub margins: DropMargins,
    pub center_layout: LayoutKind,
}

impl Default for DropEngine {
    fn default() -> Self { Self::from_settings(&DropSettings::default()) }
}

impl DropEngine {
    pub fn from_settings(settings: &DropSettings) -> Self {
        DropEngine {
            margins: DropMargins::from(settings),
            center_layout: settings.center_layout.into(),
        }
    }

    /// Plans a drop of `dragged` at `pointer` within `scope`. `None` when no
    /// window is under the pointer.
    pub fn evaluate(
        &self,
        tree: &LayoutTree,
        scope: NodeId,
        dragged: NodeId,
        pointer: Point,
    ) -> LayoutResult<Option<DropPlan>> {
        let Some(target) = tree.window_at_pointer(scope, pointer, dragged) else {
            return Ok(None);
        };
        let ctx = DropContext::new(tree, dragged, target, self.center_layout)?;
        let plan = plan_drop(&ctx, pointer, self.margins);
        trace!(?target, region = %plan.region, action = ?plan.action, "Planned drop");
        Ok(Some(plan))
    }

    /// Marks the nodes a drop would touch. The tree's structure is unchanged.
    pub fn preview(&self, tree: &mut LayoutTree, plan: &DropPlan) -> DropPreview {
        tree.clear_drop_markers();
        if let Some(node) = tree.get_mut(plan.dragged) {
            node.detach_window = true;
        }
        if matches!(plan.action, DropAction::CreateContainer { .. }) {
            if let Some(node) = tree.get_mut(plan.target) {
                node.create_con = true;
            }
        }
        plan.preview
    }

    /// Carries out `plan`: moves the dragged window, resets percents on both
    /// sides and clears the drop markers.
    pub fn commit(&self, tree: &mut LayoutTree, plan: &DropPlan) -> LayoutResult<()> {
        let result = Self::apply(tree, plan);
        tree.clear_drop_markers();
        result
    }

    fn apply(tree: &mut LayoutTree, plan: &DropPlan) -> LayoutResult<()> {
        let DropPlan { dragged, target, .. } = *plan;
        if !tree.contains(target) {
            return Err(LayoutError::NodeNotFound(format!("{target:?}")));
        }
        let (old_parent, old_index) = tree
            .parent(dragged)
            .zip(tree.index_in_parent(dragged))
            .ok_or(LayoutError::InvalidParent(dragged))?;
        tree.detach(dragged)?;
        let placed = match plan.action {
            DropAction::JoinGroup { group } => tree.attach_after(dragged, target).map(|()| {
                if let Some(node) = tree.get_mut(group) {
                    node.last_tab_focus = Some(dragged);
                }
            }),
            DropAction::CreateContainer { layout } => {
                let orientation = layout.split_orientation().unwrap_or(Orientation::Horizontal);
                tree.split(target, orientation, Some(layout)).and_then(|container| {
                    tree.attach_after(dragged, target)?;
                    if layout.is_group() {
                        if let Some(node) = tree.get_mut(container) {
                            node.last_tab_focus = Some(dragged);
                        }
                    }
                    Ok(())
                })
            }
            DropAction::MergeIntoParent { parent } => {
                let end = tree.children(parent).len();
                tree.attach(dragged, parent, end)
            }
            DropAction::InsertSibling { before } => place_next_to(tree, dragged, target, before),
            DropAction::WrapTarget { orientation, before } => {
                split_along(tree, target, orientation)
                    .and_then(|()| place_next_to(tree, dragged, target, before))
            }
            DropAction::SplitGroup { group, orientation, before } => {
                split_along(tree, group, orientation)
                    .and_then(|()| place_next_to(tree, dragged, group, before))
            }
        };
        if let Err(err) = placed {
            if let Err(restore) = tree.attach(dragged, old_parent, old_index) {
                warn!(?dragged, ?old_parent, %restore, "Could not restore dragged window");
            }
            return Err(err);
        }

        let new_parent = tree.parent(dragged).ok_or(LayoutError::InvalidParent(dragged))?;
        tree.reset_sibling_percent(old_parent);
        tree.reset_sibling_percent(new_parent);
        tree.remove_unnecessary_container(old_parent);
        debug!(?dragged, ?target, region = %plan.region, action = ?plan.action, "Committed drop");
        Ok(())
    }
}

/// Makes `node`'s parent split along `orientation`, wrapping `node` when the
/// parent holds other children. A lone child's container that already splits
/// that way is left as it is.
fn split_along(
    tree: &mut LayoutTree,
    node: NodeId,
    orientation: Orientation,
) -> LayoutResult<()> {
    let parent = tree.parent(node).ok_or(LayoutError::InvalidParent(node))?;
    let lone_child =
        tree.kind(parent) == Some(NodeKind::Container) && tree.children(parent).len() == 1;
    if lone_child && tree.layout(parent) == LayoutKind::from(orientation) {
        return Ok(());
    }
    tree.split(node, orientation, None).map(|_| ())
}

fn place_next_to(
    tree: &mut LayoutTree,
    node: NodeId,
    reference: NodeId,
    before: bool,
) -> LayoutResult<()> {
    if before {
        tree.attach_before(node, reference)
    } else {
        tree.attach_after(node, reference)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::layout_engine::tree::tests::{add_window, no_gaps, single_monitor};

    fn context(parent_kind: NodeKind, parent_layout: LayoutKind) -> DropContext {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        DropContext {
            dragged: b,
            target: a,
            target_rect: Rect::new(0., 0., 200., 100.),
            parent: mon,
            parent_kind,
            parent_layout,
            parent_rect: Rect::new(0., 0., 400., 100.),
            center_layout: LayoutKind::Tabbed,
        }
    }

    #[test]
    fn pointer_near_left_edge_hits_left() {
        let ctx = context(NodeKind::Container, LayoutKind::HSplit);
        let plan = plan_drop(&ctx, Point::new(10., 50.), DropMargins::default());
        assert_eq!(plan.region, DropRegion::Left);
        assert_eq!(plan.action, DropAction::InsertSibling { before: true });
        assert_eq!(plan.preview.rect, Rect::new(0., 0., 100., 100.));
    }

    #[test]
    fn center_on_split_container_merges_into_parent() {
        let ctx = context(NodeKind::Container, LayoutKind::HSplit);
        let plan = plan_drop(&ctx, Point::new(100., 50.), DropMargins::default());
        assert_eq!(plan.region, DropRegion::Center);
        assert_eq!(plan.action, DropAction::MergeIntoParent { parent: ctx.parent });
        assert_eq!(plan.preview.rect, ctx.parent_rect);
    }

    #[test]
    fn center_on_monitor_creates_container() {
        let ctx = context(NodeKind::Monitor, LayoutKind::HSplit);
        let plan = plan_drop(&ctx, Point::new(100., 50.), DropMargins::default());
        assert_eq!(plan.action, DropAction::CreateContainer { layout: LayoutKind::Tabbed });
        assert_eq!(plan.preview.style.class_name(), "window-tilepreview-tabbed");
    }

    #[test]
    fn center_on_group_joins_it() {
        let ctx = context(NodeKind::Container, LayoutKind::Stacked);
        let plan = plan_drop(&ctx, Point::new(100., 50.), DropMargins::default());
        assert_eq!(plan.action, DropAction::JoinGroup { group: ctx.parent });
        assert_eq!(plan.preview.style, PreviewStyle::Stacked);
    }

    #[test]
    fn edge_across_split_axis_wraps_target() {
        let ctx = context(NodeKind::Container, LayoutKind::HSplit);
        let plan = plan_drop(&ctx, Point::new(100., 95.), DropMargins::default());
        assert_eq!(plan.region, DropRegion::Bottom);
        assert_eq!(
            plan.action,
            DropAction::WrapTarget { orientation: Orientation::Vertical, before: false }
        );
        assert_eq!(plan.preview.rect, Rect::new(0., 50., 200., 100.));
    }

    #[test]
    fn edge_on_group_splits_the_group() {
        let ctx = context(NodeKind::Container, LayoutKind::Tabbed);
        let plan = plan_drop(&ctx, Point::new(195., 50.), DropMargins::default());
        assert_eq!(plan.region, DropRegion::Right);
        assert_eq!(
            plan.action,
            DropAction::SplitGroup {
                group: ctx.parent,
                orientation: Orientation::Horizontal,
                before: false
            }
        );
    }

    #[test]
    fn commit_inserts_sibling_and_resets_percents() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        let c = add_window(&mut tree, mon, 3);
        tree.get_mut(a).unwrap().percent = 0.8;
        tree.render("setup");

        let engine = DropEngine::default();
        let plan = engine.evaluate(&tree, mon, c, Point::new(10., 250.)).unwrap().unwrap();
        assert_eq!(plan.target, a);
        assert_eq!(plan.region, DropRegion::Left);

        engine.preview(&mut tree, &plan);
        assert!(tree.get(c).unwrap().detach_window);
        assert_eq!(tree.children(mon), &[a, b, c]);

        engine.commit(&mut tree, &plan).unwrap();
        assert_eq!(tree.children(mon), &[c, a, b]);
        assert!(!tree.get(c).unwrap().detach_window);
        assert!(tree.children(mon).iter().all(|&n| tree.get(n).unwrap().percent == 1.0 / 3.0));
    }

    #[test]
    fn commit_center_on_monitor_child_creates_group() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        tree.render("setup");

        let engine = DropEngine::default();
        let plan = engine.evaluate(&tree, mon, b, Point::new(250., 250.)).unwrap().unwrap();
        engine.preview(&mut tree, &plan);
        assert!(tree.get(a).unwrap().create_con);
        engine.commit(&mut tree, &plan).unwrap();

        let container = tree.parent(a).unwrap();
        assert_eq!(tree.children(mon), &[container]);
        assert_eq!(tree.layout(container), LayoutKind::Tabbed);
        assert_eq!(tree.children(container), &[a, b]);
        assert_eq!(tree.active_child(container), Some(b));
        assert_eq!(tree.get(container).unwrap().percent, 1.0);
        assert!(!tree.get(a).unwrap().create_con);
    }

    #[test]
    fn commit_wrap_target_nests_vertically() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        tree.render("setup");

        let engine = DropEngine::default();
        let plan = engine.evaluate(&tree, mon, b, Point::new(250., 490.)).unwrap().unwrap();
        assert_eq!(plan.region, DropRegion::Bottom);
        engine.commit(&mut tree, &plan).unwrap();

        let container = tree.parent(a).unwrap();
        assert_eq!(tree.layout(container), LayoutKind::VSplit);
        assert_eq!(tree.children(container), &[a, b]);
        assert_eq!(tree.children(mon), &[container]);
    }

    #[test]
    fn commit_split_group_beside_last_sibling() {
        let (mut tree, mon) = single_monitor(no_gaps());
        add_window(&mut tree, mon, 1);
        let t = add_window(&mut tree, mon, 2);
        let container = tree.split(t, Orientation::Horizontal, None).unwrap();
        let d = add_window(&mut tree, container, 3);
        let group = tree.split(t, Orientation::Horizontal, Some(LayoutKind::Tabbed)).unwrap();
        add_window(&mut tree, group, 4);
        assert_eq!(tree.children(container), &[group, d]);
        tree.render("setup");

        let engine = DropEngine::default();
        let plan = engine.evaluate(&tree, mon, d, Point::new(510., 250.)).unwrap().unwrap();
        assert_eq!(plan.target, t);
        assert_eq!(
            plan.action,
            DropAction::SplitGroup { group, orientation: Orientation::Horizontal, before: true }
        );

        engine.commit(&mut tree, &plan).unwrap();
        assert_eq!(tree.children(container), &[d, group]);
        assert_eq!(tree.layout(container), LayoutKind::HSplit);
        assert_eq!(tree.get(d).unwrap().percent, 0.5);
        assert_eq!(tree.get(group).unwrap().percent, 0.5);
    }

    #[test]
    fn commit_split_group_wraps_it_among_siblings() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let group = tree.split(a, Orientation::Horizontal, Some(LayoutKind::Stacked)).unwrap();
        add_window(&mut tree, group, 2);
        let b = add_window(&mut tree, mon, 3);
        let c = add_window(&mut tree, mon, 4);
        tree.render("setup");

        let engine = DropEngine::default();
        let plan = engine.evaluate(&tree, mon, c, Point::new(150., 490.)).unwrap().unwrap();
        assert!(matches!(plan.action, DropAction::SplitGroup { before: false, .. }));

        engine.commit(&mut tree, &plan).unwrap();
        let wrapper = tree.parent(group).unwrap();
        assert_eq!(tree.layout(wrapper), LayoutKind::VSplit);
        assert_eq!(tree.children(wrapper), &[group, c]);
        assert_eq!(tree.children(mon), &[wrapper, b]);
    }

    #[test]
    fn failed_commit_restores_the_original_position() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let b = add_window(&mut tree, mon, 2);
        let c = add_window(&mut tree, mon, 3);
        let plan = DropPlan {
            dragged: b,
            target: a,
            region: DropRegion::Center,
            action: DropAction::MergeIntoParent { parent: a },
            preview: DropPreview { rect: Rect::ZERO, style: PreviewStyle::Tiled },
        };

        let engine = DropEngine::default();
        assert_eq!(engine.commit(&mut tree, &plan), Err(LayoutError::InvalidParent(a)));
        assert_eq!(tree.children(mon), &[a, b, c]);
        assert_eq!(tree.parent(b), Some(mon));
    }

    #[test]
    fn hidden_tabs_cannot_be_hit() {
        let (mut tree, mon) = single_monitor(no_gaps());
        let a = add_window(&mut tree, mon, 1);
        let group = tree.split(a, Orientation::Horizontal, Some(LayoutKind::Tabbed)).unwrap();
        let b = add_window(&mut tree, group, 2);
        let c = add_window(&mut tree, mon, 3);
        tree.render("setup");

        assert_eq!(tree.window_at_pointer(mon, Point::new(100., 100.), c), Some(a));
        tree.get_mut(group).unwrap().last_tab_focus = Some(b);
        assert_eq!(tree.window_at_pointer(mon, Point::new(100., 100.), c), Some(b));
        assert_eq!(tree.window_at_pointer(mon, Point::new(100., 100.), b), None);
    }
}
