use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn other(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::Left | Direction::Right => Orientation::Horizontal,
            Direction::Up | Direction::Down => Orientation::Vertical,
        }
    }

    /// Right and Down walk towards the end of a child list.
    pub fn is_forward(self) -> bool { matches!(self, Direction::Right | Direction::Down) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    Root,
    Monitor,
    Workspace,
    Container,
    Window,
}

impl NodeKind {
    /// Kinds that may hold a layout and children.
    pub fn is_structural(self) -> bool { !matches!(self, NodeKind::Window) }
}

#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutKind {
    #[strum(to_string = "HSPLIT")]
    HSplit,
    #[strum(to_string = "VSPLIT")]
    VSplit,
    Stacked,
    Tabbed,
    #[default]
    None,
}

impl From<Orientation> for LayoutKind {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => LayoutKind::HSplit,
            Orientation::Vertical => LayoutKind::VSplit,
        }
    }
}

impl LayoutKind {
    /// Layouts whose children share one rect and show one at a time.
    pub fn is_group(self) -> bool { matches!(self, LayoutKind::Stacked | LayoutKind::Tabbed) }

    pub fn is_split(self) -> bool { matches!(self, LayoutKind::HSplit | LayoutKind::VSplit) }

    /// The axis children are partitioned along. Groups have no partition axis.
    pub fn split_orientation(self) -> Option<Orientation> {
        match self {
            LayoutKind::HSplit => Some(Orientation::Horizontal),
            LayoutKind::VSplit => Some(Orientation::Vertical),
            _ => None,
        }
    }

    /// The axis a group's tabs are laid out on: tab headers run horizontally,
    /// stacked headers vertically.
    pub fn group_orientation(self) -> Option<Orientation> {
        match self {
            LayoutKind::Tabbed => Some(Orientation::Horizontal),
            LayoutKind::Stacked => Some(Orientation::Vertical),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            LayoutKind::HSplit => LayoutKind::VSplit,
            LayoutKind::VSplit => LayoutKind::HSplit,
            other => other,
        }
    }
}

#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowMode {
    Float,
    Tile,
    /// A tiled window that is currently being dragged.
    GrabTile,
    #[default]
    Default,
}

impl WindowMode {
    pub fn is_tiled(self) -> bool { !matches!(self, WindowMode::Float) }
}
