use kurbo::{Point, Rect, Size};

use crate::layout_engine::Orientation;

/// Axis-oriented helpers on top of [`kurbo::Rect`].
///
/// Split containers only ever reason about one axis at a time, so most layout
/// math is written against "the extent along this orientation" instead of
/// width/height directly.
pub trait RectExt {
    fn axis_len(&self, orientation: Orientation) -> f64;
    fn axis_start(&self, orientation: Orientation) -> f64;
    fn with_axis_span(&self, orientation: Orientation, start: f64, len: f64) -> Rect;
    /// Shrinks the rect by `amount` on every side, never below zero size.
    fn shrink(&self, amount: f64) -> Rect;
    /// A rect of `size` (clamped to fit) centered inside `self`.
    fn centered(&self, size: Size) -> Rect;
    fn has_area(&self) -> bool;
}

impl RectExt for Rect {
    fn axis_len(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width(),
            Orientation::Vertical => self.height(),
        }
    }

    fn axis_start(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x0,
            Orientation::Vertical => self.y0,
        }
    }

    fn with_axis_span(&self, orientation: Orientation, start: f64, len: f64) -> Rect {
        match orientation {
            Orientation::Horizontal => Rect::new(start, self.y0, start + len, self.y1),
            Orientation::Vertical => Rect::new(self.x0, start, self.x1, start + len),
        }
    }

    fn shrink(&self, amount: f64) -> Rect {
        if amount <= 0.0 {
            return *self;
        }
        let dx = amount.min(self.width() / 2.0);
        let dy = amount.min(self.height() / 2.0);
        Rect::new(self.x0 + dx, self.y0 + dy, self.x1 - dx, self.y1 - dy)
    }

    fn centered(&self, size: Size) -> Rect {
        let width = size.width.min(self.width());
        let height = size.height.min(self.height());
        let center = self.center();
        Rect::from_center_size(center, Size::new(width, height))
    }

    fn has_area(&self) -> bool { self.width() > 0.0 && self.height() > 0.0 }
}

/// Point-in-rect test that includes the far edges, so a pointer resting on
/// the right or bottom border of a window still hits it.
pub fn contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}
