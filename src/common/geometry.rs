//! Integer geometry shared by the tree, the layout engine and the display
//! boundary.

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Point { x, y } }

    /// Chebyshev distance, which is what a drag threshold compares against.
    pub fn max_axis_distance(self, other: Point) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Per-edge amounts to shrink a rectangle by.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Insets {
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
    pub right: i32,
}

impl Insets {
    pub const fn uniform(px: i32) -> Self {
        Insets { top: px, left: px, bottom: px, right: px }
    }
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn max_x(&self) -> i32 { self.x + self.width }

    pub fn max_y(&self) -> i32 { self.y + self.height }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width) * i64::from(self.height)
        }
    }

    pub fn is_empty(&self) -> bool { self.width <= 0 || self.height <= 0 }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.max_x() && p.y >= self.y && p.y < self.max_y()
    }

    /// Shrinks the rectangle, never producing a negative size.
    pub fn inset(&self, insets: Insets) -> Rect {
        Rect {
            x: self.x + insets.left,
            y: self.y + insets.top,
            width: (self.width - insets.left - insets.right).max(0),
            height: (self.height - insets.top - insets.bottom).max(0),
        }
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Moves the rectangle so it keeps its offset relative to `from` when
    /// `from`'s origin is replaced by `to`'s.
    pub fn rebase(&self, from: &Rect, to: &Rect) -> Rect {
        self.translate(to.x - from.x, to.y - from.y)
    }

    /// Expresses `self` in coordinates relative to `outer`'s origin.
    pub fn relative_to(&self, outer: &Rect) -> Rect { self.translate(-outer.x, -outer.y) }

    /// Places a rectangle of the given size centred inside `self`.
    pub fn centered(&self, width: i32, height: i32) -> Rect {
        Rect {
            x: self.x + (self.width - width) / 2,
            y: self.y + (self.height - height) / 2,
            width,
            height,
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inset_clamps_to_zero() {
        let r = Rect::new(0, 0, 4, 4);
        assert_eq!(r.inset(Insets::uniform(3)), Rect::new(3, 3, 0, 0));
        assert!(r.inset(Insets::uniform(3)).is_empty());
        assert_eq!(r.inset(Insets::uniform(3)).area(), 0);
    }

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10, 10, 10, 10);
        assert!(r.contains(Point::new(10, 10)));
        assert!(r.contains(Point::new(19, 19)));
        assert!(!r.contains(Point::new(20, 19)));
    }

    #[test]
    fn rebase_keeps_relative_offset() {
        let a = Rect::new(0, 0, 1920, 1080);
        let b = Rect::new(1920, 0, 2560, 1440);
        let win = Rect::new(100, 50, 400, 300);
        assert_eq!(win.rebase(&a, &b), Rect::new(2020, 50, 400, 300));
    }

    #[test]
    fn centered_splits_slack() {
        let r = Rect::new(0, 0, 101, 50);
        assert_eq!(r.centered(50, 50), Rect::new(25, 0, 50, 50));
    }
}
