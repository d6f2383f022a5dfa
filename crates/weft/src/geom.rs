//! Small geometry primitives for terminal cell space.
//!
//! Coordinates are zero-based, with `x` counting columns and `y` counting
//! rows, so `Point { x: 0, y: 0 }` is the top-left cell of the screen.

use std::ops::Add;

/// A point in cell space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl Point {
    /// Construct a point.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl From<(u32, u32)> for Point {
    fn from((x, y): (u32, u32)) -> Self {
        Self { x, y }
    }
}

/// A width/height extent in cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
}

impl Size {
    /// Construct a size.
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }

    /// Total cell count.
    pub fn area(&self) -> u32 {
        self.w.saturating_mul(self.h)
    }

    /// The size as a rectangle anchored at the origin.
    pub fn rect(&self) -> Rect {
        Rect {
            tl: Point::default(),
            w: self.w,
            h: self.h,
        }
    }
}

impl From<(u32, u32)> for Size {
    fn from((w, h): (u32, u32)) -> Self {
        Self { w, h }
    }
}

/// A rectangle in cell space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Top-left corner.
    pub tl: Point,
    /// Width in columns.
    pub w: u32,
    /// Height in rows.
    pub h: u32,
}

impl Rect {
    /// Construct a rectangle from its top-left corner and extent.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            tl: Point { x, y },
            w,
            h,
        }
    }

    /// The extent of this rectangle.
    pub fn size(&self) -> Size {
        Size {
            w: self.w,
            h: self.h,
        }
    }

    /// One past the rightmost column.
    pub fn right(&self) -> u32 {
        self.tl.x + self.w
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> u32 {
        self.tl.y + self.h
    }

    /// True when the rectangle covers no cells.
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Does this rectangle contain the point?
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.tl.x && p.x < self.right() && p.y >= self.tl.y && p.y < self.bottom()
    }

    /// The overlap between two rectangles, if any.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let x1 = self.tl.x.max(other.tl.x);
        let y1 = self.tl.y.max(other.tl.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x1 < x2 && y1 < y2 {
            Some(Self {
                tl: Point { x: x1, y: y1 },
                w: x2 - x1,
                h: y2 - y1,
            })
        } else {
            None
        }
    }

    /// Split off `rows` from the top, returning `(top, rest)`.
    pub fn split_top(&self, rows: u32) -> (Self, Self) {
        let rows = rows.min(self.h);
        (
            Self {
                tl: self.tl,
                w: self.w,
                h: rows,
            },
            Self {
                tl: Point {
                    x: self.tl.x,
                    y: self.tl.y + rows,
                },
                w: self.w,
                h: self.h - rows,
            },
        )
    }

    /// Split off `cols` from the left, returning `(left, rest)`.
    pub fn split_left(&self, cols: u32) -> (Self, Self) {
        let cols = cols.min(self.w);
        (
            Self {
                tl: self.tl,
                w: cols,
                h: self.h,
            },
            Self {
                tl: Point {
                    x: self.tl.x + cols,
                    y: self.tl.y,
                },
                w: self.w - cols,
                h: self.h,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rect::new(5, 5, 5, 5)));
        assert_eq!(a.intersect(&Rect::new(10, 10, 2, 2)), None);
        assert_eq!(a.intersect(&a), Some(a));
    }

    #[test]
    fn contains() {
        let r = Rect::new(2, 3, 4, 2);
        assert!(r.contains_point(Point::new(2, 3)));
        assert!(r.contains_point(Point::new(5, 4)));
        assert!(!r.contains_point(Point::new(6, 4)));
        assert!(!r.contains_point(Point::new(2, 5)));
    }

    #[test]
    fn splits() {
        let r = Rect::new(0, 0, 8, 6);
        let (top, rest) = r.split_top(2);
        assert_eq!(top, Rect::new(0, 0, 8, 2));
        assert_eq!(rest, Rect::new(0, 2, 8, 4));
        let (left, rest) = r.split_left(3);
        assert_eq!(left, Rect::new(0, 0, 3, 6));
        assert_eq!(rest, Rect::new(3, 0, 5, 6));
    }
}
