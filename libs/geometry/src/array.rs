//! Arrays of rectangles.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::rect::Rect;
use crate::transform::{Transform, Transformation};

/// A rectangle repeated `nx` times horizontally and `ny` times vertically.
///
/// Spacings are measured between the lower-left corners of adjacent copies and
/// may be negative.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxArray {
    base: Rect,
    nx: u32,
    ny: u32,
    spx: i64,
    spy: i64,
}

impl BoxArray {
    /// Creates a new box array.
    ///
    /// # Panics
    ///
    /// Panics if `nx` or `ny` is zero.
    pub fn new(base: Rect, nx: u32, ny: u32, spx: i64, spy: i64) -> Self {
        assert!(nx > 0 && ny > 0, "box array dimensions must be positive");
        Self {
            base,
            nx,
            ny,
            spx: if nx == 1 { 0 } else { spx },
            spy: if ny == 1 { 0 } else { spy },
        }
    }

    /// The first rectangle of the array.
    #[inline]
    pub fn base(&self) -> Rect {
        self.base
    }

    /// Number of columns.
    #[inline]
    pub fn nx(&self) -> u32 {
        self.nx
    }

    /// Number of rows.
    #[inline]
    pub fn ny(&self) -> u32 {
        self.ny
    }

    /// Column spacing.
    #[inline]
    pub fn spx(&self) -> i64 {
        self.spx
    }

    /// Row spacing.
    #[inline]
    pub fn spy(&self) -> i64 {
        self.spy
    }

    /// The number of rectangles in the array.
    pub fn len(&self) -> usize {
        self.nx as usize * self.ny as usize
    }

    /// Always false; an array holds at least one rectangle.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The bounding box of every rectangle in the array.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let arr = BoxArray::new(Rect::from_sides(0, 0, 10, 10), 3, 2, 20, 30);
    /// assert_eq!(arr.bbox(), Rect::from_sides(0, 0, 50, 40));
    /// ```
    pub fn bbox(&self) -> Rect {
        let last = self
            .base
            .translate(self.spx * (self.nx as i64 - 1), self.spy * (self.ny as i64 - 1));
        self.base.union(last)
    }

    /// Iterates over every rectangle, column-major.
    pub fn iter(&self) -> impl Iterator<Item = Rect> + '_ {
        (0..self.nx as i64).flat_map(move |i| {
            (0..self.ny as i64).map(move |j| self.base.translate(i * self.spx, j * self.spy))
        })
    }

    /// Translates the whole array by `(dx, dy)`.
    pub fn translate(self, dx: i64, dy: i64) -> Self {
        Self {
            base: self.base.translate(dx, dy),
            ..self
        }
    }
}

impl From<Rect> for BoxArray {
    fn from(value: Rect) -> Self {
        Self::new(value, 1, 1, 0, 0)
    }
}

impl Transform for BoxArray {
    fn transform(&self, trans: Transformation) -> Self {
        let orient = trans.orientation();
        let vx = orient.apply(Point::new(self.spx, 0));
        let vy = orient.apply(Point::new(0, self.spy));
        let base = self.base.transform(trans);
        if vx.y == 0 && vy.x == 0 {
            Self::new(base, self.nx, self.ny, vx.x, vy.y)
        } else {
            Self::new(base, self.ny, self.nx, vy.x, vx.y)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;

    #[test]
    fn transform_keeps_every_rect() {
        let arr = BoxArray::new(Rect::from_sides(0, 0, 2, 4), 3, 2, 10, 20);
        for orient in Orientation::all() {
            let trans = Transformation::from_offset_and_orientation(Point::new(7, -3), orient);
            let mut expected: Vec<Rect> = arr.iter().map(|r| r.transform(trans)).collect();
            let mut actual: Vec<Rect> = arr.transform(trans).iter().collect();
            expected.sort();
            actual.sort();
            assert_eq!(expected, actual, "{orient:?}");
        }
    }

    #[test]
    fn single_copy_drops_spacing() {
        let arr = BoxArray::new(Rect::from_sides(0, 0, 1, 1), 1, 1, 5, 5);
        assert_eq!(arr.spx(), 0);
        assert_eq!(arr.bbox(), Rect::from_sides(0, 0, 1, 1));
    }
}
