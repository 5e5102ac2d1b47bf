//! Axis-aligned rectangles.

use serde::{Deserialize, Serialize};

use crate::dir::Dir;
use crate::point::Point;
use crate::span::Span;
use crate::transform::{Transform, Transformation};

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
#[derive(
    Debug, Default, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Rect {
    /// The lower-left corner.
    p0: Point,
    /// The upper-right corner.
    p1: Point,
}

impl Rect {
    /// Creates a rectangle from two opposite corners.
    ///
    /// The corners are normalized so that `p0` is the lower-left corner.
    pub fn new(a: Point, b: Point) -> Self {
        use std::cmp::{max, min};
        Self {
            p0: Point::new(min(a.x, b.x), min(a.y, b.y)),
            p1: Point::new(max(a.x, b.x), max(a.y, b.y)),
        }
    }

    /// Creates a rectangle from all 4 sides (left, bottom, right, top).
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(15, 20, 30, 40);
    /// assert_eq!(rect.left(), 15);
    /// assert_eq!(rect.bot(), 20);
    /// assert_eq!(rect.right(), 30);
    /// assert_eq!(rect.top(), 40);
    /// ```
    pub fn from_sides(left: i64, bot: i64, right: i64, top: i64) -> Self {
        Self::new(Point::new(left, bot), Point::new(right, top))
    }

    /// Creates a rectangle from a horizontal and a vertical [`Span`].
    pub fn from_spans(h: Span, v: Span) -> Self {
        Self::from_sides(h.start(), v.start(), h.stop(), v.stop())
    }

    /// Creates a rectangle from a span along `dir` and a span perpendicular to it.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let span1 = Span::new(10, 30);
    /// let span2 = Span::new(25, 50);
    /// let rect = Rect::from_dir_spans(Dir::Horiz, span1, span2);
    /// assert_eq!(rect, Rect::from_sides(10, 25, 30, 50));
    /// let rect = Rect::from_dir_spans(Dir::Vert, span1, span2);
    /// assert_eq!(rect, Rect::from_sides(25, 10, 50, 30));
    /// ```
    pub fn from_dir_spans(dir: Dir, parallel_span: Span, perp_span: Span) -> Self {
        match dir {
            Dir::Vert => Self::from_spans(perp_span, parallel_span),
            Dir::Horiz => Self::from_spans(parallel_span, perp_span),
        }
    }

    /// The bottom y-coordinate.
    #[inline]
    pub const fn bot(&self) -> i64 {
        self.p0.y
    }

    /// The top y-coordinate.
    #[inline]
    pub const fn top(&self) -> i64 {
        self.p1.y
    }

    /// The left x-coordinate.
    #[inline]
    pub const fn left(&self) -> i64 {
        self.p0.x
    }

    /// The right x-coordinate.
    #[inline]
    pub const fn right(&self) -> i64 {
        self.p1.x
    }

    /// The lower-left corner.
    #[inline]
    pub const fn lower_left(&self) -> Point {
        self.p0
    }

    /// The upper-right corner.
    #[inline]
    pub const fn upper_right(&self) -> Point {
        self.p1
    }

    /// The horizontal extent of the rectangle.
    #[inline]
    pub fn hspan(&self) -> Span {
        Span::new(self.p0.x, self.p1.x)
    }

    /// The vertical extent of the rectangle.
    #[inline]
    pub fn vspan(&self) -> Span {
        Span::new(self.p0.y, self.p1.y)
    }

    /// The span of the rectangle along `dir`.
    #[inline]
    pub fn span(&self, dir: Dir) -> Span {
        match dir {
            Dir::Horiz => self.hspan(),
            Dir::Vert => self.vspan(),
        }
    }

    /// Returns a copy of this rectangle whose extent along `dir` is replaced by `span`.
    pub fn with_span(self, span: Span, dir: Dir) -> Self {
        match dir {
            Dir::Horiz => Self::from_spans(span, self.vspan()),
            Dir::Vert => Self::from_spans(self.hspan(), span),
        }
    }

    /// The width of the rectangle.
    #[inline]
    pub const fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// The height of the rectangle.
    #[inline]
    pub const fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// The length of the rectangle along `dir`.
    pub const fn length(&self, dir: Dir) -> i64 {
        match dir {
            Dir::Horiz => self.width(),
            Dir::Vert => self.height(),
        }
    }

    /// The center of the rectangle, rounded down.
    pub const fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    /// Calculates the smallest rectangle containing both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        Self::from_spans(self.hspan().union(other.hspan()), self.vspan().union(other.vspan()))
    }

    /// Calculates the minimal bounding rectangle of all rectangles provided.
    ///
    /// Returns [`None`] if the iterator is empty.
    pub fn union_all(rects: impl IntoIterator<Item = Self>) -> Option<Self> {
        rects.into_iter().reduce(Self::union)
    }

    /// Calculates the intersection of `self` and `other`, if any.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let h = self.hspan().intersection(other.hspan())?;
        let v = self.vspan().intersection(other.vspan())?;
        Some(Self::from_spans(h, v))
    }

    /// Expands the rectangle by `amount` on both sides associated with the direction `dir`.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let rect = Rect::from_sides(0, 0, 100, 200);
    /// assert_eq!(rect.expand_dir(Dir::Horiz, 20), Rect::from_sides(-20, 0, 120, 200));
    /// assert_eq!(rect.expand_dir(Dir::Vert, 20), Rect::from_sides(0, -20, 100, 220));
    /// ```
    pub fn expand_dir(&self, dir: Dir, amount: i64) -> Self {
        self.with_span(self.span(dir).expand_all(amount), dir)
    }

    /// Expands the rectangle by `amount` on all sides.
    pub fn expand_all(&self, amount: i64) -> Self {
        self.expand_dir(Dir::Horiz, amount)
            .expand_dir(Dir::Vert, amount)
    }

    /// Extends the rectangle along `dir` so that it includes the coordinate `coord`.
    pub fn extend_to(&self, dir: Dir, coord: i64) -> Self {
        self.with_span(self.span(dir).add_point(coord), dir)
    }

    /// Translates the rectangle by `(dx, dy)`.
    pub fn translate(self, dx: i64, dy: i64) -> Self {
        Self {
            p0: self.p0.translate(dx, dy),
            p1: self.p1.translate(dx, dy),
        }
    }
}

impl Transform for Rect {
    fn transform(&self, trans: Transformation) -> Self {
        Self::new(self.p0.transform(trans), self.p1.transform(trans))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::Orientation;

    #[test]
    fn transform_renormalizes_corners() {
        let rect = Rect::from_sides(0, 0, 10, 20);
        let trans = Transformation::from_offset_and_orientation(Point::new(5, 5), Orientation::R90);
        assert_eq!(rect.transform(trans), Rect::from_sides(-15, 5, 5, 15));
    }

    #[test]
    fn extend_to_grows_only_one_axis() {
        let rect = Rect::from_sides(0, 0, 10, 20);
        assert_eq!(rect.extend_to(Dir::Vert, 50), Rect::from_sides(0, 0, 10, 50));
        assert_eq!(rect.extend_to(Dir::Horiz, 5), rect);
    }
}
