//! Transformation types and traits.

use serde::{Deserialize, Serialize};

use crate::orientation::Orientation;
use crate::point::Point;

/// A Manhattan translation, rotation, and/or reflection of geometry.
///
/// The orientation is applied first, then the offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transformation {
    orient: Orientation,
    offset: Point,
}

impl Transformation {
    /// Returns the identity transform, leaving any transformed object unmodified.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Returns a translation by `(x, y)`.
    pub fn translate(x: i64, y: i64) -> Self {
        Self::from_offset(Point::new(x, y))
    }

    /// Creates a transform from only an offset.
    pub fn from_offset(offset: Point) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Creates a transform from an offset and an [`Orientation`].
    pub fn from_offset_and_orientation(offset: Point, orient: Orientation) -> Self {
        Self { orient, offset }
    }

    /// Creates a new [`Transformation`] that is the cascade of `parent` and `child`.
    ///
    /// "Parent" and "child" refer to a typical layout-instance hierarchy,
    /// in which each layer of instance has a nested set of transformations relative to its
    /// top-level parent. The child is applied first.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let parent = Transformation::from_offset_and_orientation(Point::new(10, 0), Orientation::R90);
    /// let child = Transformation::translate(1, 0);
    /// let total = Transformation::cascade(parent, child);
    /// assert_eq!(Point::new(0, 0).transform(total), Point::new(10, 1));
    /// ```
    pub fn cascade(parent: Transformation, child: Transformation) -> Transformation {
        Self {
            orient: parent.orient.compose(child.orient),
            offset: parent.orient.apply(child.offset) + parent.offset,
        }
    }

    /// The translation applied by this transformation.
    pub fn offset_point(&self) -> Point {
        self.offset
    }

    /// The orientation applied by this transformation.
    pub fn orientation(&self) -> Orientation {
        self.orient
    }
}

/// A trait for objects that can be transformed.
pub trait Transform: Sized {
    /// Returns a transformed copy of `self`.
    fn transform(&self, trans: Transformation) -> Self;
}

impl Transform for Point {
    fn transform(&self, trans: Transformation) -> Self {
        trans.orient.apply(*self) + trans.offset
    }
}

impl<T: Transform> Transform for Vec<T> {
    fn transform(&self, trans: Transformation) -> Self {
        self.iter().map(|v| v.transform(trans)).collect()
    }
}
