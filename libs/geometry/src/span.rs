//! A one-dimensional span.
//!
//! A span represents the closed interval `[start, stop]`.
use serde::{Deserialize, Serialize};

/// A closed interval of coordinates in one dimension.
///
/// Represents the range `[start, stop]`.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] between two integers.
    ///
    /// The endpoints may be given in either order.
    pub fn new(start: i64, stop: i64) -> Self {
        use std::cmp::{max, min};
        Self {
            start: min(start, stop),
            stop: max(start, stop),
        }
    }

    /// Creates a span of zero length encompassing the given point.
    pub const fn from_point(x: i64) -> Self {
        Self { start: x, stop: x }
    }

    /// Creates a span of the given length starting from `start`.
    pub const fn with_start_and_length(start: i64, length: i64) -> Self {
        Self {
            stop: start + length,
            start,
        }
    }

    /// Creates a new [`Span`] with center `center` and length `span`.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let span = Span::from_center_span(0, 40);
    /// assert_eq!(span, Span::new(-20, 20));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `span` is negative or odd.
    pub fn from_center_span(center: i64, span: i64) -> Self {
        assert!(span >= 0);
        assert_eq!(span % 2, 0);

        Self::new(center - (span / 2), center + (span / 2))
    }

    /// Gets the center of the span.
    #[inline]
    pub const fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    /// Gets the length of the span.
    #[inline]
    pub const fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// Gets the start of the span.
    #[inline]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Gets the stop of the span.
    #[inline]
    pub const fn stop(&self) -> i64 {
        self.stop
    }

    /// Checks if the span intersects with the [`Span`] `other`.
    ///
    /// Spans that only share an endpoint intersect.
    #[inline]
    pub const fn intersects(&self, other: &Self) -> bool {
        !(other.stop < self.start || self.stop < other.start)
    }

    /// Checks if the interiors of this span and `other` overlap.
    ///
    /// Abutting spans do not overlap.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert!(Span::new(0, 10).overlaps(&Span::new(5, 15)));
    /// assert!(!Span::new(0, 10).overlaps(&Span::new(10, 15)));
    /// ```
    #[inline]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// Returns `true` if `other` lies entirely inside this span.
    #[inline]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }

    /// Calculates the smallest interval containing this span and `other`.
    pub fn union(self, other: Self) -> Self {
        use std::cmp::{max, min};
        Self {
            start: min(self.start, other.start),
            stop: max(self.stop, other.stop),
        }
    }

    /// Calculates the minimal bounding interval of all spans provided.
    ///
    /// Returns [`None`] if the iterator is empty.
    pub fn union_all(spans: impl IntoIterator<Item = Self>) -> Option<Self> {
        spans.into_iter().reduce(Self::union)
    }

    /// Calculates the intersection of this span with `other`.
    pub fn intersection(self, other: Self) -> Option<Self> {
        let start = std::cmp::max(self.start(), other.start());
        let stop = std::cmp::min(self.stop(), other.stop());
        if start > stop {
            None
        } else {
            Some(Self::new(start, stop))
        }
    }

    /// Returns a new [`Span`] representing the union of the current span with the given point.
    pub fn add_point(self, pos: i64) -> Self {
        use std::cmp::{max, min};
        Self {
            start: min(self.start, pos),
            stop: max(self.stop, pos),
        }
    }

    /// Creates a new [`Span`] expanded by `amount` in both directions.
    pub const fn expand_all(mut self, amount: i64) -> Self {
        self.stop += amount;
        self.start -= amount;
        self
    }

    /// Translates the span by the given amount.
    pub const fn translate(self, amount: i64) -> Self {
        Self {
            start: self.start + amount,
            stop: self.stop + amount,
        }
    }
}

impl From<(i64, i64)> for Span {
    #[inline]
    fn from(tup: (i64, i64)) -> Self {
        Self::new(tup.0, tup.1)
    }
}
