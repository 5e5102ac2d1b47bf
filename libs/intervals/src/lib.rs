//! An ordered map from pairwise non-overlapping spans to values.
//!
//! Two spans overlap when their interiors intersect; spans that merely abut
//! (`[0, 10]` and `[10, 20]`) may coexist in the same set.
//!
//! # Examples
//!
//! ```
//! # use geometry::span::Span;
//! # use intervals::IntervalSet;
//! let mut set = IntervalSet::new();
//! assert!(set.add(Span::new(0, 10), "a"));
//! assert!(set.add(Span::new(10, 20), "b"));
//! assert!(!set.add(Span::new(5, 15), "c"));
//! assert_eq!(set.get(&Span::new(10, 20)), Some(&"b"));
//! ```
#![warn(missing_docs)]

use std::collections::BTreeMap;

use geometry::span::Span;

/// A set of disjoint spans, each carrying a value, iterated in increasing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSet<V> {
    // Keyed by (start, stop). Because stored spans never overlap, stops are
    // non-decreasing in key order.
    map: BTreeMap<(i64, i64), V>,
}

impl<V> Default for IntervalSet<V> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

fn key(span: &Span) -> (i64, i64) {
    (span.start(), span.stop())
}

impl<V> IntervalSet<V> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of stored spans.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the set holds no spans.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the value stored under exactly `span`.
    pub fn get(&self, span: &Span) -> Option<&V> {
        self.map.get(&key(span))
    }

    /// Returns a mutable reference to the value stored under exactly `span`.
    pub fn get_mut(&mut self, span: &Span) -> Option<&mut V> {
        self.map.get_mut(&key(span))
    }

    /// Returns `true` if `span` is stored exactly.
    pub fn contains_key(&self, span: &Span) -> bool {
        self.map.contains_key(&key(span))
    }

    /// Iterates over the stored spans that overlap `span`, in increasing order.
    pub fn overlapping(&self, span: &Span) -> impl Iterator<Item = (Span, &V)> {
        let start = span.start();
        let mut hits: Vec<_> = self
            .map
            .range(..(span.stop(), i64::MIN))
            .rev()
            .take_while(|((_, stop), _)| *stop > start)
            .map(|(&(a, b), v)| (Span::new(a, b), v))
            .collect();
        hits.reverse();
        hits.into_iter()
    }

    /// Returns `true` if any stored span overlaps `span`.
    pub fn overlaps(&self, span: &Span) -> bool {
        self.overlapping(span).next().is_some()
    }

    /// Inserts `span` if it does not overlap any stored span.
    ///
    /// Returns `false`, leaving the set untouched, if it does.
    pub fn add(&mut self, span: Span, value: V) -> bool {
        if self.overlaps(&span) || self.contains_key(&span) {
            return false;
        }
        self.map.insert(key(&span), value);
        true
    }

    /// Removes exactly `span`, returning its value.
    pub fn remove(&mut self, span: &Span) -> Option<V> {
        self.map.remove(&key(span))
    }

    /// Iterates over all spans and values in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = (Span, &V)> {
        self.map.iter().map(|(&(a, b), v)| (Span::new(a, b), v))
    }

    /// Iterates over all stored spans in increasing order.
    pub fn spans(&self) -> impl Iterator<Item = Span> + '_ {
        self.map.keys().map(|&(a, b)| Span::new(a, b))
    }
}

impl<V> IntoIterator for IntervalSet<V> {
    type Item = (Span, V);
    type IntoIter = std::iter::Map<
        std::collections::btree_map::IntoIter<(i64, i64), V>,
        fn(((i64, i64), V)) -> (Span, V),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.map.into_iter().map(|((a, b), v)| (Span::new(a, b), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abutting_spans_coexist() {
        let mut set = IntervalSet::new();
        assert!(set.add(Span::new(10, 20), 1));
        assert!(set.add(Span::new(0, 10), 0));
        assert!(set.add(Span::new(20, 30), 2));
        let spans: Vec<_> = set.spans().collect();
        assert_eq!(
            spans,
            vec![Span::new(0, 10), Span::new(10, 20), Span::new(20, 30)]
        );
    }

    #[test]
    fn overlapping_and_duplicate_spans_are_rejected() {
        let mut set = IntervalSet::new();
        assert!(set.add(Span::new(0, 10), ()));
        assert!(!set.add(Span::new(9, 11), ()));
        assert!(!set.add(Span::new(-5, 1), ()));
        assert!(!set.add(Span::new(2, 3), ()));
        assert!(!set.add(Span::new(0, 10), ()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn overlapping_query_returns_all_hits_in_order() {
        let mut set = IntervalSet::new();
        for (i, start) in [0, 20, 40, 60].into_iter().enumerate() {
            assert!(set.add(Span::new(start, start + 10), i));
        }
        let hits: Vec<_> = set
            .overlapping(&Span::new(5, 45))
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(hits, vec![0, 1, 2]);
        assert!(!set.overlaps(&Span::new(10, 20)));
    }

    #[test]
    fn exact_lookup_and_update() {
        let mut set = IntervalSet::new();
        set.add(Span::new(0, 4), (0, 100));
        if let Some(v) = set.get_mut(&Span::new(0, 4)) {
            v.1 = 200;
        }
        assert_eq!(set.get(&Span::new(0, 4)), Some(&(0, 200)));
        assert_eq!(set.get(&Span::new(0, 5)), None);
        assert_eq!(set.remove(&Span::new(0, 4)), Some((0, 200)));
        assert!(set.is_empty());
    }
}
