//! Utilities and types for orienting layout objects.

use serde::{Deserialize, Serialize};

use crate::point::Point;

/// One of the 8 Manhattan orientations of a placed object.
///
/// Mirroring is applied before rotation.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    /// No rotations or reflections.
    #[default]
    R0,
    /// Rotate 90 degrees counter-clockwise.
    R90,
    /// Rotate 180 degrees.
    R180,
    /// Rotate 270 degrees counter-clockwise.
    R270,
    /// Mirror about the x-axis.
    MX,
    /// Mirror about the y-axis.
    MY,
    /// Mirror about the x-axis, then rotate 90 degrees counter-clockwise.
    MXR90,
    /// Mirror about the y-axis, then rotate 90 degrees counter-clockwise.
    MYR90,
}

/// A 2x2 integer matrix; `p' = M * p`.
pub(crate) type Matrix = [[i64; 2]; 2];

impl Orientation {
    /// Returns all 8 orientations.
    pub fn all() -> [Self; 8] {
        use Orientation::*;
        [R0, R90, R180, R270, MX, MY, MXR90, MYR90]
    }

    pub(crate) const fn matrix(self) -> Matrix {
        use Orientation::*;
        match self {
            R0 => [[1, 0], [0, 1]],
            R90 => [[0, -1], [1, 0]],
            R180 => [[-1, 0], [0, -1]],
            R270 => [[0, 1], [-1, 0]],
            MX => [[1, 0], [0, -1]],
            MY => [[-1, 0], [0, 1]],
            MXR90 => [[0, 1], [1, 0]],
            MYR90 => [[0, -1], [-1, 0]],
        }
    }

    pub(crate) fn from_matrix(mat: Matrix) -> Self {
        Self::all()
            .into_iter()
            .find(|o| o.matrix() == mat)
            .expect("Manhattan orientations are closed under composition")
    }

    /// Applies this orientation to a point about the origin.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Orientation::R90.apply(Point::new(1, 2)), Point::new(-2, 1));
    /// assert_eq!(Orientation::MX.apply(Point::new(1, 2)), Point::new(1, -2));
    /// ```
    pub const fn apply(self, p: Point) -> Point {
        let m = self.matrix();
        Point::new(m[0][0] * p.x + m[0][1] * p.y, m[1][0] * p.x + m[1][1] * p.y)
    }

    /// Returns `true` if this orientation maps horizontal lines to vertical ones.
    pub const fn swaps_axes(self) -> bool {
        self.matrix()[0][0] == 0
    }

    /// Returns the orientation equivalent to applying `child` first, then `self`.
    pub fn compose(self, child: Orientation) -> Self {
        let (a, b) = (self.matrix(), child.matrix());
        let mut out = [[0; 2]; 2];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = a[i][0] * b[0][j] + a[i][1] * b[1][j];
            }
        }
        Self::from_matrix(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composition_matches_sequential_application() {
        let p = Point::new(3, 7);
        for a in Orientation::all() {
            for b in Orientation::all() {
                assert_eq!(a.compose(b).apply(p), a.apply(b.apply(p)), "{a:?} * {b:?}");
            }
        }
    }

    #[test]
    fn mirrored_rotations() {
        assert_eq!(Orientation::MXR90.apply(Point::new(1, 2)), Point::new(2, 1));
        assert_eq!(Orientation::MYR90.apply(Point::new(1, 2)), Point::new(-2, -1));
        assert_eq!(Orientation::R90.compose(Orientation::R270), Orientation::R0);
        assert!(Orientation::MYR90.swaps_axes());
        assert!(!Orientation::R180.swaps_axes());
    }
}
