//! An import prelude that re-exports commonly used items.

pub use crate::array::BoxArray;
pub use crate::dir::Dir;
pub use crate::orientation::Orientation;
pub use crate::point::Point;
pub use crate::rect::Rect;
pub use crate::span::Span;
pub use crate::transform::{Transform, Transformation};
