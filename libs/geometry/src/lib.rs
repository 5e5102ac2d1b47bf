//! 2-D Manhattan geometry used by template-based layout generation.
//!
//! # Examples
//!
//! Create a [rectangle](crate::rect::Rect):
//!
//! ```
//! # use geometry::prelude::*;
//! let rect = Rect::from_sides(10, 20, 30, 40);
//! assert_eq!(rect.width(), 20);
//! ```
#![warn(missing_docs)]

pub mod array;
pub mod dir;
pub mod orientation;
pub mod point;
pub mod prelude;
pub mod rect;
pub mod span;
pub mod transform;
