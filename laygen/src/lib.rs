//! Memoized parametric layout templates with track-based routing.
//!
//! A [`Template`] draws geometry into a [`TemplateBuilder`]. The
//! [`TemplateDb`] draws each distinct template/parameter pair once, gives it a
//! unique cell name, and writes finished hierarchies through a renderer.
//!
//! # Examples
//!
//! ```
//! use laygen::prelude::*;
//! use rust_decimal::Decimal;
//!
//! struct Strap;
//!
//! impl Template for Strap {
//!     fn params_info(&self) -> ParamsInfo {
//!         [("len".into(), "strap length".into())].into_iter().collect()
//!     }
//!
//!     fn draw_layout(&self, b: &mut TemplateBuilder) -> Result<()> {
//!         let len = b.params().get_int("len")?;
//!         let track = TrackId::single(1, Rational64::from_integer(0), 1);
//!         b.add_pin("vdd", &[WireArray::new(track, 0, len)], PinOpts::default())
//!     }
//! }
//!
//! let grid = RoutingGrid::new(
//!     Decimal::new(1, 3),
//!     [RoutingLayer { id: 1, name: "M1".into(), dir: Dir::Horiz, width: 50, space: 50 }],
//!     [],
//! )
//! .unwrap();
//! let db = TemplateDb::builder().grid(grid).build().unwrap();
//! let a = db.new_template(Strap, Params::new().with("len", 400)).unwrap();
//! let b = db.new_template(Strap, Params::new().with("len", 400)).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(a.cell_name(), "Strap");
//! ```
#![warn(missing_docs)]

pub use test_log::test;

pub mod config;
pub mod coord;
pub mod db;
pub mod error;
pub mod grid;
pub mod layout;
pub mod params;
pub mod registry;
pub mod render;
pub mod template;
pub mod track;

#[doc(inline)]
pub use geometry;

/// Commonly used items.
pub mod prelude {
    pub use geometry::prelude::*;
    pub use num::rational::Rational64;

    pub use crate::config::{DbConfig, RenderBackend};
    pub use crate::coord::Coord;
    pub use crate::db::TemplateDb;
    pub use crate::error::{Error, Result};
    pub use crate::grid::{LayerId, RoutingGrid, RoutingLayer, TemplateSize, Via, ViaRule};
    pub use crate::params::{ParamValue, Params, ParamsInfo};
    pub use crate::registry::{TemplateId, TemplateRegistry};
    pub use crate::template::{
        ConnectToTracksOpts, ConnectWiresOpts, Instance, InstanceOpts, Master, PinOpts,
        ReexportOpts, Template, TemplateBuilder,
    };
    pub use crate::track::{FillType, Port, TrackId, WireArray};
}
