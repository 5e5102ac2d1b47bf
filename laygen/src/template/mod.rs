//! Parametrized layout templates.

use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::{IndexMap, IndexSet};

use crate::coord::Coord;
use crate::error::{Error, Result};
use crate::grid::{RoutingGrid, TemplateSize};
use crate::layout::{Layout, Placement};
use crate::params::{Params, ParamsInfo, TemplateKey};
use crate::track::{Port, UsedTracks, WireArray};

pub mod builder;
pub mod routing;

pub use builder::{PinOpts, ReexportOpts, TemplateBuilder};
pub use routing::{ConnectToTracksOpts, ConnectWiresOpts};

/// A parametrized unit of layout.
///
/// A template value identifies a template class; everything that changes the
/// drawn geometry must be passed as a parameter so that it takes part in the
/// template's identity.
pub trait Template: Send + Sync + 'static {
    /// Names and descriptions of the accepted parameters.
    fn params_info(&self) -> ParamsInfo;

    /// Default values for optional parameters.
    fn default_params(&self) -> Params {
        Params::new()
    }

    /// The fully qualified class name, used in the identity key.
    fn qualified_name(&self) -> ArcStr {
        ArcStr::from(std::any::type_name::<Self>())
    }

    /// The base of generated cell names.
    fn basename(&self) -> ArcStr {
        let qualified = self.qualified_name();
        let path = qualified.split('<').next().unwrap_or_default();
        ArcStr::from(path.rsplit("::").next().unwrap_or(path))
    }

    /// Returns `true` for primitive templates without routing structure.
    fn is_micro(&self) -> bool {
        false
    }

    /// Draws the layout.
    fn draw_layout(&self, builder: &mut TemplateBuilder) -> Result<()>;
}

/// A drawn, finalized template.
pub struct Master {
    pub(crate) key: TemplateKey,
    pub(crate) cell_name: ArcStr,
    pub(crate) params: Params,
    pub(crate) template: Arc<dyn Template>,
    pub(crate) grid: Arc<RoutingGrid>,
    pub(crate) size: Option<TemplateSize>,
    pub(crate) array_box: Option<Rect>,
    pub(crate) ports: IndexMap<ArcStr, Port>,
    pub(crate) layout: Layout,
    pub(crate) children: IndexSet<TemplateKey>,
    pub(crate) used_tracks: UsedTracks,
}

impl fmt::Debug for Master {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Master")
            .field("cell_name", &self.cell_name)
            .field("class", self.key.class())
            .field("size", &self.size)
            .field("ports", &self.ports.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Master {
    /// The identity key.
    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// The unique cell name.
    pub fn cell_name(&self) -> &ArcStr {
        &self.cell_name
    }

    /// The resolved parameters, with defaults filled in.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The template this master was drawn from.
    pub fn template(&self) -> &Arc<dyn Template> {
        &self.template
    }

    /// The routing grid the layout was drawn on.
    pub fn grid(&self) -> &Arc<RoutingGrid> {
        &self.grid
    }

    /// The size, if one was set.
    pub fn size(&self) -> Option<TemplateSize> {
        self.size
    }

    /// The array box, if one was set.
    pub fn array_box(&self) -> Option<Rect> {
        self.array_box
    }

    /// The bounding box implied by the size, anchored at the origin.
    pub fn bound_box(&self) -> Result<Option<Rect>> {
        bound_box(&self.grid, self.size)
    }

    /// The keys of all instantiated templates, in first-use order.
    pub fn children(&self) -> &IndexSet<TemplateKey> {
        &self.children
    }

    /// Returns the port `name`.
    ///
    /// If `name` is `None`, the template must have exactly one port.
    pub fn get_port(&self, name: Option<&str>) -> Result<&Port> {
        match name {
            Some(name) => self
                .ports
                .get(name)
                .ok_or_else(|| Error::PortNotFound(format!("{} has no port {name}", self.cell_name))),
            None if self.ports.len() == 1 => Ok(&self.ports[0]),
            None => Err(Error::PortNotFound(format!(
                "{} has {} ports, expected exactly one",
                self.cell_name,
                self.ports.len()
            ))),
        }
    }

    /// Every port, by net name.
    pub fn ports(&self) -> &IndexMap<ArcStr, Port> {
        &self.ports
    }

    /// Returns `true` if the template has the port `name`.
    pub fn has_port(&self, name: &str) -> bool {
        self.ports.contains_key(name)
    }

    /// The port names, in the order they were first added.
    pub fn port_names(&self) -> impl Iterator<Item = &ArcStr> {
        self.ports.keys()
    }

    /// Renames a pin through the `rename_dict` parameter.
    pub fn pin_name(&self, name: &str) -> ArcStr {
        self.params.pin_name(name)
    }

    /// Wires drawn by this template and its connection operations.
    pub fn used_tracks(&self) -> &UsedTracks {
        &self.used_tracks
    }

    /// Returns `true` for primitive templates.
    pub fn is_micro(&self) -> bool {
        self.template.is_micro()
    }

    /// The drawn geometry.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

pub(crate) fn bound_box(grid: &RoutingGrid, size: Option<TemplateSize>) -> Result<Option<Rect>> {
    size.map(|size| {
        let (w, h) = grid.size_dimension(size)?;
        Ok(Rect::from_sides(0, 0, w, h))
    })
    .transpose()
}

/// Options for placing an instance.
#[derive(Debug, Clone)]
pub struct InstanceOpts {
    /// The instance name. Unnamed or duplicate names are made unique.
    pub name: Option<ArcStr>,
    /// Location of the instance origin.
    pub loc: (Coord, Coord),
    /// Orientation of the instance.
    pub orient: Orientation,
    /// Number of columns.
    pub nx: u32,
    /// Number of rows.
    pub ny: u32,
    /// Column pitch.
    pub spx: Coord,
    /// Row pitch.
    pub spy: Coord,
}

impl Default for InstanceOpts {
    fn default() -> Self {
        Self {
            name: None,
            loc: (Coord::Units(0), Coord::Units(0)),
            orient: Orientation::R0,
            nx: 1,
            ny: 1,
            spx: Coord::Units(0),
            spy: Coord::Units(0),
        }
    }
}

impl InstanceOpts {
    pub(crate) fn placement(&self, grid: &RoutingGrid) -> Result<Placement> {
        assert!(self.nx > 0 && self.ny > 0, "instance array dimensions must be positive");
        Ok(Placement {
            loc: Point::new(grid.to_units(self.loc.0)?, grid.to_units(self.loc.1)?),
            orient: self.orient,
            nx: self.nx,
            ny: self.ny,
            spx: grid.to_units(self.spx)?,
            spy: grid.to_units(self.spy)?,
        })
    }
}

/// A handle to a template placed inside another template.
#[derive(Debug, Clone)]
pub struct Instance {
    name: ArcStr,
    master: Arc<Master>,
    placement: Placement,
    grid: Arc<RoutingGrid>,
}

impl Instance {
    pub(crate) fn new(
        name: ArcStr,
        master: Arc<Master>,
        placement: Placement,
        grid: Arc<RoutingGrid>,
    ) -> Self {
        Self {
            name,
            master,
            placement,
            grid,
        }
    }

    /// The instance name.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The placed master.
    pub fn master(&self) -> &Arc<Master> {
        &self.master
    }

    /// Where the instance is placed.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// The port `name` of the first array element, in parent coordinates.
    pub fn port(&self, name: Option<&str>) -> Result<Port> {
        self.port_at(name, 0, 0)
    }

    /// The port `name` of the array element in column `col` and row `row`.
    pub fn port_at(&self, name: Option<&str>, col: u32, row: u32) -> Result<Port> {
        if col >= self.placement.nx || row >= self.placement.ny {
            return Err(Error::PortNotFound(format!(
                "instance {} has no element ({col}, {row})",
                self.name
            )));
        }
        self.master
            .get_port(name)?
            .transform(&self.grid, self.placement.transformation(col, row))
    }

    /// The pins of port `name` across every array element.
    pub fn all_port_pins(&self, name: Option<&str>) -> Result<Vec<WireArray>> {
        let port = self.master.get_port(name)?;
        let mut out = Vec::new();
        for trans in self.placement.transformations() {
            out.extend(port.transform(&self.grid, trans)?.iter().copied());
        }
        Ok(out)
    }

    /// The bounding box of every array element, if the master has a size.
    pub fn bound_box(&self) -> Result<Option<Rect>> {
        let Some(bbox) = self.master.bound_box()? else {
            return Ok(None);
        };
        Ok(Rect::union_all(
            self.placement.transformations().map(|t| bbox.transform(t)),
        ))
    }
}
