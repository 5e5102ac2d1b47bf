//! The drawing state of a template.

use std::sync::Arc;

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexMap;

use super::{bound_box, Instance, InstanceOpts, Master, Template};
use crate::coord::Coord;
use crate::db::TemplateDb;
use crate::error::{Error, Result};
use crate::grid::{LayerId, RoutingGrid, TemplateSize, Via};
use crate::layout::{InstanceMaster, Layout, Path, Pin, Shape};
use crate::params::{Params, TemplateKey};
use crate::registry::TemplateId;
use crate::track::{FillType, Port, UsedTracks, WireArray};

/// Options for [`TemplateBuilder::add_pin`].
#[derive(Debug, Clone)]
pub struct PinOpts {
    /// The pin label. Defaults to the net name.
    pub label: Option<ArcStr>,
    /// Whether pin geometry is drawn. Hidden pins still form a port.
    pub show: bool,
}

impl Default for PinOpts {
    fn default() -> Self {
        Self {
            label: None,
            show: true,
        }
    }
}

/// Options for [`TemplateBuilder::reexport`].
#[derive(Debug, Clone)]
pub struct ReexportOpts {
    /// The new net name. Defaults to the net name of the port.
    pub net_name: Option<ArcStr>,
    /// Pin label and visibility.
    pub pin: PinOpts,
    /// Minimum distance between the exported wires and fill.
    pub fill_margin: Coord,
    /// What fill near the exported wires connects to.
    pub fill_type: FillType,
}

impl Default for ReexportOpts {
    fn default() -> Self {
        Self {
            net_name: None,
            pin: PinOpts::default(),
            fill_margin: Coord::Units(0),
            fill_type: FillType::default(),
        }
    }
}

#[derive(Debug)]
struct PortParams {
    label: ArcStr,
    show: bool,
    port: Port,
}

/// A template while it is being drawn.
///
/// Created by the database on a cache miss and handed to
/// [`Template::draw_layout`]. Once [`TemplateBuilder::finalize`] succeeds,
/// every mutator fails with [`Error::FinalizedMutation`].
pub struct TemplateBuilder {
    db: TemplateDb,
    template: Arc<dyn Template>,
    key: TemplateKey,
    cell_name: ArcStr,
    params: Params,
    grid: Arc<RoutingGrid>,
    size: Option<TemplateSize>,
    array_box: Option<Rect>,
    pub(crate) layout: Layout,
    port_params: IndexMap<ArcStr, PortParams>,
    pub(crate) used_tracks: UsedTracks,
    finalized: bool,
}

impl TemplateBuilder {
    pub(crate) fn new(
        db: TemplateDb,
        template: Arc<dyn Template>,
        key: TemplateKey,
        cell_name: ArcStr,
        params: Params,
        grid: Arc<RoutingGrid>,
    ) -> Self {
        Self {
            db,
            template,
            key,
            cell_name,
            params,
            grid,
            size: None,
            array_box: None,
            layout: Layout::new(),
            port_params: IndexMap::new(),
            used_tracks: UsedTracks::new(),
            finalized: false,
        }
    }

    pub(crate) fn check_mutable(&self) -> Result<()> {
        if self.finalized {
            Err(Error::FinalizedMutation(self.cell_name.clone()))
        } else {
            Ok(())
        }
    }

    /// The database this template belongs to.
    pub fn db(&self) -> &TemplateDb {
        &self.db
    }

    /// The resolved parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Renames a pin through the `rename_dict` parameter.
    pub fn pin_name(&self, name: &str) -> ArcStr {
        self.params.pin_name(name)
    }

    /// The routing grid.
    pub fn grid(&self) -> &Arc<RoutingGrid> {
        &self.grid
    }

    /// The identity key.
    pub fn key(&self) -> &TemplateKey {
        &self.key
    }

    /// The unique cell name.
    pub fn cell_name(&self) -> &ArcStr {
        &self.cell_name
    }

    /// The size, if set.
    pub fn size(&self) -> Option<TemplateSize> {
        self.size
    }

    /// The array box, if set.
    pub fn array_box(&self) -> Option<Rect> {
        self.array_box
    }

    /// The bounding box implied by the size.
    pub fn bound_box(&self) -> Result<Option<Rect>> {
        bound_box(&self.grid, self.size)
    }

    /// Returns `true` once [`TemplateBuilder::finalize`] has succeeded.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Wires recorded by connection operations so far.
    pub fn used_tracks(&self) -> &UsedTracks {
        &self.used_tracks
    }

    /// Sets the size.
    pub fn set_size(&mut self, size: impl Into<TemplateSize>) -> Result<()> {
        self.check_mutable()?;
        self.size = Some(size.into());
        Ok(())
    }

    /// Sets the array box, used for abutting arrayed instances.
    pub fn set_array_box(&mut self, array_box: Rect) -> Result<()> {
        self.check_mutable()?;
        self.array_box = Some(array_box);
        Ok(())
    }

    /// Replaces the routing grid.
    ///
    /// Geometry that was already drawn is not re-derived on the new grid.
    pub fn set_grid(&mut self, grid: impl Into<Arc<RoutingGrid>>) -> Result<()> {
        self.check_mutable()?;
        self.grid = grid.into();
        Ok(())
    }

    /// Computes the size from the array box, which is assumed to be
    /// centered in the template.
    pub fn set_size_from_array_box(&mut self, top_layer: LayerId) -> Result<()> {
        self.check_mutable()?;
        let array_box = self
            .array_box
            .ok_or_else(|| Error::InvalidSize("array box is not set".to_string()))?;
        let mut h_pitch = self.grid.block_pitch(top_layer)?;
        let mut w_pitch = if self.grid.has_layer(top_layer - 1) {
            self.grid.block_pitch(top_layer - 1)?
        } else {
            1
        };
        if self.grid.direction(top_layer)? == Dir::Vert {
            std::mem::swap(&mut h_pitch, &mut w_pitch);
        }

        let (dx, dy) = (array_box.left(), array_box.bot());
        if dx < 0 || dy < 0 {
            return Err(Error::InvalidSize(format!(
                "array box corner ({dx}, {dy}) is outside the first quadrant"
            )));
        }
        let w_blk = 2 * dx + array_box.width();
        let h_blk = 2 * dy + array_box.height();
        if w_blk % w_pitch != 0 {
            return Err(Error::InvalidSize(format!(
                "block width {w_blk} is not a multiple of block pitch {w_pitch}"
            )));
        }
        if h_blk % h_pitch != 0 {
            return Err(Error::InvalidSize(format!(
                "block height {h_blk} is not a multiple of block pitch {h_pitch}"
            )));
        }
        self.size = Some(TemplateSize {
            layer: top_layer,
            nx: w_blk / w_pitch,
            ny: h_blk / h_pitch,
        });
        Ok(())
    }

    /// Creates a child template on this template's grid.
    pub fn new_template<T: Template>(&self, template: T, params: Params) -> Result<Arc<Master>> {
        self.db
            .generate(Arc::new(template), params, self.grid.clone())
    }

    /// Creates a child template from the registry on this template's grid.
    pub fn new_template_by_id(&self, id: &TemplateId, params: Params) -> Result<Arc<Master>> {
        let template = self.db.registry().get(id)?;
        self.db.generate(template, params, self.grid.clone())
    }

    /// Creates a variant of `master` with some parameters replaced.
    ///
    /// Only parameters that `master` already has are overridden.
    pub fn new_template_with(&self, master: &Master, overrides: &Params) -> Result<Arc<Master>> {
        self.db.generate(
            master.template.clone(),
            master.params.updated(overrides),
            master.grid.clone(),
        )
    }

    /// Adds an arrayed rectangle on the named layer.
    pub fn add_rect(&mut self, layer: impl Into<ArcStr>, array: impl Into<BoxArray>) -> Result<()> {
        self.check_mutable()?;
        self.layout.add_rect(Shape {
            layer: layer.into(),
            array: array.into(),
        });
        Ok(())
    }

    /// Adds a path.
    pub fn add_path(
        &mut self,
        layer: impl Into<ArcStr>,
        width: impl Into<Coord>,
        points: Vec<Point>,
    ) -> Result<()> {
        self.check_mutable()?;
        let width = self.grid.to_units(width)?;
        self.layout.add_path(Path {
            layer: layer.into(),
            width,
            points,
        });
        Ok(())
    }

    /// Adds a via array between `bot_layer` and the layer above it.
    ///
    /// `bbox` is the overlap of the two metals; the bottom metal is extended
    /// along `bot_dir`.
    pub fn add_via(
        &mut self,
        bbox: Rect,
        bot_layer: LayerId,
        bot_dir: Dir,
        array: (u32, u32, i64, i64),
    ) -> Result<Via> {
        self.check_mutable()?;
        let via = Via::new(&self.grid, bbox, bot_layer, bot_dir, array)?;
        self.layout.add_via(via.clone());
        Ok(via)
    }

    /// Places an instance of `master`.
    ///
    /// # Panics
    ///
    /// Panics if `opts.nx` or `opts.ny` is zero.
    pub fn add_instance(&mut self, master: &Arc<Master>, opts: InstanceOpts) -> Result<Instance> {
        self.check_mutable()?;
        let placement = opts.placement(&self.grid)?;
        let name = self.layout.add_instance(
            opts.name.as_deref(),
            InstanceMaster::Template(master.key().clone()),
            placement,
        );
        Ok(Instance::new(name, master.clone(), placement, self.grid.clone()))
    }

    /// Places an instance of an external cell. Such instances survive flattening.
    ///
    /// # Panics
    ///
    /// Panics if `opts.nx` or `opts.ny` is zero.
    pub fn add_instance_primitive(
        &mut self,
        lib: impl Into<ArcStr>,
        cell: impl Into<ArcStr>,
        view: impl Into<ArcStr>,
        params: Option<Params>,
        opts: InstanceOpts,
    ) -> Result<ArcStr> {
        self.check_mutable()?;
        let placement = opts.placement(&self.grid)?;
        Ok(self.layout.add_instance(
            opts.name.as_deref(),
            InstanceMaster::Primitive {
                lib: lib.into(),
                cell: cell.into(),
                view: view.into(),
                params,
            },
            placement,
        ))
    }

    fn port_params(&mut self, net_name: &ArcStr, opts: &PinOpts) -> Result<&mut PortParams> {
        let label = opts.label.clone().unwrap_or_else(|| net_name.clone());
        let entry = self
            .port_params
            .entry(net_name.clone())
            .or_insert_with(|| PortParams {
                label: label.clone(),
                show: opts.show,
                port: Port::new(net_name.clone()),
            });
        if entry.label != label {
            return Err(Error::ConflictingPortSpec {
                net: net_name.clone(),
                reason: format!("label {} differs from earlier label {}", label, entry.label),
            });
        }
        if entry.show != opts.show {
            return Err(Error::ConflictingPortSpec {
                net: net_name.clone(),
                reason: format!("show = {} differs from earlier show = {}", opts.show, entry.show),
            });
        }
        Ok(entry)
    }

    /// Adds wires as pins of the net `net_name`.
    ///
    /// Repeated calls for the same net accumulate into one port and must use
    /// the same label and visibility.
    pub fn add_pin(
        &mut self,
        net_name: impl Into<ArcStr>,
        warrs: &[WireArray],
        opts: PinOpts,
    ) -> Result<()> {
        self.check_mutable()?;
        let net_name = net_name.into();
        let entry = self.port_params(&net_name, &opts)?;
        for warr in warrs {
            entry.port.add_pin(*warr);
        }
        Ok(())
    }

    /// Exports every pin of `port` from this template.
    pub fn reexport(&mut self, port: &Port, opts: ReexportOpts) -> Result<()> {
        self.check_mutable()?;
        let net_name = opts.net_name.clone().unwrap_or_else(|| port.net_name().clone());
        let margin = self.grid.to_units(opts.fill_margin)?;
        let grid = self.grid.clone();
        self.used_tracks
            .add_wire_arrays(&grid, port.iter(), margin, opts.fill_type)?;
        let entry = self.port_params(&net_name, &opts.pin)?;
        for warr in port.iter() {
            entry.port.add_pin(*warr);
        }
        Ok(())
    }

    /// Adds a pin label that is never part of a port.
    pub fn add_pin_primitive(
        &mut self,
        net_name: impl Into<ArcStr>,
        layer: impl Into<ArcStr>,
        rect: Rect,
        label: Option<ArcStr>,
    ) -> Result<()> {
        self.check_mutable()?;
        let net = net_name.into();
        let config = self.db.config();
        self.layout.add_pin(Pin {
            label: label.unwrap_or_else(|| net.clone()),
            net,
            layer: layer.into(),
            purpose: config.pin_purpose.clone(),
            rect,
            make_rect: config.make_pin_rect,
        });
        Ok(())
    }

    /// Moves everything drawn so far by `(dx, dy)`.
    ///
    /// Pins added with [`TemplateBuilder::add_pin`] stay on their tracks.
    pub fn move_all_by(&mut self, dx: impl Into<Coord>, dy: impl Into<Coord>) -> Result<()> {
        self.check_mutable()?;
        let (dx, dy) = (self.grid.to_units(dx)?, self.grid.to_units(dy)?);
        self.layout.move_all_by(dx, dy);
        Ok(())
    }

    pub(crate) fn draw_rects(&mut self, layer: ArcStr, array: BoxArray) {
        self.layout.add_rect(Shape { layer, array });
    }

    pub(crate) fn draw_via(&mut self, via: Via) {
        self.layout.add_via(via);
    }

    /// Freezes the template, turning accumulated pins into ports.
    ///
    /// Visible ports also get pin geometry on every wire.
    pub fn finalize(&mut self) -> Result<Master> {
        self.check_mutable()?;
        let config = self.db.config();
        let mut ports = IndexMap::with_capacity(self.port_params.len());
        for (net_name, pp) in std::mem::take(&mut self.port_params) {
            if pp.show {
                for warr in pp.port.iter() {
                    let (layer, array) = warr.wire_array(&self.grid)?;
                    for rect in array.iter() {
                        self.layout.add_pin(Pin {
                            net: net_name.clone(),
                            label: pp.label.clone(),
                            layer: layer.clone(),
                            purpose: config.pin_purpose.clone(),
                            rect,
                            make_rect: config.make_pin_rect,
                        });
                    }
                }
            }
            ports.insert(net_name, pp.port);
        }

        self.finalized = true;
        let layout = std::mem::take(&mut self.layout);
        Ok(Master {
            key: self.key.clone(),
            cell_name: self.cell_name.clone(),
            params: self.params.clone(),
            template: self.template.clone(),
            grid: self.grid.clone(),
            size: self.size,
            array_box: self.array_box,
            ports,
            children: layout.children(),
            layout,
            used_tracks: std::mem::take(&mut self.used_tracks),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use num::rational::Rational64;

    use super::*;
    use crate::db::tests::{test_db, Inv};
    use crate::track::TrackId;

    /// A builder that is not registered with the database, for exercising
    /// drawing operations directly.
    pub(crate) fn test_builder() -> TemplateBuilder {
        let db = test_db();
        let params = Params::new().with("nf", 1);
        let key = TemplateKey::new("laygen::scratch", &params).unwrap();
        let grid = db.grid().clone();
        TemplateBuilder::new(db, Arc::new(Inv), key, "scratch".into(), params, grid)
    }

    fn m1_wire(index: i64) -> WireArray {
        WireArray::new(TrackId::single(1, Rational64::from_integer(index), 1), 0, 300)
    }

    #[crate::test]
    fn finalize_freezes_the_builder() {
        let mut b = test_builder();
        b.set_size((2, 1, 1)).unwrap();
        b.set_array_box(Rect::from_sides(0, 0, 10, 10)).unwrap();
        b.set_size((2, 3, 3)).unwrap();

        let master = b.finalize().unwrap();
        assert_eq!(master.size(), Some(TemplateSize { layer: 2, nx: 3, ny: 3 }));
        assert!(b.is_finalized());

        assert!(matches!(b.set_size((2, 1, 1)), Err(Error::FinalizedMutation(_))));
        assert!(matches!(
            b.set_array_box(Rect::from_sides(0, 0, 1, 1)),
            Err(Error::FinalizedMutation(_))
        ));
        let grid = b.grid().clone();
        assert!(matches!(b.set_grid(grid), Err(Error::FinalizedMutation(_))));
        assert!(matches!(
            b.add_rect("M1", Rect::from_sides(0, 0, 1, 1)),
            Err(Error::FinalizedMutation(_))
        ));
        assert!(matches!(b.finalize(), Err(Error::FinalizedMutation(_))));
    }

    #[crate::test]
    fn size_from_centered_array_box() {
        let mut b = test_builder();
        b.set_array_box(Rect::from_sides(60, 50, 300, 250)).unwrap();
        b.set_size_from_array_box(2).unwrap();
        assert_eq!(b.size(), Some(TemplateSize { layer: 2, nx: 3, ny: 3 }));
        assert_eq!(b.bound_box().unwrap(), Some(Rect::from_sides(0, 0, 360, 300)));

        let mut b = test_builder();
        b.set_array_box(Rect::from_sides(10, 0, 100, 100)).unwrap();
        assert!(matches!(b.set_size_from_array_box(2), Err(Error::InvalidSize(_))));

        let mut b = test_builder();
        b.set_array_box(Rect::from_sides(-60, 0, 60, 100)).unwrap();
        assert!(matches!(b.set_size_from_array_box(2), Err(Error::InvalidSize(_))));
    }

    #[crate::test]
    fn pins_accumulate_per_net() {
        let mut b = test_builder();
        b.add_pin("vdd", &[m1_wire(0)], PinOpts::default()).unwrap();
        b.add_pin("vdd", &[m1_wire(4)], PinOpts::default()).unwrap();
        let hidden = PinOpts {
            show: false,
            ..Default::default()
        };
        b.add_pin("bias", &[m1_wire(2)], hidden.clone()).unwrap();
        let err = b
            .add_pin(
                "vdd",
                &[m1_wire(6)],
                PinOpts {
                    label: Some("vdd!".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingPortSpec { .. }));

        let master = b.finalize().unwrap();
        assert_eq!(master.get_port(Some("vdd")).unwrap().pins(1).len(), 2);
        assert_eq!(master.get_port(Some("bias")).unwrap().pins(1).len(), 1);
        assert!(matches!(master.get_port(None), Err(Error::PortNotFound(_))));
        // Only the visible net gets pin geometry.
        assert_eq!(master.layout().pins().len(), 2);
        assert!(master.layout().pins().iter().all(|p| p.net == "vdd" && p.purpose == "pin"));
        let names: Vec<_> = master.port_names().map(|n| n.as_str()).collect();
        assert_eq!(names, ["vdd", "bias"]);
    }

    #[crate::test]
    fn instances_and_primitives() {
        let mut b = test_builder();
        let inv = b.new_template(Inv, Params::new().with("nf", 2)).unwrap();
        let first = b.add_instance(&inv, InstanceOpts::default()).unwrap();
        let second = b
            .add_instance(
                &inv,
                InstanceOpts {
                    name: Some(first.name().clone()),
                    loc: (Coord::Units(0), Coord::Units(400)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(first.name(), "X0");
        assert_eq!(second.name(), "X0_1");

        // Moving up by four M1 pitches shifts the pin by four tracks.
        let port = second.port(Some("out")).unwrap();
        assert_eq!(port.pins(1)[0].track_id().base_index(), Rational64::from_integer(4));
        assert!(matches!(second.port_at(Some("out"), 1, 0), Err(Error::PortNotFound(_))));
        assert_eq!(
            second.bound_box().unwrap(),
            Some(Rect::from_sides(0, 400, 120, 500))
        );

        let name = b
            .add_instance_primitive("prims", "cap", "layout", None, InstanceOpts::default())
            .unwrap();
        assert_eq!(name, "X2");
        let master = b.finalize().unwrap();
        assert_eq!(master.children().len(), 1);
        assert_eq!(master.layout().instances().len(), 3);
    }

    #[crate::test]
    fn new_template_with_overrides_known_keys() {
        let b = test_builder();
        let inv = b.new_template(Inv, Params::new().with("nf", 2)).unwrap();
        let wider = b
            .new_template_with(&inv, &Params::new().with("nf", 3).with("unknown", 1))
            .unwrap();
        assert_eq!(wider.params().get_int("nf").unwrap(), 3);
        assert!(!wider.params().contains("unknown"));
        let same = b.new_template_with(&inv, &Params::new()).unwrap();
        assert!(Arc::ptr_eq(&inv, &same));
    }

    #[crate::test]
    fn vias_paths_and_moves() {
        let mut b = test_builder();
        let via = b
            .add_via(Rect::from_sides(0, 0, 60, 50), 1, Dir::Horiz, (1, 1, 0, 0))
            .unwrap();
        assert_eq!(via.bottom_box(), Rect::from_sides(-10, 0, 70, 50));
        b.add_path("M2", Coord::Units(60), vec![Point::new(0, 0), Point::new(0, 500)])
            .unwrap();
        b.add_pin_primitive("clk", "M1", Rect::from_sides(0, 0, 10, 10), None)
            .unwrap();
        b.move_all_by(Coord::Units(100), Coord::Units(0)).unwrap();

        let master = b.finalize().unwrap();
        let layout = master.layout();
        assert_eq!(layout.vias()[0].bbox(), Rect::from_sides(100, 0, 160, 50));
        assert_eq!(layout.paths()[0].points[0], Point::new(100, 0));
        assert_eq!(layout.pins()[0].rect, Rect::from_sides(100, 0, 110, 10));
        assert_eq!(layout.pins()[0].label, "clk");
        assert!(master.ports.is_empty());
    }

    #[crate::test]
    fn reexport_records_used_tracks() {
        let mut b = test_builder();
        let mut port = Port::new("in");
        port.add_pin(m1_wire(1));
        port.add_pin(m1_wire(3));
        b.reexport(
            &port,
            ReexportOpts {
                fill_margin: Coord::Units(20),
                fill_type: FillType::Vdd,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(b.used_tracks().len(), 2);
        assert!(b.used_tracks().iter(1).all(|w| w.margin == 20 && w.fill_type == FillType::Vdd));
        let master = b.finalize().unwrap();
        assert_eq!(master.get_port(None).unwrap().net_name(), "in");
    }
}
