//! Routing tracks, wires on tracks, and ports.

use std::collections::BTreeMap;

use arcstr::ArcStr;
use geometry::prelude::*;
use num::rational::Rational64;
use num::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{LayerId, RoutingGrid};

/// A set of evenly spaced tracks on one routing layer.
///
/// Indices and pitch are measured in tracks and may be half-integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId {
    layer: LayerId,
    base_index: Rational64,
    width: u32,
    num: u32,
    pitch: Rational64,
}

impl TrackId {
    /// Creates a new track id.
    ///
    /// A negative `pitch` is normalized by starting from the last track.
    /// The pitch of a single track is always zero.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `num` is zero.
    pub fn new(layer: LayerId, base_index: Rational64, width: u32, num: u32, pitch: Rational64) -> Self {
        assert!(width > 0, "track width must be positive");
        assert!(num > 0, "number of tracks must be positive");
        let (base_index, pitch) = if num == 1 {
            (base_index, Rational64::zero())
        } else if pitch.is_negative() {
            (base_index + pitch * (num as i64 - 1), -pitch)
        } else {
            (base_index, pitch)
        };
        Self {
            layer,
            base_index,
            width,
            num,
            pitch,
        }
    }

    /// A single track of the given width.
    pub fn single(layer: LayerId, index: Rational64, width: u32) -> Self {
        Self::new(layer, index, width, 1, Rational64::zero())
    }

    /// The routing layer.
    #[inline]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// The index of the first track.
    #[inline]
    pub fn base_index(&self) -> Rational64 {
        self.base_index
    }

    /// The width of each track, in tracks.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The number of tracks.
    #[inline]
    pub fn num(&self) -> u32 {
        self.num
    }

    /// The spacing between adjacent tracks, in tracks.
    #[inline]
    pub fn pitch(&self) -> Rational64 {
        self.pitch
    }

    /// The index of the last track.
    pub fn last_index(&self) -> Rational64 {
        self.base_index + self.pitch * (self.num as i64 - 1)
    }

    /// Iterates over the index of every track.
    pub fn indices(&self) -> impl Iterator<Item = Rational64> + '_ {
        (0..self.num as i64).map(move |i| self.base_index + self.pitch * i)
    }

    /// The perpendicular extent covered by all tracks.
    pub fn bounds(&self, grid: &RoutingGrid) -> Result<Span> {
        let first = grid.wire_bounds(self.layer, self.base_index, self.width)?;
        let last = grid.wire_bounds(self.layer, self.last_index(), self.width)?;
        Ok(first.union(last))
    }

    /// Shifts every track by `offset` tracks.
    pub fn translate(&self, offset: Rational64) -> Self {
        Self {
            base_index: self.base_index + offset,
            ..*self
        }
    }
}

/// Wires drawn on every track of a [`TrackId`], spanning `[lower, upper]`
/// along the routing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WireArray {
    track: TrackId,
    lower: i64,
    upper: i64,
}

impl WireArray {
    /// Creates a wire array. The bounds may be given in either order.
    pub fn new(track: TrackId, lower: i64, upper: i64) -> Self {
        let span = Span::new(lower, upper);
        Self {
            track,
            lower: span.start(),
            upper: span.stop(),
        }
    }

    /// The tracks the wires are on.
    #[inline]
    pub fn track_id(&self) -> &TrackId {
        &self.track
    }

    /// The routing layer.
    #[inline]
    pub fn layer(&self) -> LayerId {
        self.track.layer
    }

    /// The start of the wires along the routing direction.
    #[inline]
    pub fn lower(&self) -> i64 {
        self.lower
    }

    /// The end of the wires along the routing direction.
    #[inline]
    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// The extent of the wires along the routing direction.
    pub fn span(&self) -> Span {
        Span::new(self.lower, self.upper)
    }

    /// The rectangles of the wires as a box array.
    pub fn bbox_array(&self, grid: &RoutingGrid) -> Result<BoxArray> {
        let layer = self.layer();
        let dir = grid.direction(layer)?;
        let perp = grid.wire_bounds(layer, self.track.base_index, self.track.width)?;
        let base = Rect::from_dir_spans(dir, self.span(), perp);
        let offset = grid.track_offset(layer, self.track.pitch)?;
        Ok(match dir {
            Dir::Horiz => BoxArray::new(base, 1, self.track.num, 0, offset),
            Dir::Vert => BoxArray::new(base, self.track.num, 1, offset, 0),
        })
    }

    /// The layer name and rectangles of the wires.
    pub fn wire_array(&self, grid: &RoutingGrid) -> Result<(ArcStr, BoxArray)> {
        Ok((grid.layer_name(self.layer())?, self.bbox_array(grid)?))
    }

    /// Every wire rectangle, one per track.
    pub fn wires(&self, grid: &RoutingGrid) -> Result<Vec<Rect>> {
        Ok(self.bbox_array(grid)?.iter().collect())
    }

    /// The bounding box of all wires.
    pub fn bbox(&self, grid: &RoutingGrid) -> Result<Rect> {
        Ok(self.bbox_array(grid)?.bbox())
    }

    /// Splits this array into one wire array per track.
    pub fn to_warr_list(&self) -> Vec<WireArray> {
        self.track
            .indices()
            .map(|idx| {
                WireArray::new(
                    TrackId::single(self.layer(), idx, self.track.width),
                    self.lower,
                    self.upper,
                )
            })
            .collect()
    }

    /// Moves the wires by `trans`.
    ///
    /// Orientations that exchange the x and y axes would move the wires
    /// off their routing direction and are rejected.
    pub fn transform(&self, grid: &RoutingGrid, trans: Transformation) -> Result<WireArray> {
        let orient = trans.orientation();
        if orient.swaps_axes() {
            return Err(Error::UnsupportedOrientation(orient));
        }
        let layer = self.layer();
        let dir = grid.direction(layer)?;
        let center = grid.track_to_coord(layer, self.track.base_index)?;

        let p0 = Point::from_dir_coords(dir, self.lower, center).transform(trans);
        let p1 = Point::from_dir_coords(dir, self.upper, center).transform(trans);
        let new_center = p0.coord(!dir);
        let base_index = grid.coord_to_track(layer, new_center)?;
        let flipped = orient.apply(Point::from_dir_coords(dir, 0, 1)).coord(!dir) < 0;
        let pitch = if flipped {
            -self.track.pitch
        } else {
            self.track.pitch
        };

        Ok(WireArray::new(
            TrackId::new(layer, base_index, self.track.width, self.track.num, pitch),
            p0.coord(dir),
            p1.coord(dir),
        ))
    }
}

/// The pins of one net, grouped by routing layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    net_name: ArcStr,
    pins: BTreeMap<LayerId, Vec<WireArray>>,
}

impl Port {
    /// Creates a port with no pins.
    pub fn new(net_name: impl Into<ArcStr>) -> Self {
        Self {
            net_name: net_name.into(),
            pins: BTreeMap::new(),
        }
    }

    /// The net this port belongs to.
    pub fn net_name(&self) -> &ArcStr {
        &self.net_name
    }

    /// Adds a pin.
    pub fn add_pin(&mut self, warr: WireArray) {
        self.pins.entry(warr.layer()).or_default().push(warr);
    }

    /// The layers this port has pins on, from bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.pins.keys().copied()
    }

    /// The pins on `layer`.
    pub fn pins(&self, layer: LayerId) -> &[WireArray] {
        self.pins.get(&layer).map(Vec::as_slice).unwrap_or_default()
    }

    /// The pins of a port with pins on exactly one layer.
    pub fn only_pins(&self) -> Result<&[WireArray]> {
        let mut layers = self.pins.values();
        match (layers.next(), layers.next()) {
            (Some(pins), None) => Ok(pins),
            _ => Err(Error::PortNotFound(format!(
                "port {} has pins on {} layers, expected exactly one",
                self.net_name,
                self.pins.len()
            ))),
        }
    }

    /// Iterates over every pin, bottom layer first.
    pub fn iter(&self) -> impl Iterator<Item = &WireArray> {
        self.pins.values().flatten()
    }

    /// Returns `true` if the port has no pins.
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// The bounding box of every pin.
    pub fn bbox(&self, grid: &RoutingGrid) -> Result<Option<Rect>> {
        let boxes = self
            .iter()
            .map(|warr| warr.bbox(grid))
            .collect::<Result<Vec<_>>>()?;
        Ok(Rect::union_all(boxes))
    }

    /// Moves every pin by `trans`.
    pub fn transform(&self, grid: &RoutingGrid, trans: Transformation) -> Result<Port> {
        let mut out = Port::new(self.net_name.clone());
        for warr in self.iter() {
            out.add_pin(warr.transform(grid, trans)?);
        }
        Ok(out)
    }
}

/// The supply net that fill connecting near a wire should tie to.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillType {
    /// Positive supply.
    Vdd,
    /// Ground.
    #[default]
    Vss,
}

/// A wire recorded as occupying routing space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedWire {
    /// The wire rectangle.
    pub rect: Rect,
    /// Minimum distance between the wire and fill.
    pub margin: i64,
    /// What nearby fill connects to.
    pub fill_type: FillType,
}

/// Wires drawn by a template, tracked per layer for later fill insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsedTracks {
    layers: BTreeMap<LayerId, Vec<UsedWire>>,
}

impl UsedTracks {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every wire of every array in `warrs`.
    pub fn add_wire_arrays<'a>(
        &mut self,
        grid: &RoutingGrid,
        warrs: impl IntoIterator<Item = &'a WireArray>,
        margin: i64,
        fill_type: FillType,
    ) -> Result<()> {
        for warr in warrs {
            let wires = self.layers.entry(warr.layer()).or_default();
            for rect in warr.bbox_array(grid)?.iter() {
                wires.push(UsedWire {
                    rect,
                    margin,
                    fill_type,
                });
            }
        }
        Ok(())
    }

    /// The wires recorded on `layer`.
    pub fn iter(&self, layer: LayerId) -> impl Iterator<Item = &UsedWire> {
        self.layers.get(&layer).into_iter().flatten()
    }

    /// Returns `true` if `rect` keeps the margin of every wire recorded on `layer`.
    pub fn is_free(&self, layer: LayerId, rect: Rect) -> bool {
        self.iter(layer).all(|wire| {
            let keepout = wire.rect.expand_all(wire.margin);
            !(keepout.hspan().overlaps(&rect.hspan()) && keepout.vspan().overlaps(&rect.vspan()))
        })
    }

    /// The total number of recorded wires.
    pub fn len(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    /// Returns `true` if no wires are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
