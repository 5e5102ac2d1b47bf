//! The routing grid: layer directions, track pitches, and via rules.
//!
//! Tracks on a layer are numbered so that track `i` is centered at
//! `(i + 1/2) * pitch`, where `pitch = width + space`. Half-integer indices
//! address the positions halfway between two tracks. A wire `n` tracks wide
//! spans `n * pitch - space`.

use std::collections::{BTreeMap, HashMap};

use arcstr::ArcStr;
use geometry::dir::Dir;
use geometry::span::Span;
use num::integer::lcm;
use num::rational::Rational64;
use num::Zero;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::error::{Error, Result};

pub mod via;

pub use via::{Via, ViaRule};

/// A routing layer identifier. Adjacent routing layers have consecutive ids.
pub type LayerId = i32;

/// One routing layer of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingLayer {
    /// The layer id.
    pub id: LayerId,
    /// The layer name used in emitted geometry.
    pub name: ArcStr,
    /// The direction tracks run in.
    pub dir: Dir,
    /// Width of a single-track wire, in resolution units.
    pub width: i64,
    /// Spacing between adjacent single-track wires, in resolution units.
    pub space: i64,
}

impl RoutingLayer {
    /// The track pitch, in resolution units.
    #[inline]
    pub fn pitch(&self) -> i64 {
        self.width + self.space
    }
}

/// The size of a template: a top routing layer plus a count of blocks in x and y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateSize {
    /// The top routing layer the block size is derived from.
    pub layer: LayerId,
    /// Number of blocks in x.
    pub nx: i64,
    /// Number of blocks in y.
    pub ny: i64,
}

impl From<(LayerId, i64, i64)> for TemplateSize {
    fn from((layer, nx, ny): (LayerId, i64, i64)) -> Self {
        Self { layer, nx, ny }
    }
}

/// A manufacturing grid of routing tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingGrid {
    resolution: Decimal,
    layers: BTreeMap<LayerId, RoutingLayer>,
    vias: BTreeMap<LayerId, ViaRule>,
    names: HashMap<ArcStr, LayerId>,
}

fn rational_to_int(value: Rational64, what: impl FnOnce() -> String) -> Result<i64> {
    if value.is_integer() {
        Ok(value.to_integer())
    } else {
        Err(Error::OffGrid(what()))
    }
}

impl RoutingGrid {
    /// Creates a routing grid.
    ///
    /// Wire widths and spaces must be positive and even so that track
    /// centers and half-track positions land on integer coordinates.
    pub fn new(
        resolution: Decimal,
        layers: impl IntoIterator<Item = RoutingLayer>,
        vias: impl IntoIterator<Item = ViaRule>,
    ) -> Result<Self> {
        if resolution <= Decimal::ZERO {
            return Err(Error::InvalidGrid(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        let mut grid = Self {
            resolution,
            layers: BTreeMap::new(),
            vias: BTreeMap::new(),
            names: HashMap::new(),
        };
        for layer in layers {
            if layer.width <= 0 || layer.space <= 0 || layer.width % 2 != 0 || layer.space % 2 != 0
            {
                return Err(Error::InvalidGrid(format!(
                    "layer {} needs positive, even width and space (got {} and {})",
                    layer.name, layer.width, layer.space
                )));
            }
            if grid.names.insert(layer.name.clone(), layer.id).is_some()
                || grid.layers.contains_key(&layer.id)
            {
                return Err(Error::InvalidGrid(format!(
                    "layer {} ({}) defined twice",
                    layer.name, layer.id
                )));
            }
            grid.layers.insert(layer.id, layer);
        }
        for rule in vias {
            for id in [rule.bot_layer, rule.bot_layer + 1] {
                grid.layer(id)?;
            }
            grid.vias.insert(rule.bot_layer, rule);
        }
        Ok(grid)
    }

    /// The physical size of one resolution unit.
    #[inline]
    pub fn resolution(&self) -> Decimal {
        self.resolution
    }

    /// Converts a coordinate to resolution units.
    #[inline]
    pub fn to_units(&self, coord: impl Into<Coord>) -> Result<i64> {
        coord.into().to_units(self.resolution)
    }

    /// Converts resolution units to physical units.
    #[inline]
    pub fn to_phys(&self, units: i64) -> Decimal {
        Decimal::from(units) * self.resolution
    }

    /// Returns the routing layer with the given id.
    pub fn layer(&self, id: LayerId) -> Result<&RoutingLayer> {
        self.layers
            .get(&id)
            .ok_or_else(|| Error::LayerNotFound(id.to_string()))
    }

    /// Returns `true` if the grid has a layer with the given id.
    pub fn has_layer(&self, id: LayerId) -> bool {
        self.layers.contains_key(&id)
    }

    /// Iterates over all layers from bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = &RoutingLayer> {
        self.layers.values()
    }

    /// Looks up a layer id by name.
    pub fn layer_id(&self, name: &str) -> Result<LayerId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| Error::LayerNotFound(name.to_string()))
    }

    /// The name of a layer.
    pub fn layer_name(&self, id: LayerId) -> Result<ArcStr> {
        Ok(self.layer(id)?.name.clone())
    }

    /// The direction tracks run in on a layer.
    pub fn direction(&self, id: LayerId) -> Result<Dir> {
        Ok(self.layer(id)?.dir)
    }

    /// The track pitch of a layer, in resolution units.
    pub fn track_pitch(&self, id: LayerId) -> Result<i64> {
        Ok(self.layer(id)?.pitch())
    }

    /// The physical width of a wire `ntr` tracks wide.
    pub fn track_width(&self, id: LayerId, ntr: u32) -> Result<i64> {
        let layer = self.layer(id)?;
        Ok(ntr as i64 * layer.pitch() - layer.space)
    }

    /// The via rule between `bot_layer` and the layer above it.
    pub fn via_rule(&self, bot_layer: LayerId) -> Result<&ViaRule> {
        self.vias
            .get(&bot_layer)
            .ok_or_else(|| Error::LayerNotFound(format!("via above layer {bot_layer}")))
    }

    /// The center coordinate of track `index`.
    pub fn track_to_coord(&self, id: LayerId, index: Rational64) -> Result<i64> {
        let pitch = self.track_pitch(id)?;
        let center = (index + Rational64::new(1, 2)) * pitch;
        rational_to_int(center, || format!("track {index} on layer {id}"))
    }

    /// The track index centered at `coord`.
    ///
    /// Fails unless `coord` is a track center or halfway between two tracks.
    pub fn coord_to_track(&self, id: LayerId, coord: i64) -> Result<Rational64> {
        let pitch = self.track_pitch(id)?;
        let index = Rational64::new(2 * coord - pitch, 2 * pitch);
        rational_to_int(index * 2, || {
            format!("coordinate {coord} is not on a half track of layer {id}")
        })?;
        Ok(index)
    }

    /// The perpendicular extent of a wire `width` tracks wide centered on track `index`.
    pub fn wire_bounds(&self, id: LayerId, index: Rational64, width: u32) -> Result<Span> {
        let center = self.track_to_coord(id, index)?;
        let length = self.track_width(id, width)?;
        Ok(Span::from_center_span(center, length))
    }

    /// Converts the perpendicular extent of a wire to its track index and width.
    pub fn interval_to_track(&self, id: LayerId, span: Span) -> Result<(Rational64, u32)> {
        let layer = self.layer(id)?;
        let pitch = layer.pitch();
        let total = span.length() + layer.space;
        let off_grid = || Error::OffGrid(format!("interval {span:?} on layer {id}"));
        if total <= 0 || total % pitch != 0 || (span.start() + span.stop()) % 2 != 0 {
            return Err(off_grid());
        }
        let width = u32::try_from(total / pitch).map_err(|_| off_grid())?;
        let index = self.coord_to_track(id, span.center())?;
        Ok((index, width))
    }

    /// The block pitch of a layer: the least common multiple of the track
    /// pitches of every layer at or below it running in the same direction.
    pub fn block_pitch(&self, id: LayerId) -> Result<i64> {
        let dir = self.direction(id)?;
        Ok(self
            .layers
            .range(..=id)
            .map(|(_, layer)| layer)
            .filter(|layer| layer.dir == dir)
            .fold(1, |acc, layer| lcm(acc, layer.pitch())))
    }

    /// The `(width, height)` of one placement block whose top routing layer is `id`.
    ///
    /// The pitch of the layer below constrains the other axis; if there is no
    /// layer below, that axis is unconstrained.
    pub fn block_size(&self, id: LayerId) -> Result<(i64, i64)> {
        let own = self.block_pitch(id)?;
        let below = if self.has_layer(id - 1) {
            self.block_pitch(id - 1)?
        } else {
            1
        };
        Ok(match self.direction(id)? {
            Dir::Horiz => (below, own),
            Dir::Vert => (own, below),
        })
    }

    /// The `(width, height)` of a template of the given size.
    pub fn size_dimension(&self, size: TemplateSize) -> Result<(i64, i64)> {
        let (w, h) = self.block_size(size.layer)?;
        Ok((w * size.nx, h * size.ny))
    }

    /// Converts a spacing given in tracks into resolution units.
    pub fn track_offset(&self, id: LayerId, tracks: Rational64) -> Result<i64> {
        if tracks.is_zero() {
            return Ok(0);
        }
        let pitch = self.track_pitch(id)?;
        rational_to_int(tracks * pitch, || {
            format!("{tracks} tracks on layer {id} is not a whole number of units")
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    /// A four-layer grid alternating horizontal and vertical layers.
    ///
    /// Layer 1 is horizontal with pitch 100, layer 2 vertical with pitch 120,
    /// layer 3 horizontal with pitch 200 and layer 4 vertical with pitch 160.
    pub(crate) fn test_grid() -> RoutingGrid {
        let layer = |id, name: &str, dir, width, space| RoutingLayer {
            id,
            name: name.into(),
            dir,
            width,
            space,
        };
        let via = |bot_layer, enc| ViaRule {
            bot_layer,
            cut_width: 20,
            cut_space: 20,
            bot_enc: enc,
            top_enc: enc,
        };
        RoutingGrid::new(
            dec!(0.001),
            [
                layer(1, "M1", Dir::Horiz, 50, 50),
                layer(2, "M2", Dir::Vert, 60, 60),
                layer(3, "M3", Dir::Horiz, 100, 100),
                layer(4, "M4", Dir::Vert, 80, 80),
            ],
            [via(1, 10), via(2, 20), via(3, 30)],
        )
        .unwrap()
    }

    #[crate::test]
    fn track_centers_and_wire_bounds() {
        let grid = test_grid();
        assert_eq!(grid.track_to_coord(1, Rational64::from_integer(0)).unwrap(), 50);
        assert_eq!(grid.track_to_coord(1, Rational64::new(1, 2)).unwrap(), 100);
        assert_eq!(grid.wire_bounds(1, Rational64::from_integer(2), 1).unwrap(), Span::new(225, 275));
        assert_eq!(grid.wire_bounds(1, Rational64::from_integer(2), 2).unwrap(), Span::new(175, 325));
        assert_eq!(grid.track_width(3, 3).unwrap(), 500);
    }

    #[crate::test]
    fn coordinate_to_track_round_trip() {
        let grid = test_grid();
        assert_eq!(grid.coord_to_track(2, 180).unwrap(), Rational64::from_integer(1));
        assert_eq!(grid.coord_to_track(2, 120).unwrap(), Rational64::new(1, 2));
        assert!(matches!(grid.coord_to_track(2, 100), Err(Error::OffGrid(_))));
    }

    #[crate::test]
    fn interval_to_track_finds_index_and_width() {
        let grid = test_grid();
        assert_eq!(
            grid.interval_to_track(1, Span::new(225, 275)).unwrap(),
            (Rational64::from_integer(2), 1)
        );
        assert_eq!(
            grid.interval_to_track(1, Span::new(125, 275)).unwrap(),
            (Rational64::new(3, 2), 2)
        );
        assert!(matches!(
            grid.interval_to_track(1, Span::new(225, 285)),
            Err(Error::OffGrid(_))
        ));
    }

    #[crate::test]
    fn block_pitch_is_lcm_of_same_direction_layers() {
        let grid = test_grid();
        assert_eq!(grid.block_pitch(1).unwrap(), 100);
        assert_eq!(grid.block_pitch(3).unwrap(), 200);
        assert_eq!(grid.block_pitch(4).unwrap(), 480);
        assert_eq!(grid.block_size(3).unwrap(), (120, 200));
        assert_eq!(grid.block_size(4).unwrap(), (480, 200));
        assert_eq!(
            grid.size_dimension(TemplateSize { layer: 4, nx: 2, ny: 3 }).unwrap(),
            (960, 600)
        );
    }

    #[crate::test]
    fn odd_widths_are_rejected() {
        let err = RoutingGrid::new(
            dec!(0.001),
            [RoutingLayer {
                id: 1,
                name: "M1".into(),
                dir: Dir::Horiz,
                width: 45,
                space: 50,
            }],
            [],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(_)));
    }
}
