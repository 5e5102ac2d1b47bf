//! Connecting wires to each other and to routing tracks.

use geometry::prelude::*;
use intervals::IntervalSet;
use num::rational::Rational64;
use num::Zero;

use super::TemplateBuilder;
use crate::coord::{opt_units, Coord};
use crate::error::{Error, Result};
use crate::grid::{LayerId, Via};
use crate::track::{FillType, TrackId, WireArray};

/// Options for [`TemplateBuilder::connect_wires`].
#[derive(Debug, Clone)]
pub struct ConnectWiresOpts {
    /// Extend every wire down to this coordinate.
    pub lower: Option<Coord>,
    /// Extend every wire up to this coordinate.
    pub upper: Option<Coord>,
    /// Minimum distance between the new wires and fill.
    pub fill_margin: Coord,
    /// What fill near the new wires connects to.
    pub fill_type: FillType,
}

impl Default for ConnectWiresOpts {
    fn default() -> Self {
        Self {
            lower: None,
            upper: None,
            fill_margin: Coord::Units(0),
            fill_type: FillType::default(),
        }
    }
}

/// Options for the operations that connect wires to tracks.
#[derive(Debug, Clone)]
pub struct ConnectToTracksOpts {
    /// Extend the connected wires down to this coordinate.
    pub wire_lower: Option<Coord>,
    /// Extend the connected wires up to this coordinate.
    pub wire_upper: Option<Coord>,
    /// Extend the tracks down to this coordinate.
    pub track_lower: Option<Coord>,
    /// Extend the tracks up to this coordinate.
    pub track_upper: Option<Coord>,
    /// Minimum distance between the new wires and fill.
    pub fill_margin: Coord,
    /// What fill near the new wires connects to.
    pub fill_type: FillType,
}

impl Default for ConnectToTracksOpts {
    fn default() -> Self {
        Self {
            wire_lower: None,
            wire_upper: None,
            track_lower: None,
            track_upper: None,
            fill_margin: Coord::Units(0),
            fill_type: FillType::default(),
        }
    }
}

/// Option fields of [`ConnectToTracksOpts`] converted to resolution units.
struct TrackUnits {
    wire_lower: Option<i64>,
    wire_upper: Option<i64>,
    track_lower: Option<i64>,
    track_upper: Option<i64>,
    margin: i64,
    fill_type: FillType,
}

/// A run of equally long, equally wide wires at a constant pitch.
struct Run {
    first: Span,
    range: Span,
    count: u32,
    pitch: i64,
    last: i64,
}

impl Run {
    fn new(intv: Span, range: Span) -> Self {
        Self {
            first: intv,
            range,
            count: 1,
            pitch: 0,
            last: intv.start(),
        }
    }

    fn accepts(&self, intv: Span, range: Span) -> bool {
        self.range == range
            && self.first.length() == intv.length()
            && (self.count == 1 || intv.start() - self.last == self.pitch)
    }

    fn push(&mut self, intv: Span) {
        if self.count == 1 {
            self.pitch = intv.start() - self.last;
        }
        self.count += 1;
        self.last = intv.start();
    }
}

impl TemplateBuilder {
    fn track_units(&self, opts: &ConnectToTracksOpts) -> Result<TrackUnits> {
        let res = self.grid().resolution();
        Ok(TrackUnits {
            wire_lower: opt_units(opts.wire_lower, res)?,
            wire_upper: opt_units(opts.wire_upper, res)?,
            track_lower: opt_units(opts.track_lower, res)?,
            track_upper: opt_units(opts.track_upper, res)?,
            margin: opts.fill_margin.to_units(res)?,
            fill_type: opts.fill_type,
        })
    }

    fn draw_wire_array(&mut self, warr: &WireArray) -> Result<()> {
        let (layer, array) = warr.wire_array(self.grid())?;
        self.draw_rects(layer, array);
        Ok(())
    }

    /// Merges wires on one layer into as few wire arrays as possible and draws them.
    ///
    /// Wires on the same track are merged into one wire covering all of
    /// them. Tracks with equal extent and width at a constant pitch become
    /// one arrayed wire. Wires whose footprints overlap without being on the
    /// same track are rejected with [`Error::OverlappingWires`].
    ///
    /// Returns an empty list if `warrs` is empty.
    pub fn connect_wires(
        &mut self,
        warrs: &[WireArray],
        opts: ConnectWiresOpts,
    ) -> Result<Vec<WireArray>> {
        self.check_mutable()?;
        let res = self.grid().resolution();
        let lower = opt_units(opts.lower, res)?;
        let upper = opt_units(opts.upper, res)?;
        let margin = opts.fill_margin.to_units(res)?;
        self.connect_wires_units(warrs, lower, upper, margin, opts.fill_type)
    }

    fn connect_wires_units(
        &mut self,
        warrs: &[WireArray],
        lower: Option<i64>,
        upper: Option<i64>,
        margin: i64,
        fill_type: FillType,
    ) -> Result<Vec<WireArray>> {
        let Some(first) = warrs.first() else {
            return Ok(Vec::new());
        };
        let grid = self.grid().clone();
        let layer = first.layer();
        let perp = !grid.direction(layer)?;
        let track_pitch = grid.track_pitch(layer)?;

        let mut intervals: IntervalSet<Span> = IntervalSet::new();
        for warr in warrs {
            if warr.layer() != layer {
                return Err(Error::LayerMismatch {
                    target: layer,
                    found: warr.layer(),
                });
            }
            let mut range = warr.span();
            if let Some(lower) = lower {
                range = range.add_point(lower);
            }
            if let Some(upper) = upper {
                range = range.add_point(upper);
            }
            for rect in warr.bbox_array(&grid)?.iter() {
                let intv = rect.span(perp);
                if let Some(old) = intervals.get_mut(&intv) {
                    *old = old.union(range);
                } else if !intervals.add(intv, range) {
                    return Err(Error::OverlappingWires { layer, span: intv });
                }
            }
        }

        let mut runs: Vec<Run> = Vec::new();
        for (intv, range) in intervals.iter() {
            tracing::trace!(layer, ?intv, ?range, "merged wire interval");
            match runs.last_mut() {
                Some(run) if run.accepts(intv, *range) => run.push(intv),
                _ => runs.push(Run::new(intv, *range)),
            }
        }

        let mut out = Vec::with_capacity(runs.len());
        for run in runs {
            let (index, width) = grid.interval_to_track(layer, run.first)?;
            let pitch = Rational64::new(run.pitch, track_pitch);
            let track = TrackId::new(layer, index, width, run.count, pitch);
            let warr = WireArray::new(track, run.range.start(), run.range.stop());
            self.draw_wire_array(&warr)?;
            out.push(warr);
        }
        self.used_tracks
            .add_wire_arrays(&grid, &out, margin, fill_type)?;
        Ok(out)
    }

    /// Draws vias where the wires in `box_arr` on `w_layer` cross the tracks of `track`.
    ///
    /// Returns the range `[lower, upper]` along the tracks that reaches every
    /// via, widened to include the given running bounds.
    pub fn draw_via_on_track(
        &mut self,
        w_layer: LayerId,
        box_arr: BoxArray,
        track: &TrackId,
        lower: Option<i64>,
        upper: Option<i64>,
    ) -> Result<(i64, i64)> {
        self.check_mutable()?;
        let grid = self.grid().clone();
        let tr_layer = track.layer();
        let tr_dir = grid.direction(tr_layer)?;
        let (bot_layer, bot_dir) = if w_layer > tr_layer {
            (tr_layer, tr_dir)
        } else {
            (w_layer, !tr_dir)
        };

        let wbase = box_arr.base();
        let band = grid.wire_bounds(tr_layer, track.base_index(), track.width())?;
        let track_sp = grid.track_offset(tr_layer, track.pitch())?;
        let (via_box, array) = match tr_dir {
            Dir::Horiz => (
                Rect::from_spans(wbase.hspan(), band),
                (box_arr.nx(), track.num(), box_arr.spx(), track_sp),
            ),
            Dir::Vert => (
                Rect::from_spans(band, wbase.vspan()),
                (track.num(), box_arr.ny(), track_sp, box_arr.spy()),
            ),
        };
        let via = Via::new(&grid, via_box, bot_layer, bot_dir, array)?;
        let track_side = if w_layer > tr_layer {
            via.bottom_box()
        } else {
            via.top_box()
        };
        let (nx, ny, spx, spy) = array;
        let reach = BoxArray::new(track_side, nx, ny, spx, spy).bbox().span(tr_dir);
        self.draw_via(via);

        Ok((
            lower.map_or(reach.start(), |l| l.min(reach.start())),
            upper.map_or(reach.stop(), |u| u.max(reach.stop())),
        ))
    }

    /// Connects wires on the layers directly above and below `track` to it.
    ///
    /// The wires on each side are merged and extended across the track, vias
    /// are dropped on every crossing, and the track is drawn long enough to
    /// reach all of them. Returns `None` if `warrs` is empty.
    pub fn connect_to_tracks(
        &mut self,
        warrs: &[WireArray],
        track: TrackId,
        opts: ConnectToTracksOpts,
    ) -> Result<Option<WireArray>> {
        self.check_mutable()?;
        if warrs.is_empty() {
            return Ok(None);
        }
        let units = self.track_units(&opts)?;
        let mut wire_span = track.bounds(self.grid())?;
        if let Some(l) = units.wire_lower {
            wire_span = wire_span.add_point(l);
        }
        if let Some(u) = units.wire_upper {
            wire_span = wire_span.add_point(u);
        }
        self.connect_to_tracks_units(warrs, track, wire_span, &units)
    }

    fn connect_to_tracks_units(
        &mut self,
        warrs: &[WireArray],
        track: TrackId,
        wire_span: Span,
        units: &TrackUnits,
    ) -> Result<Option<WireArray>> {
        let tr_layer = track.layer();
        let mut top = Vec::new();
        let mut bot = Vec::new();
        for warr in warrs {
            match warr.layer() {
                l if l == tr_layer + 1 => top.push(*warr),
                l if l == tr_layer - 1 => bot.push(*warr),
                l => {
                    return Err(Error::LayerMismatch {
                        target: tr_layer,
                        found: l,
                    })
                }
            }
        }

        let grid = self.grid().clone();
        let mut lower = units.track_lower;
        let mut upper = units.track_upper;
        let mut drew_via = false;
        for side in [top, bot] {
            let wires = self.connect_wires_units(
                &side,
                Some(wire_span.start()),
                Some(wire_span.stop()),
                units.margin,
                units.fill_type,
            )?;
            for warr in wires {
                let box_arr = warr.bbox_array(&grid)?;
                let (l, u) = self.draw_via_on_track(warr.layer(), box_arr, &track, lower, upper)?;
                lower = Some(l);
                upper = Some(u);
                drew_via = true;
            }
        }
        let (Some(lower), Some(upper), true) = (lower, upper, drew_via) else {
            return Ok(None);
        };

        let result = WireArray::new(track, lower, upper);
        self.draw_wire_array(&result)?;
        self.used_tracks
            .add_wire_arrays(&grid, [&result], units.margin, units.fill_type)?;
        Ok(Some(result))
    }

    /// Connects rectangles on `layer`, which must be adjacent to the layer of
    /// `track`, to the tracks of `track`.
    ///
    /// The rectangles are stretched across the tracks before vias are added.
    pub fn connect_bbox_to_tracks(
        &mut self,
        layer: LayerId,
        box_arr: impl Into<BoxArray>,
        track: TrackId,
        opts: ConnectToTracksOpts,
    ) -> Result<WireArray> {
        self.check_mutable()?;
        let tr_layer = track.layer();
        if layer != tr_layer + 1 && layer != tr_layer - 1 {
            return Err(Error::LayerMismatch {
                target: tr_layer,
                found: layer,
            });
        }
        let box_arr = box_arr.into();
        let units = self.track_units(&opts)?;
        let grid = self.grid().clone();

        let mut wire_span = track.bounds(&grid)?;
        for coord in [units.wire_lower, units.wire_upper].into_iter().flatten() {
            wire_span = wire_span.add_point(coord);
        }
        let perp = !grid.direction(tr_layer)?;
        let base = box_arr
            .base()
            .extend_to(perp, wire_span.start())
            .extend_to(perp, wire_span.stop());
        self.draw_rects(
            grid.layer_name(layer)?,
            BoxArray::new(base, box_arr.nx(), box_arr.ny(), box_arr.spx(), box_arr.spy()),
        );

        let (lower, upper) =
            self.draw_via_on_track(layer, box_arr, &track, units.track_lower, units.track_upper)?;
        let result = WireArray::new(track, lower, upper);
        self.draw_wire_array(&result)?;
        self.used_tracks
            .add_wire_arrays(&grid, [&result], units.margin, units.fill_type)?;
        Ok(result)
    }

    /// Connects a differential pair of wire groups to two tracks on `tr_layer`
    /// so that both connections are congruent.
    ///
    /// All wires must be on one layer adjacent to `tr_layer` and have the same
    /// width. Both connections use the same wire and track extents, which
    /// cover both tracks plus the via enclosures. `opts.wire_lower` and
    /// `opts.wire_upper` widen the wire extent further.
    #[allow(clippy::too_many_arguments)]
    pub fn connect_differential_tracks(
        &mut self,
        p_warrs: &[WireArray],
        n_warrs: &[WireArray],
        tr_layer: LayerId,
        p_index: Rational64,
        n_index: Rational64,
        width: u32,
        opts: ConnectToTracksOpts,
    ) -> Result<(Option<WireArray>, Option<WireArray>)> {
        self.check_mutable()?;
        let Some(first) = p_warrs.first() else {
            return Ok((None, None));
        };
        let units = self.track_units(&opts)?;
        let grid = self.grid().clone();

        let w_layer = first.layer();
        let w_ntr = first.track_id().width();
        if w_layer != tr_layer + 1 && w_layer != tr_layer - 1 {
            return Err(Error::LayerMismatch {
                target: tr_layer,
                found: w_layer,
            });
        }
        let mut tr_span = first.track_id().bounds(&grid)?;
        for warr in p_warrs.iter().chain(n_warrs) {
            if warr.layer() != w_layer {
                return Err(Error::LayerMismatch {
                    target: w_layer,
                    found: warr.layer(),
                });
            }
            if warr.track_id().width() != w_ntr {
                return Err(Error::WidthMismatch {
                    expected: w_ntr,
                    found: warr.track_id().width(),
                });
            }
            tr_span = tr_span.union(warr.track_id().bounds(&grid)?);
        }

        let pos = TrackId::single(tr_layer, p_index, width);
        let neg = TrackId::single(tr_layer, n_index, width);
        let pos_bounds = pos.bounds(&grid)?;
        let mut w_span = pos_bounds.union(neg.bounds(&grid)?);
        let tr_width = pos_bounds.length();
        let tr_dir = grid.direction(tr_layer)?;

        // Measure via enclosures on a via that is never drawn.
        let w_width = grid.wire_bounds(w_layer, Rational64::zero(), w_ntr)?.length();
        let via_box = match tr_dir {
            Dir::Horiz => Rect::from_sides(0, 0, w_width, tr_width),
            Dir::Vert => Rect::from_sides(0, 0, tr_width, w_width),
        };
        let (w_box, t_box) = if tr_layer > w_layer {
            let via = Via::new(&grid, via_box, w_layer, grid.direction(w_layer)?, (1, 1, 0, 0))?;
            (via.bottom_box(), via.top_box())
        } else {
            let via = Via::new(&grid, via_box, tr_layer, tr_dir, (1, 1, 0, 0))?;
            (via.top_box(), via.bottom_box())
        };
        let (t_ext, w_ext) = match tr_dir {
            Dir::Horiz => (
                (t_box.width() - w_width) / 2,
                (w_box.height() - tr_width) / 2,
            ),
            Dir::Vert => (
                (t_box.height() - w_width) / 2,
                (w_box.width() - tr_width) / 2,
            ),
        };

        w_span = w_span.expand_all(w_ext);
        tr_span = tr_span.expand_all(t_ext);
        for coord in [units.wire_lower, units.wire_upper].into_iter().flatten() {
            w_span = w_span.add_point(coord);
        }
        for coord in [units.track_lower, units.track_upper].into_iter().flatten() {
            tr_span = tr_span.add_point(coord);
        }
        tracing::trace!(?w_span, ?tr_span, "differential connection extents");

        let symmetric = TrackUnits {
            track_lower: Some(tr_span.start()),
            track_upper: Some(tr_span.stop()),
            ..units
        };
        let p = self.connect_to_tracks_units(p_warrs, pos, w_span, &symmetric)?;
        let n = self.connect_to_tracks_units(n_warrs, neg, w_span, &symmetric)?;
        Ok((p, n))
    }
}
