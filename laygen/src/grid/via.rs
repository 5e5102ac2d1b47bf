//! Vias between adjacent routing layers.

use arcstr::ArcStr;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use super::{LayerId, RoutingGrid};
use crate::error::Result;

/// Cut and enclosure rules for the via between `bot_layer` and `bot_layer + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaRule {
    /// The lower of the two connected layers.
    pub bot_layer: LayerId,
    /// Edge length of a square via cut.
    pub cut_width: i64,
    /// Spacing between adjacent cuts.
    pub cut_space: i64,
    /// Extension of the bottom metal past the overlap region.
    pub bot_enc: i64,
    /// Extension of the top metal past the overlap region.
    pub top_enc: i64,
}

impl ViaRule {
    /// The number of cuts that fit in a region `len` long.
    ///
    /// At least one cut is always placed.
    pub fn cut_count(&self, len: i64) -> u32 {
        let n = (len + self.cut_space) / (self.cut_width + self.cut_space);
        u32::try_from(n).unwrap_or(u32::MAX).max(1)
    }
}

/// A via array connecting two adjacent routing layers.
///
/// `bbox` is the overlap region of the two metals. The bottom metal
/// extends past it along `bot_dir`; the top metal extends along the
/// other direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Via {
    bot_layer: LayerId,
    bot_name: ArcStr,
    top_name: ArcStr,
    bot_dir: Dir,
    array: BoxArray,
    bottom_box: Rect,
    top_box: Rect,
    num_cols: u32,
    num_rows: u32,
}

impl Via {
    /// Computes a via on top of the overlap region `bbox`.
    ///
    /// The via is repeated `nx` by `ny` times with spacing `(spx, spy)`.
    pub fn new(
        grid: &RoutingGrid,
        bbox: Rect,
        bot_layer: LayerId,
        bot_dir: Dir,
        array: (u32, u32, i64, i64),
    ) -> Result<Self> {
        let rule = grid.via_rule(bot_layer)?;
        let (nx, ny, spx, spy) = array;
        Ok(Self {
            bot_layer,
            bot_name: grid.layer_name(bot_layer)?,
            top_name: grid.layer_name(bot_layer + 1)?,
            bot_dir,
            array: BoxArray::new(bbox, nx, ny, spx, spy),
            bottom_box: bbox.expand_dir(bot_dir, rule.bot_enc),
            top_box: bbox.expand_dir(!bot_dir, rule.top_enc),
            num_cols: rule.cut_count(bbox.width()),
            num_rows: rule.cut_count(bbox.height()),
        })
    }

    /// The overlap region of the first via in the array.
    #[inline]
    pub fn bbox(&self) -> Rect {
        self.array.base()
    }

    /// The overlap regions of every via in the array.
    #[inline]
    pub fn array(&self) -> BoxArray {
        self.array
    }

    /// The id of the bottom layer.
    #[inline]
    pub fn bot_layer(&self) -> LayerId {
        self.bot_layer
    }

    /// The name of the bottom layer.
    pub fn bot_layer_name(&self) -> &ArcStr {
        &self.bot_name
    }

    /// The name of the top layer.
    pub fn top_layer_name(&self) -> &ArcStr {
        &self.top_name
    }

    /// The direction the bottom metal is extended in.
    #[inline]
    pub fn bot_dir(&self) -> Dir {
        self.bot_dir
    }

    /// The bottom metal of the first via in the array.
    #[inline]
    pub fn bottom_box(&self) -> Rect {
        self.bottom_box
    }

    /// The top metal of the first via in the array.
    #[inline]
    pub fn top_box(&self) -> Rect {
        self.top_box
    }

    /// Number of cut columns in a single via.
    #[inline]
    pub fn num_cols(&self) -> u32 {
        self.num_cols
    }

    /// Number of cut rows in a single via.
    #[inline]
    pub fn num_rows(&self) -> u32 {
        self.num_rows
    }

    /// Translates the via by `(dx, dy)`.
    pub fn translate(self, dx: i64, dy: i64) -> Self {
        Self {
            array: self.array.translate(dx, dy),
            bottom_box: self.bottom_box.translate(dx, dy),
            top_box: self.top_box.translate(dx, dy),
            ..self
        }
    }
}

impl Transform for Via {
    fn transform(&self, trans: Transformation) -> Self {
        let swap = trans.orientation().swaps_axes();
        let (num_cols, num_rows) = if swap {
            (self.num_rows, self.num_cols)
        } else {
            (self.num_cols, self.num_rows)
        };
        Self {
            bot_layer: self.bot_layer,
            bot_name: self.bot_name.clone(),
            top_name: self.top_name.clone(),
            bot_dir: if swap { !self.bot_dir } else { self.bot_dir },
            array: self.array.transform(trans),
            bottom_box: self.bottom_box.transform(trans),
            top_box: self.top_box.transform(trans),
            num_cols,
            num_rows,
        }
    }
}
