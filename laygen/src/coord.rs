//! Coordinates given either in resolution units or in physical units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A coordinate accepted by layout operations.
///
/// Physical coordinates are converted by rounding to the nearest resolution
/// unit (ties to even).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Coord {
    /// Integer resolution units.
    Units(i64),
    /// Physical units, in the same unit as the grid resolution.
    Phys(Decimal),
}

impl Coord {
    /// Converts this coordinate to resolution units.
    pub fn to_units(self, resolution: Decimal) -> Result<i64> {
        match self {
            Coord::Units(v) => Ok(v),
            Coord::Phys(v) => {
                let scaled = v.checked_div(resolution).ok_or(Error::InvalidCoord(v))?;
                i64::try_from(scaled.round()).map_err(|_| Error::InvalidCoord(v))
            }
        }
    }
}

impl From<i64> for Coord {
    fn from(value: i64) -> Self {
        Coord::Units(value)
    }
}

impl From<Decimal> for Coord {
    fn from(value: Decimal) -> Self {
        Coord::Phys(value)
    }
}

/// Converts an optional coordinate to resolution units.
pub(crate) fn opt_units(coord: Option<Coord>, resolution: Decimal) -> Result<Option<i64>> {
    coord.map(|c| c.to_units(resolution)).transpose()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[crate::test]
    fn physical_coordinates_round_to_nearest_unit() {
        let res = dec!(0.001);
        assert_eq!(Coord::Phys(dec!(0.1)).to_units(res).unwrap(), 100);
        assert_eq!(Coord::Phys(dec!(0.1004)).to_units(res).unwrap(), 100);
        assert_eq!(Coord::Phys(dec!(0.1006)).to_units(res).unwrap(), 101);
        assert_eq!(Coord::Phys(dec!(-0.0025)).to_units(res).unwrap(), -2);
        assert_eq!(Coord::Units(7).to_units(res).unwrap(), 7);
    }

    #[crate::test]
    fn zero_resolution_is_rejected() {
        assert!(matches!(
            Coord::Phys(dec!(1)).to_units(Decimal::ZERO),
            Err(Error::InvalidCoord(_))
        ));
    }
}
