//! Image orientation: which corner of the on-disk raster is pixel (0, 0).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CommonError, CommonResult};

/// Geographical position of the first pixel of the on-disk raster.
///
/// Arrays handed to callers are always normalized so that row 0 is the
/// northernmost line and column 0 the westernmost column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FirstPixel {
    #[default]
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

/// MSG prologue `GridOrigin` index order.
const GRID_ORIGINS: [FirstPixel; 4] = [
    FirstPixel::NorthWest,
    FirstPixel::SouthWest,
    FirstPixel::SouthEast,
    FirstPixel::NorthEast,
];

impl FirstPixel {
    pub const ALL: [FirstPixel; 4] = [
        FirstPixel::NorthWest,
        FirstPixel::NorthEast,
        FirstPixel::SouthWest,
        FirstPixel::SouthEast,
    ];

    /// Decode the grid origin index stored in the MSG prologue reference grids.
    pub fn from_grid_origin(index: u8) -> CommonResult<Self> {
        GRID_ORIGINS
            .get(index as usize)
            .copied()
            .ok_or(CommonError::InvalidGridOrigin(index))
    }

    /// Lines are stored south to north.
    pub fn is_south(&self) -> bool {
        matches!(self, FirstPixel::SouthWest | FirstPixel::SouthEast)
    }

    /// Columns are stored east to west.
    pub fn is_east(&self) -> bool {
        matches!(self, FirstPixel::NorthEast | FirstPixel::SouthEast)
    }

    /// The conventional "north west" style name.
    pub fn name(&self) -> &'static str {
        match self {
            FirstPixel::NorthWest => "north west",
            FirstPixel::NorthEast => "north east",
            FirstPixel::SouthWest => "south west",
            FirstPixel::SouthEast => "south east",
        }
    }

    /// First word of the name, capitalized ("North" / "South").
    pub fn line_side(&self) -> &'static str {
        if self.is_south() {
            "South"
        } else {
            "North"
        }
    }

    /// Second word of the name, capitalized ("East" / "West").
    pub fn column_side(&self) -> &'static str {
        if self.is_east() {
            "East"
        } else {
            "West"
        }
    }
}

impl FromStr for FirstPixel {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = s.split_whitespace().map(|w| w.to_lowercase()).collect();
        match words.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["north", "west"] => Ok(FirstPixel::NorthWest),
            ["north", "east"] => Ok(FirstPixel::NorthEast),
            ["south", "west"] => Ok(FirstPixel::SouthWest),
            ["south", "east"] => Ok(FirstPixel::SouthEast),
            _ => Err(CommonError::UnknownOrientation(s.to_string())),
        }
    }
}

impl fmt::Display for FirstPixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for FirstPixel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FirstPixel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("north west".parse::<FirstPixel>().unwrap(), FirstPixel::NorthWest);
        assert_eq!("South  East".parse::<FirstPixel>().unwrap(), FirstPixel::SouthEast);
        assert!("up left".parse::<FirstPixel>().is_err());
    }

    #[test]
    fn test_grid_origin_order() {
        assert_eq!(FirstPixel::from_grid_origin(0).unwrap(), FirstPixel::NorthWest);
        assert_eq!(FirstPixel::from_grid_origin(1).unwrap(), FirstPixel::SouthWest);
        assert_eq!(FirstPixel::from_grid_origin(2).unwrap(), FirstPixel::SouthEast);
        assert_eq!(FirstPixel::from_grid_origin(3).unwrap(), FirstPixel::NorthEast);
        assert_eq!(
            FirstPixel::from_grid_origin(4),
            Err(CommonError::InvalidGridOrigin(4))
        );
    }

    #[test]
    fn test_sides() {
        assert_eq!(FirstPixel::SouthEast.line_side(), "South");
        assert_eq!(FirstPixel::SouthEast.column_side(), "East");
        assert!(!FirstPixel::NorthWest.is_south());
        assert!(FirstPixel::NorthEast.is_east());
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&FirstPixel::SouthWest).unwrap();
        assert_eq!(json, "\"south west\"");
        let back: FirstPixel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, FirstPixel::SouthWest);
    }
}
