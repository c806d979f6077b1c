//! Area extents in the projection plane.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Lower-left / upper-right corners of an area, in projection units (meters).
///
/// The corners are pixel edges, not pixel centers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaExtent {
    pub ll_x: f64,
    pub ll_y: f64,
    pub ur_x: f64,
    pub ur_y: f64,
}

impl AreaExtent {
    pub fn new(ll_x: f64, ll_y: f64, ur_x: f64, ur_y: f64) -> Self {
        Self {
            ll_x,
            ll_y,
            ur_x,
            ur_y,
        }
    }

    /// Parse "ll_x,ll_y,ur_x,ur_y".
    pub fn from_csv(s: &str) -> CommonResult<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(CommonError::InvalidExtent(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .trim()
                .parse()
                .map_err(|_| CommonError::InvalidNumber(part.to_string()))?;
        }
        Ok(Self::from(values))
    }

    pub fn width(&self) -> f64 {
        self.ur_x - self.ll_x
    }

    pub fn height(&self) -> f64 {
        self.ur_y - self.ll_y
    }

    pub fn intersects(&self, other: &AreaExtent) -> bool {
        self.ll_x < other.ur_x
            && self.ur_x > other.ll_x
            && self.ll_y < other.ur_y
            && self.ur_y > other.ll_y
    }

    pub fn intersection(&self, other: &AreaExtent) -> Option<AreaExtent> {
        if !self.intersects(other) {
            return None;
        }

        Some(AreaExtent {
            ll_x: self.ll_x.max(other.ll_x),
            ll_y: self.ll_y.max(other.ll_y),
            ur_x: self.ur_x.min(other.ur_x),
            ur_y: self.ur_y.min(other.ur_y),
        })
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.ll_x && x <= self.ur_x && y >= self.ll_y && y <= self.ur_y
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.ll_x, self.ll_y, self.ur_x, self.ur_y]
    }
}

impl From<[f64; 4]> for AreaExtent {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv() {
        let e = AreaExtent::from_csv("-5570248.5, -5567248.1, 5567248.1, 5570248.5").unwrap();
        assert_eq!(e.ll_x, -5570248.5);
        assert_eq!(e.ur_y, 5570248.5);
    }

    #[test]
    fn test_from_csv_rejects_short_input() {
        assert!(matches!(
            AreaExtent::from_csv("1,2,3"),
            Err(CommonError::InvalidExtent(_))
        ));
        assert!(matches!(
            AreaExtent::from_csv("1,2,x,4"),
            Err(CommonError::InvalidNumber(_))
        ));
    }
}
