//! Conversion of raw counts into physical units.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};
use xrit_parser::records::DataDefinition;

use crate::error::{LoaderError, Result};
use crate::types::RasterRegion;

/// What a calibrator should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationLevel {
    /// Raw counts.
    Counts,
    /// The channel's natural unit: reflectance, brightness temperature or
    /// whatever the data-function table describes.
    #[default]
    Default,
    Radiance,
}

impl CalibrationLevel {
    /// Decode the 0/1/2 selector.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Counts),
            1 => Ok(Self::Default),
            2 => Ok(Self::Radiance),
            other => Err(LoaderError::calibration(format!("unknown calibration level {other}"))),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::Counts => 0,
            Self::Default => 1,
            Self::Radiance => 2,
        }
    }
}

/// Calibrated values. Masked cells hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedRaster {
    pub values: RasterRegion<f32>,
    pub unit: String,
}

/// Turns a counts raster into physical values.
pub trait Calibrator: Send + Sync + fmt::Debug {
    fn calibrate(&self, counts: &RasterRegion<u16>, level: CalibrationLevel) -> Result<CalibratedRaster>;
}

/// Apply `f` to every cell. Cells that are masked, equal `no_data` or map to
/// a non-finite value come out masked.
fn map_counts(counts: &RasterRegion<u16>, no_data: u16, f: impl Fn(u16) -> f64) -> RasterRegion<f32> {
    let mut mask = Vec::with_capacity(counts.data.len());
    let data = counts
        .data
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let masked_in = counts.mask.as_ref().is_some_and(|m| m[i]);
            let value = if masked_in || c == no_data { f64::NAN } else { f(c) };
            let masked = !value.is_finite();
            mask.push(masked);
            if masked {
                f32::NAN
            } else {
                value as f32
            }
        })
        .collect();
    RasterRegion {
        data,
        width: counts.width,
        height: counts.height,
        mask: Some(mask),
    }
}

pub(crate) fn as_counts(counts: &RasterRegion<u16>) -> CalibratedRaster {
    CalibratedRaster {
        values: RasterRegion {
            data: counts.data.iter().map(|&c| c as f32).collect(),
            width: counts.width,
            height: counts.height,
            mask: counts.mask.clone(),
        },
        unit: "counts".to_string(),
    }
}

// ============================================================================
// Data-function tables (SGS, JMA)
// ============================================================================

/// Count to value mapping carried in the image data function record.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationTable {
    /// One value per count, indexed by count.
    Lookup(Vec<f64>),
    /// `value = offset + count * scale`.
    Linear { scale: f64, offset: f64 },
    /// Linear interpolation between `(count, value)` points, clamped at the ends.
    Piecewise(Vec<(f64, f64)>),
}

/// Calibrator built from an image data function record.
#[derive(Debug, Clone)]
pub struct TableCalibrator {
    table: CalibrationTable,
    unit: String,
    no_data: u16,
}

impl TableCalibrator {
    pub fn new(table: CalibrationTable, unit: impl Into<String>, no_data: u16) -> Self {
        Self {
            table,
            unit: unit.into(),
            no_data,
        }
    }

    /// 256 rows make a lookup table, 2 rows a linear scale, more rows a
    /// piecewise linear curve.
    pub fn from_definition(definition: &DataDefinition, no_data: u16) -> Result<Self> {
        let mut rows: Vec<(f64, f64)> = definition
            .table
            .iter()
            .map(|&(count, value)| (count as f64, value))
            .collect();
        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let table = match rows.len() {
            0 => return Err(LoaderError::calibration("data function carries no calibration table")),
            1 => return Err(LoaderError::calibration("calibration table has a single row")),
            2 => {
                let scale = (rows[1].1 - rows[0].1) / (rows[1].0 - rows[0].0);
                CalibrationTable::Linear {
                    scale,
                    offset: rows[0].1 - rows[0].0 * scale,
                }
            }
            256 => CalibrationTable::Lookup(rows.iter().map(|r| r.1).collect()),
            _ => CalibrationTable::Piecewise(rows),
        };
        let unit = definition.string("_UNIT").unwrap_or_default();
        Ok(Self::new(table, unit, no_data))
    }

    pub fn table(&self) -> &CalibrationTable {
        &self.table
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Value of one count.
    pub fn value(&self, count: u16) -> f64 {
        match &self.table {
            CalibrationTable::Lookup(values) => values.get(count as usize).copied().unwrap_or(f64::NAN),
            CalibrationTable::Linear { scale, offset } => offset + count as f64 * scale,
            CalibrationTable::Piecewise(points) => interpolate(points, count as f64),
        }
    }
}

fn interpolate(points: &[(f64, f64)], x: f64) -> f64 {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return f64::NAN;
    };
    if x <= first.0 {
        return first.1;
    }
    if x >= last.0 {
        return last.1;
    }
    let upper = points.partition_point(|p| p.0 <= x);
    let (x0, y0) = points[upper - 1];
    let (x1, y1) = points[upper];
    if x1 == x0 {
        return y0;
    }
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

impl Calibrator for TableCalibrator {
    fn calibrate(&self, counts: &RasterRegion<u16>, level: CalibrationLevel) -> Result<CalibratedRaster> {
        match level {
            CalibrationLevel::Counts => Ok(as_counts(counts)),
            CalibrationLevel::Radiance => Err(LoaderError::calibration(
                "radiance is not available from a data function table",
            )),
            CalibrationLevel::Default => Ok(CalibratedRaster {
                values: map_counts(counts, self.no_data, |c| self.value(c)),
                unit: self.unit.clone(),
            }),
        }
    }
}

// ============================================================================
// MSG SEVIRI
// ============================================================================

/// SEVIRI channels in prologue calibration order.
pub const MSG_CHANNELS: [&str; 12] = [
    "VIS006", "VIS008", "IR_016", "IR_039", "WV_062", "WV_073", "IR_087", "IR_097", "IR_108",
    "IR_120", "IR_134", "HRV",
];

/// 0-based prologue index of a SEVIRI channel.
pub fn msg_channel_index(channel: &str) -> Option<usize> {
    MSG_CHANNELS.iter().position(|c| *c == channel)
}

pub const RADIANCE_UNIT: &str = "mW m-2 sr-1 (cm-1)-1";

const C1: f64 = 1.19104273e-16;
const C2: f64 = 0.0143877523;

const SOLAR_CHANNELS: [&str; 4] = ["HRV", "VIS006", "VIS008", "IR_016"];

const IR_CHANNELS: [&str; 8] = [
    "IR_039", "WV_062", "WV_073", "IR_087", "IR_097", "IR_108", "IR_120", "IR_134",
];

/// Quadratic fit `a·T² + b·T + c` applied after the plain inversion for
/// channels processed with calibration type 1.
const BTFIT: [(f64, f64, f64); 8] = [
    (0.0, 1.0117519, -3.5504),
    (1.8057e-5, 1.000255533, -1.79093),
    (2.31818e-6, 1.000668281, -0.456166),
    (-2.332e-5, 1.0118034, -1.50739),
    (-2.05533e-5, 1.00937067, -1.0306),
    (-7.39277e-5, 1.0328898, -3.29674),
    (-7.00984e-5, 1.0313146, -3.18109),
    (-7.29345e-5, 1.0304248, -2.64595),
];

struct SatelliteCoefficients {
    id: u16,
    /// `F·π` for HRV, VIS006, VIS008, IR_016.
    solar: [f64; 4],
    /// `(VC, ALPHA, BETA)` in `IR_CHANNELS` order.
    infrared: [(f64, f64, f64); 8],
}

const COEFFICIENTS: [SatelliteCoefficients; 4] = [
    SatelliteCoefficients {
        id: 321,
        solar: [78.7599, 65.2296, 73.0127, 62.3715],
        infrared: [
            (2567.33, 0.9956, 3.41),
            (1598.103, 0.9962, 2.218),
            (1362.081, 0.9991, 0.478),
            (1149.069, 0.9996, 0.179),
            (1034.343, 0.9999, 0.06),
            (930.647, 0.9983, 0.625),
            (839.66, 0.9988, 0.397),
            (752.387, 0.9981, 0.578),
        ],
    },
    SatelliteCoefficients {
        id: 322,
        solar: [79.0113, 65.2065, 73.1869, 61.9923],
        infrared: [
            (2568.832, 0.9954, 3.438),
            (1600.548, 0.9963, 2.185),
            (1360.330, 0.9991, 0.47),
            (1148.620, 0.9996, 0.179),
            (1035.289, 0.9999, 0.056),
            (931.7, 0.9983, 0.64),
            (836.445, 0.9988, 0.408),
            (751.792, 0.9981, 0.561),
        ],
    },
    SatelliteCoefficients {
        id: 323,
        solar: [78.9416, 65.5148, 73.1807, 62.0208],
        infrared: [
            (2547.771, 0.9915, 2.9002),
            (1595.621, 0.9960, 2.0337),
            (1360.337, 0.9991, 0.4340),
            (1148.130, 0.9996, 0.1714),
            (1034.715, 0.9999, 0.0527),
            (929.842, 0.9983, 0.6084),
            (838.659, 0.9988, 0.3882),
            (750.653, 0.9982, 0.5390),
        ],
    },
    SatelliteCoefficients {
        id: 324,
        solar: [79.0035, 65.2656, 73.1692, 61.9416],
        infrared: [
            (2555.280, 0.9916, 2.9438),
            (1596.080, 0.9959, 2.0780),
            (1361.748, 0.9990, 0.4929),
            (1147.433, 0.9996, 0.1731),
            (1034.851, 0.9998, 0.0597),
            (931.122, 0.9983, 0.6256),
            (839.113, 0.9988, 0.4002),
            (748.585, 0.9981, 0.5635),
        ],
    },
];

/// SEVIRI calibration from the prologue slope/offset pair of one channel.
#[derive(Debug, Clone)]
pub struct MsgCalibrator {
    pub satellite_id: u16,
    pub channel: String,
    pub slope: f64,
    pub offset: f64,
    /// Planned channel processing: 1 spectral radiance via fit, 2 effective
    /// radiance.
    pub cal_type: u8,
}

/// Counts of 0 never carry data in SEVIRI images.
const MSG_NO_DATA: u16 = 0;

impl MsgCalibrator {
    pub fn new(satellite_id: u16, channel: &str, slope: f64, offset: f64, cal_type: u8) -> Result<Self> {
        if msg_channel_index(channel).is_none() {
            return Err(LoaderError::calibration(format!("unknown SEVIRI channel '{channel}'")));
        }
        Ok(Self {
            satellite_id,
            channel: channel.to_string(),
            slope,
            offset,
            cal_type,
        })
    }

    pub fn radiance(&self, count: u16) -> f64 {
        (count as f64 * self.slope + self.offset).max(0.0)
    }

    fn coefficients(&self) -> Result<&'static SatelliteCoefficients> {
        COEFFICIENTS
            .iter()
            .find(|c| c.id == self.satellite_id)
            .ok_or_else(|| {
                LoaderError::calibration(format!(
                    "no calibration coefficients available for this satellite ({})",
                    self.satellite_id
                ))
            })
    }

    fn brightness_temperature(&self, radiance: f64, index: usize, coef: &SatelliteCoefficients) -> Result<f64> {
        let (vc, alpha, beta) = coef.infrared[index];
        let t = C2 * 100.0 * vc / (C1 * 1.0e6 * vc.powi(3) / (1.0e-5 * radiance) + 1.0).ln();
        match self.cal_type {
            2 => Ok((t - beta) / alpha),
            1 => {
                let (a, b, c) = BTFIT[index];
                Ok(t * t * a + t * b + c)
            }
            other => Err(LoaderError::calibration(format!(
                "unknown planned channel processing {other} for {}",
                self.channel
            ))),
        }
    }
}

impl Calibrator for MsgCalibrator {
    fn calibrate(&self, counts: &RasterRegion<u16>, level: CalibrationLevel) -> Result<CalibratedRaster> {
        match level {
            CalibrationLevel::Counts => Ok(as_counts(counts)),
            CalibrationLevel::Radiance => Ok(CalibratedRaster {
                values: map_counts(counts, MSG_NO_DATA, |c| self.radiance(c)),
                unit: RADIANCE_UNIT.to_string(),
            }),
            CalibrationLevel::Default => {
                let coef = self.coefficients()?;
                if let Some(i) = SOLAR_CHANNELS.iter().position(|c| *c == self.channel) {
                    let solar = coef.solar[i] / PI;
                    return Ok(CalibratedRaster {
                        values: map_counts(counts, MSG_NO_DATA, |c| self.radiance(c) / solar * 100.0),
                        unit: "%".to_string(),
                    });
                }
                let index = IR_CHANNELS
                    .iter()
                    .position(|c| *c == self.channel)
                    .ok_or_else(|| LoaderError::calibration(format!("unknown SEVIRI channel '{}'", self.channel)))?;
                // Fails early on a bad processing type.
                self.brightness_temperature(1.0, index, coef)?;
                Ok(CalibratedRaster {
                    values: map_counts(counts, MSG_NO_DATA, |c| {
                        self.brightness_temperature(self.radiance(c), index, coef)
                            .unwrap_or(f64::NAN)
                    }),
                    unit: "K".to_string(),
                })
            }
        }
    }
}
