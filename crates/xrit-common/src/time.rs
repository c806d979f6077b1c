//! Time conventions of the xRIT headers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{CommonError, CommonResult};

/// Epoch of the CCSDS day-segmented (CDS) time code: 1958-01-01T00:00:00Z.
pub fn cds_epoch() -> DateTime<Utc> {
    let epoch = NaiveDate::from_ymd_opt(1958, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    Utc.from_utc_datetime(&epoch)
}

/// Parse the `YYYYmmddHHMM` nominal time found in annotation records.
pub fn parse_nominal_time(s: &str) -> CommonResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M")
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .map_err(|e| CommonError::InvalidTime(s.to_string(), e.to_string()))
}
