//! Common types shared by the xRIT parser, image loader and tooling.
//!
//! Everything here is a plain value: image orientation, pixel windows,
//! projection-plane extents and the time conventions used by the HRIT/LRIT
//! headers.

pub mod error;
pub mod extent;
pub mod orientation;
pub mod time;
pub mod window;

pub use error::{CommonError, CommonResult};
pub use extent::AreaExtent;
pub use orientation::FirstPixel;
pub use time::{cds_epoch, parse_nominal_time};
pub use window::PixelWindow;
