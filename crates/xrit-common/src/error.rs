//! Parse errors for the shared value types.

use thiserror::Error;

/// Result type alias using CommonError.
pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error, PartialEq)]
pub enum CommonError {
    #[error("Unknown geographical orientation of first pixel: '{0}'")]
    UnknownOrientation(String),

    #[error("Grid origin index out of range: {0}")]
    InvalidGridOrigin(u8),

    #[error("Invalid area extent format: {0}. Expected 'll_x,ll_y,ur_x,ur_y'")]
    InvalidExtent(String),

    #[error("Invalid number in area extent: {0}")]
    InvalidNumber(String),

    #[error("Invalid pixel range '{0}'. Expected 'start:stop'")]
    InvalidRange(String),

    #[error("Invalid time stamp '{0}': {1}")]
    InvalidTime(String, String),
}
