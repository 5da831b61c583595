//! Error types for blackout-gate operations.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GateError {
    #[error("Invalid calendar: {0}")]
    InvalidCalendar(String),

    #[error("Advance margin must be non-negative, got {0} seconds")]
    NegativeMargin(i64),

    #[error("Advance margin of {0} seconds moves the reference instant out of range")]
    MarginOverflow(i64),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

pub type Result<T> = std::result::Result<T, GateError>;
