use thiserror::Error;

/// Errors that abort a kernel run before or instead of producing a Plan.
/// Run outcomes that still yield a Plan (infeasibility, timeouts, zero
/// support) are reported through [`crate::model::plan::PlanStatus`] and
/// [`crate::model::plan::Reason`] instead.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("INPUT_DUPLICATE_TOUR_ID: tour id {0} appears more than once")]
    InputDuplicateTourId(Box<str>),
    #[error("INPUT_OUT_OF_RANGE: tour {id}: {detail}")]
    InputOutOfRange { id: Box<str>, detail: String },
    #[error("CONFIG_UNKNOWN_KEY: unrecognised configuration key {0}")]
    ConfigUnknownKey(Box<str>),
    #[error("CONFIG_LOCKED_KEY: configuration key {key} is locked to {locked_value}")]
    ConfigLockedKey { key: Box<str>, locked_value: String },
    #[error("CONFIG_INVALID_VALUE: {key}={value} is not a valid {expected}")]
    ConfigInvalidValue { key: Box<str>, value: String, expected: &'static str },
    #[error("INPUT_DUPLICATE_DRIVER_ID: driver id {0} appears more than once")]
    InputDuplicateDriverId(Box<str>),
    #[error("HARD_VIOLATION: {0}")]
    HardViolation(String),
    #[error("MEMORY_EXCEEDED: estimated working set of {0} bytes breached the hard cap")]
    MemoryExceeded(u64),
}
