use thiserror::Error;

/// Result alias used by every fallible public function in this crate.
pub type StructureResult<T> = Result<T, StructureError>;

/// Flat error taxonomy for the market-structure core.
///
/// Kept as a single enum rather than a nested per-module hierarchy: this
/// crate is small enough that one flat set of variants reads more clearly
/// than a `#[from]`-chained tree of sub-errors, unlike the much larger
/// parent application this core was split out of.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid local date '{0}', expected YYYY-MM-DD")]
    InvalidDateFormat(String),

    #[error("unknown IANA timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid time format '{0}', expected HH:mm")]
    InvalidTimeFormat(String),

    #[error("invalid bar: {0}")]
    InvalidBar(String),

    #[error("out-of-order bar: received timestamp {received} after {last_accepted}")]
    OutOfOrderBar { received: i64, last_accepted: i64 },

    #[error("no trading date started; call start_date() first")]
    NoDateStarted,

    #[error("illegal plan target status transition: {from} -> {to}")]
    IllegalStatusTransition { from: String, to: String },

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("unknown level id '{0}'")]
    UnknownLevel(String),
}
