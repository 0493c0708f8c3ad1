//! Error types for the iCalendar layer. The multimap itself never fails.

use thiserror::Error;

/// A content line that can't be decoded at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// Nothing but a line terminator.
    #[error("empty line")]
    Empty,

    /// No unquoted `:` between the name and the value.
    #[error("no ':' separator found in line: {0}")]
    MissingSeparator(String),
}

/// A date/time value that can't be resolved to a timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// The line has no value.
    #[error("empty date/time value")]
    EmptyValue,

    /// The value is not a `DATE` or `DATE-TIME`.
    #[error("cannot parse date/time value {0:?}")]
    Unparseable(String),

    /// The local time was skipped by a daylight saving transition, and no valid local time
    /// precedes it closely enough to borrow an offset from.
    #[error("{value:?} does not exist in time zone {zone}")]
    NonexistentLocalTime {
        /// The raw value.
        value: String,
        /// The IANA name of the zone.
        zone: String,
    },
}

/// Why an event has no usable start time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The event has no `DTSTART` property.
    #[error("event has no DTSTART")]
    MissingStart,

    /// The `DTSTART` value couldn't be resolved.
    #[error("invalid DTSTART: {0}")]
    Date(#[from] DateError),
}
