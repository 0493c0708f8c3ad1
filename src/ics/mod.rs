//! Just enough iCalendar (RFC 5545) to pull events out of a calendar document.
//!
//! - [`parse_line`] decodes one unfolded content line into a [`ParsedLine`].
//! - [`to_unix`] resolves a `DATE`/`DATE-TIME` value to seconds since the epoch.
//! - [`load_events`] walks a whole document and inserts every `VEVENT` into a
//!   [`Tree`](crate::multimap::Tree) keyed by its start time.
//!
//! # Examples
//!
//! ```
//! use avl_multimap::ics::{self, Property};
//! use avl_multimap::multimap::Tree;
//!
//! let document = "BEGIN:VCALENDAR\r\n\
//!     X-WR-CALNAME:Team\r\n\
//!     BEGIN:VEVENT\r\n\
//!     DTSTART:20240101T090000Z\r\n\
//!     SUMMARY:Stand\r\n  up\r\n\
//!     END:VEVENT\r\n\
//!     END:VCALENDAR\r\n";
//!
//! let mut tree = Tree::new();
//! assert_eq!(ics::load_events(document, &mut tree), 1);
//!
//! let (start, events) = tree.min().unwrap();
//! assert_eq!(start, 1_704_099_600);
//! assert_eq!(events[0].summary(), Some("Stand up"));
//! assert_eq!(events[0].calendar.as_deref(), Some("Team"));
//! assert!(events[0].get(Property::Dtstart).is_some());
//! ```

mod date;
mod events;
mod line;

pub use date::to_unix;
pub use events::{load_events, unfold, Event};
pub use line::{parse_line, Component, Param, ParsedLine, Property};
