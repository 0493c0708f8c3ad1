use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use super::date::to_unix;
use super::line::{parse_line, Component, ParsedLine, Property};
use crate::error::EventError;
use crate::multimap::Tree;

/// The properties of one `VEVENT`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    /// The `X-WR-CALNAME` of the calendar the event came from.
    pub calendar: Option<String>,
    /// Properties set directly on the event. A repeated property keeps its last line.
    pub properties: BTreeMap<Property, ParsedLine>,
}

impl Event {
    /// The line that set `property`, if any.
    pub fn get(&self, property: Property) -> Option<&ParsedLine> {
        self.properties.get(&property)
    }

    /// The raw `SUMMARY` value.
    pub fn summary(&self) -> Option<&str> {
        self.get(Property::Summary).map(|line| line.value.as_str())
    }

    /// The `DTSTART` as seconds since the Unix epoch.
    pub fn start(&self) -> Result<i64, EventError> {
        let line = self.get(Property::Dtstart).ok_or(EventError::MissingStart)?;
        Ok(to_unix(line)?)
    }
}

/// Joins folded physical lines back into logical lines. A physical line starting with a space or
/// tab continues the previous one, minus that first character.
///
/// ```
/// use avl_multimap::ics::unfold;
///
/// assert_eq!(
///     unfold("SUMMARY:Long\r\n  title\r\nUID:1\r\n"),
///     vec!["SUMMARY:Long title", "UID:1"],
/// );
/// ```
pub fn unfold(document: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for physical in document.split('\n') {
        let physical = physical.strip_suffix('\r').unwrap_or(physical);
        let continuation = physical
            .strip_prefix(' ')
            .or_else(|| physical.strip_prefix('\t'));

        if let (Some(rest), Some(previous)) = (continuation, lines.last_mut()) {
            previous.push_str(rest);
            continue;
        }
        if !physical.is_empty() {
            lines.push(physical.to_owned());
        }
    }
    lines
}

/// Where the loader is inside the document.
enum State {
    Outside,
    /// Inside a `VEVENT`, `depth` components deep into nested ones like `VALARM`.
    InEvent { event: Event, depth: usize },
}

/// Inserts every `VEVENT` in `document` into `tree`, keyed by its start time, and returns how
/// many were inserted. Events without a usable `DTSTART` are skipped, as are lines that can't be
/// decoded.
pub fn load_events(document: &str, tree: &mut Tree<i64, Event>) -> usize {
    let mut calendar = None;
    let mut state = State::Outside;
    let mut inserted = 0;

    for line in unfold(document) {
        let parsed = match parse_line(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!(error = %e, "skipping undecodable line");
                continue;
            }
        };

        state = match state {
            State::Outside => {
                if parsed.is_begin && parsed.component == Some(Component::VEvent) {
                    State::InEvent {
                        event: Event {
                            calendar: calendar.clone(),
                            ..Event::default()
                        },
                        depth: 0,
                    }
                } else {
                    if parsed.property == Some(Property::XWrCalname) {
                        calendar = Some(parsed.value);
                    }
                    State::Outside
                }
            }
            State::InEvent { event, depth } if parsed.is_begin => {
                if depth == 0 && parsed.component == Some(Component::VEvent) {
                    warn!("VEVENT opened inside another, dropping the outer one");
                    State::InEvent {
                        event: Event {
                            calendar: calendar.clone(),
                            ..Event::default()
                        },
                        depth: 0,
                    }
                } else {
                    State::InEvent {
                        event,
                        depth: depth + 1,
                    }
                }
            }
            State::InEvent { event, depth } if parsed.is_end => {
                if depth > 0 {
                    State::InEvent {
                        event,
                        depth: depth - 1,
                    }
                } else {
                    match event.start() {
                        Ok(start) => {
                            tree.insert(start, event);
                            inserted += 1;
                        }
                        Err(e) => {
                            let uid = event.get(Property::Uid).map(|uid| uid.value.as_str());
                            warn!(error = %e, ?uid, "skipping event");
                        }
                    }
                    State::Outside
                }
            }
            State::InEvent { mut event, depth } => {
                if depth == 0 {
                    if let Some(property) = parsed.property {
                        event.properties.insert(property, parsed);
                    }
                }
                State::InEvent { event, depth }
            }
        };
    }

    if let State::InEvent { .. } = state {
        warn!("document ended inside a VEVENT");
    }
    debug!(inserted, "loaded events");
    inserted
}
