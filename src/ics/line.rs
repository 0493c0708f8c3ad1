//! Decoding of a single content line:
//!
//! ```text
//! NAME[;param1=v1;param2=v2]:value
//! ```

use crate::error::LineError;

/// Declares a name-keyed enum along with its lookups in both directions.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        pub enum $enum:ident {
            $($variant:ident => $name:literal,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $enum {
            $(
                #[doc = $name]
                $variant,
            )*
        }

        impl $enum {
            /// The name as written in a calendar.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Looks up an upper-cased name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(Self::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

named_enum! {
    /// Components that can be opened with `BEGIN:` and closed with `END:`.
    pub enum Component {
        VCalendar => "VCALENDAR",
        VEvent => "VEVENT",
        VTodo => "VTODO",
        VJournal => "VJOURNAL",
        VFreeBusy => "VFREEBUSY",
        VTimezone => "VTIMEZONE",
        VAlarm => "VALARM",
        VAvailability => "VAVAILABILITY",
        Available => "AVAILABLE",
        Standard => "STANDARD",
        Daylight => "DAYLIGHT",
        VLocation => "VLOCATION",
        VResource => "VRESOURCE",
    }
}

named_enum! {
    /// Properties from RFC 5545, 7953, 7986, 9073 and 9074, plus common vendor extensions.
    pub enum Property {
        // Calendar
        Calscale => "CALSCALE",
        Method => "METHOD",
        Prodid => "PRODID",
        Version => "VERSION",
        // Descriptive
        Attach => "ATTACH",
        Categories => "CATEGORIES",
        Class => "CLASS",
        Comment => "COMMENT",
        Description => "DESCRIPTION",
        Geo => "GEO",
        Location => "LOCATION",
        PercentComplete => "PERCENT-COMPLETE",
        Priority => "PRIORITY",
        Resources => "RESOURCES",
        Status => "STATUS",
        Summary => "SUMMARY",
        // Date/time
        Completed => "COMPLETED",
        Dtend => "DTEND",
        Due => "DUE",
        Dtstart => "DTSTART",
        Duration => "DURATION",
        Freebusy => "FREEBUSY",
        Transp => "TRANSP",
        // Time zone
        Tzid => "TZID",
        Tzname => "TZNAME",
        Tzoffsetfrom => "TZOFFSETFROM",
        Tzoffsetto => "TZOFFSETTO",
        Tzurl => "TZURL",
        // Relationship
        Attendee => "ATTENDEE",
        Contact => "CONTACT",
        Organizer => "ORGANIZER",
        RecurrenceId => "RECURRENCE-ID",
        RelatedTo => "RELATED-TO",
        Url => "URL",
        Uid => "UID",
        // Recurrence
        Exdate => "EXDATE",
        Rdate => "RDATE",
        Rrule => "RRULE",
        // Alarm
        Action => "ACTION",
        Repeat => "REPEAT",
        Trigger => "TRIGGER",
        // Change management
        Created => "CREATED",
        Dtstamp => "DTSTAMP",
        LastModified => "LAST-MODIFIED",
        Sequence => "SEQUENCE",
        RequestStatus => "REQUEST-STATUS",
        // RFC 7986
        Name => "NAME",
        RefreshInterval => "REFRESH-INTERVAL",
        Source => "SOURCE",
        Color => "COLOR",
        Image => "IMAGE",
        // RFC 9073
        Conference => "CONFERENCE",
        Participant => "PARTICIPANT",
        StructuredData => "STRUCTURED-DATA",
        StyledDescription => "STYLED-DESCRIPTION",
        LocationType => "LOCATION-TYPE",
        ResourceType => "RESOURCE-TYPE",
        // RFC 9074
        Acknowledged => "ACKNOWLEDGED",
        Proximity => "PROXIMITY",
        // RFC 7953
        BusyType => "BUSYTYPE",
        // Vendor extensions
        XWrCalname => "X-WR-CALNAME",
        XWrCaldesc => "X-WR-CALDESC",
        XWrTimezone => "X-WR-TIMEZONE",
        XWrRelcalid => "X-WR-RELCALID",
        XAppleStructuredLocation => "X-APPLE-STRUCTURED-LOCATION",
        XAppleTravelAdvisoryBehavior => "X-APPLE-TRAVEL-ADVISORY-BEHAVIOR",
        XAppleDefaultAlarm => "X-APPLE-DEFAULT-ALARM",
        XAppleOmitFromSync => "X-APPLE-OMIT-FROM-SYNC",
        XMicrosoftCdoBusystatus => "X-MICROSOFT-CDO-BUSYSTATUS",
        XMicrosoftCdoIntendedstatus => "X-MICROSOFT-CDO-INTENDEDSTATUS",
        XMicrosoftCdoAlldayevent => "X-MICROSOFT-CDO-ALLDAYEVENT",
        XMicrosoftCdoImportance => "X-MICROSOFT-CDO-IMPORTANCE",
        XMicrosoftCdoInsttype => "X-MICROSOFT-CDO-INSTTYPE",
        XMicrosoftCdoOwnerapptid => "X-MICROSOFT-CDO-OWNER-APPT-ID",
        XMicrosoftCdoApptsequence => "X-MICROSOFT-CDO-APPT-SEQUENCE",
        XGoogleConference => "X-GOOGLE-CONFERENCE",
        XGoogleStructuredLocation => "X-GOOGLE-STRUCTURED-LOCATION",
        XGoogleCalendarId => "X-GOOGLE-CALENDAR-ID",
    }
}

/// A single `;KEY=VALUE` parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Param {
    /// Upper-cased parameter name.
    pub key: String,
    /// Raw value, quotes included. Empty for a bare parameter name.
    pub value: String,
}

/// One decoded content line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedLine {
    /// The known property this line sets. `None` for `BEGIN`/`END` and unrecognised names.
    pub property: Option<Property>,
    /// The line is `BEGIN:...`.
    pub is_begin: bool,
    /// The line is `END:...`.
    pub is_end: bool,
    /// The component opened or closed by a `BEGIN`/`END` line, if recognised.
    pub component: Option<Component>,
    /// The upper-cased name as it appeared, e.g. `DTSTART`.
    pub raw_name: String,
    /// Everything between the first `;` and the `:`, e.g. `TZID=Europe/Stockholm;VALUE=DATE`.
    pub params: String,
    /// [`ParsedLine::params`] split into individual parameters.
    pub parsed_params: Vec<Param>,
    /// Everything after the `:`, still escaped.
    pub value: String,
    /// The name is neither `BEGIN`/`END` nor a known property.
    pub is_unknown: bool,
}

impl ParsedLine {
    /// The value of the first parameter named `key` (upper-case), without surrounding quotes.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parsed_params
            .iter()
            .find(|param| param.key == key)
            .map(|param| {
                let value = param.value.as_str();
                value
                    .strip_prefix('"')
                    .and_then(|value| value.strip_suffix('"'))
                    .unwrap_or(value)
            })
    }
}

/// Decodes one logical (already unfolded) content line.
///
/// Only a line without a `:` separator is an error. Unrecognised names come back with
/// [`ParsedLine::is_unknown`] set so the raw name and value stay available.
///
/// # Examples
///
/// ```
/// use avl_multimap::ics::{parse_line, Property};
///
/// let line = parse_line("DTSTART;TZID=Europe/Stockholm:20240515T083000").unwrap();
/// assert_eq!(line.property, Some(Property::Dtstart));
/// assert_eq!(line.param("TZID"), Some("Europe/Stockholm"));
/// assert_eq!(line.value, "20240515T083000");
///
/// assert!(parse_line("no separator").is_err());
/// ```
pub fn parse_line(line: &str) -> Result<ParsedLine, LineError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(LineError::Empty);
    }

    let (name_and_params, value) = split_once_unquoted(line, ':')
        .ok_or_else(|| LineError::MissingSeparator(line.to_owned()))?;

    let (raw_name, params) = name_and_params
        .split_once(';')
        .unwrap_or((name_and_params, ""));
    let raw_name = raw_name.trim().to_ascii_uppercase();

    let mut parsed = ParsedLine {
        parsed_params: parse_params(params),
        params: params.to_owned(),
        value: value.to_owned(),
        ..ParsedLine::default()
    };

    match raw_name.as_str() {
        "BEGIN" => {
            parsed.is_begin = true;
            parsed.component = Component::from_name(&value.trim().to_ascii_uppercase());
        }
        "END" => {
            parsed.is_end = true;
            parsed.component = Component::from_name(&value.trim().to_ascii_uppercase());
        }
        name => {
            parsed.property = Property::from_name(name);
            parsed.is_unknown = parsed.property.is_none();
        }
    }
    parsed.raw_name = raw_name;

    Ok(parsed)
}

/// Splits `s` at the first `separator` outside double quotes. Parameter values such as
/// `ALTREP="http://example.com/calendar"` may contain the separator.
fn split_once_unquoted(s: &str, separator: char) -> Option<(&str, &str)> {
    let mut in_quote = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quote = !in_quote,
            c if c == separator && !in_quote => {
                return Some((&s[..i], &s[i + c.len_utf8()..]));
            }
            _ => {}
        }
    }
    None
}

/// Splits `s` on every `separator` outside double quotes.
fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some((part, tail)) = split_once_unquoted(rest, separator) {
        parts.push(part);
        rest = tail;
    }
    parts.push(rest);
    parts
}

fn parse_params(raw: &str) -> Vec<Param> {
    if raw.is_empty() {
        return Vec::new();
    }

    split_unquoted(raw, ';')
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => Param {
                key: key.trim().to_ascii_uppercase(),
                value: value.trim().to_owned(),
            },
            None => Param {
                key: part.to_ascii_uppercase(),
                value: String::new(),
            },
        })
        .collect()
}
