use chrono::{Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use super::line::ParsedLine;
use crate::error::DateError;

/// Resolves the `DATE` or `DATE-TIME` value of a line to seconds since the Unix epoch.
///
/// Accepted values:
///
/// ```text
/// 20060102T150405Z   UTC
/// 20060102T150405    local to the TZID parameter, or UTC without one
/// 20060102           midnight, same zone rules as above
/// ```
///
/// A trailing `Z` always wins over a `TZID` parameter. A `TZID` that isn't an IANA zone name
/// falls back to UTC.
///
/// # Examples
///
/// ```
/// use avl_multimap::ics::{parse_line, to_unix};
///
/// let line = parse_line("DTSTART:20240101T000000Z").unwrap();
/// assert_eq!(to_unix(&line), Ok(1_704_067_200));
///
/// let line = parse_line("DTSTART;TZID=Europe/Stockholm:20240101T010000").unwrap();
/// assert_eq!(to_unix(&line), Ok(1_704_067_200));
/// ```
pub fn to_unix(line: &ParsedLine) -> Result<i64, DateError> {
    let raw = line.value.as_str();
    if raw.is_empty() {
        return Err(DateError::EmptyValue);
    }

    let naive = parse_naive(raw).ok_or_else(|| DateError::Unparseable(raw.to_owned()))?;

    let zone = if raw.ends_with('Z') {
        None
    } else {
        line.param("TZID").and_then(|tzid| match tzid.parse::<Tz>() {
            Ok(zone) => Some(zone),
            Err(_) => {
                debug!(tzid, "unknown time zone, using UTC");
                None
            }
        })
    };

    let Some(zone) = zone else {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    };

    match zone.from_local_datetime(&naive) {
        LocalResult::Single(time) => Ok(time.timestamp()),
        // Repeated by a daylight saving transition.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
        // Skipped by a daylight saving transition. Read with the offset from before the gap, so
        // 02:30 in a 02:00 -> 03:00 jump is the same instant as 03:30.
        LocalResult::None => offset_before_gap(zone, &naive)
            .map(|offset| (naive - Duration::seconds(offset)).and_utc().timestamp())
            .ok_or_else(|| DateError::NonexistentLocalTime {
                value: raw.to_owned(),
                zone: zone.name().to_owned(),
            }),
    }
}

/// Seconds east of UTC in effect just before the gap containing `naive`, found by stepping back an
/// hour at a time until the local time exists.
fn offset_before_gap(zone: Tz, naive: &NaiveDateTime) -> Option<i64> {
    (1..=48).find_map(|hours| {
        let earlier = naive.checked_sub_signed(Duration::hours(hours))?;
        zone.from_local_datetime(&earlier)
            .earliest()
            .map(|time| i64::from(time.offset().fix().local_minus_utc()))
    })
}

/// Matches the formats by exact length.
fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    match raw.len() {
        16 => NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%SZ").ok(),
        15 => NaiveDateTime::parse_from_str(raw, "%Y%m%dT%H%M%S").ok(),
        8 => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .ok()?
            .and_hms_opt(0, 0, 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_line;

    fn resolve(line: &str) -> Result<i64, DateError> {
        to_unix(&parse_line(line).unwrap())
    }

    #[test]
    fn utc_date_time() {
        assert_eq!(resolve("DTSTAMP:19700101T000000Z"), Ok(0));
        assert_eq!(resolve("DTSTART:20240515T083000Z"), Ok(1_715_761_800));
    }

    #[test]
    fn floating_date_time_is_utc() {
        assert_eq!(resolve("DTSTART:20240515T083000"), Ok(1_715_761_800));
    }

    #[test]
    fn date_is_midnight() {
        assert_eq!(resolve("DTSTART;VALUE=DATE:20240101"), Ok(1_704_067_200));
    }

    #[test]
    fn named_zone() {
        // CEST is UTC+2.
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm:20240515T083000"),
            Ok(1_715_754_600)
        );
        // Quoted zone names work too.
        assert_eq!(
            resolve(r#"DTSTART;TZID="America/New_York":20240101T000000"#),
            Ok(1_704_085_200)
        );
        // A date in a named zone is local midnight.
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm;VALUE=DATE:20240101"),
            Ok(1_704_063_600)
        );
    }

    #[test]
    fn trailing_z_wins_over_tzid() {
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm:20240515T083000Z"),
            Ok(1_715_761_800)
        );
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        assert_eq!(
            resolve("DTSTART;TZID=W. Europe Standard Time:20240515T083000"),
            Ok(1_715_761_800)
        );
    }

    #[test]
    fn daylight_saving_transitions() {
        // Clocks jumped from 02:00 to 03:00 on 2024-03-31 in Stockholm, so 02:30 is read as
        // 02:30 CET, which is 03:30 CEST.
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm:20240331T023000"),
            Ok(1_711_848_600)
        );
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm:20240331T033000"),
            Ok(1_711_848_600)
        );
        // New York skipped 02:00-03:00 on 2024-03-10; 02:30 EST is 07:30 UTC.
        assert_eq!(
            resolve("DTSTART;TZID=America/New_York:20240310T023000"),
            Ok(1_710_055_800)
        );
        // 02:30 happened twice on 2024-10-27; the first one was still CEST.
        assert_eq!(
            resolve("DTSTART;TZID=Europe/Stockholm:20241027T023000"),
            Ok(1_729_989_000)
        );
    }

    #[test]
    fn errors() {
        assert_eq!(resolve("DTSTART:"), Err(DateError::EmptyValue));
        assert_eq!(
            resolve("DTSTART:2024-01-01"),
            Err(DateError::Unparseable("2024-01-01".to_owned()))
        );
        assert_eq!(
            resolve("DTSTART:20241301"),
            Err(DateError::Unparseable("20241301".to_owned()))
        );
        assert_eq!(
            resolve("DURATION:PT1H"),
            Err(DateError::Unparseable("PT1H".to_owned()))
        );
    }
}
