//! iCalendar (RFC 5545) documents into an [`EventCollection`].
//!
//! Uses the `icalendar` crate's parser (unfold, then `read_calendar`). A stream
//! may hold several `VCALENDAR` objects back to back; each is parsed on its own
//! and every top-level component of each becomes one record; `VTIMEZONE`
//! definitions are not records and are skipped. Components nested inside a
//! record (`VALARM` inside `VEVENT`) are ignored.
//!
//! Time values are normalized to UTC:
//!
//! - `...Z` values are taken as-is.
//! - `TZID=` values are resolved with `chrono-tz`. A zone the database does
//!   not know leaves the field missing, which excludes the record. A local
//!   time skipped by a DST transition uses the offset in force before the gap
//!   (RFC 5545 §3.3.5); a repeated one takes the earlier instant.
//! - Floating values are read as UTC.
//! - `DATE` values start at 00:00 UTC on that date.

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::{CalendarDateTime, DatePerhapsTime};

use crate::error::{GateError, Result};
use crate::event::{CalendarEvent, EventCollection, RecordKind};

/// Parse raw calendar bytes. The document must be UTF-8; a leading byte-order
/// mark is ignored.
///
/// # Errors
/// Returns `GateError::InvalidCalendar` if the bytes are not UTF-8 or the
/// document cannot be parsed.
pub fn parse_calendar_bytes(bytes: &[u8]) -> Result<EventCollection> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| GateError::InvalidCalendar(format!("not UTF-8: {}", e)))?;
    parse_calendar(content)
}

/// Parse an iCalendar document into its records, keyed by uid.
///
/// Records without a `UID` get a synthetic `<kind>-<index>` key. Recurrence
/// overrides (records carrying `RECURRENCE-ID`) are keyed `<uid>/<recurrence-id>`
/// so they do not replace the master record.
///
/// # Errors
/// Returns `GateError::InvalidCalendar` if the document is not a
/// `VCALENDAR` or the parser rejects it.
pub fn parse_calendar(content: &str) -> Result<EventCollection> {
    let content = content.trim_start_matches('\u{feff}');
    let unfolded = unfold(content);

    let calendars = split_calendars(&unfolded)?
        .into_iter()
        .map(|block| read_calendar(block).map_err(|e| GateError::InvalidCalendar(e.to_string())))
        .collect::<Result<Vec<_>>>()?;

    let mut records = Vec::new();
    for calendar in &calendars {
        collect_records(&calendar.components, &mut records);
    }

    let mut collection = EventCollection::new();
    for (index, component) in records.into_iter().enumerate() {
        let (uid, event) = to_record(component, index);
        if collection.insert(uid.clone(), event).is_some() {
            tracing::debug!(uid = %uid, "duplicate uid in calendar, keeping the later record");
        }
    }

    tracing::debug!(records = collection.len(), "parsed calendar");
    Ok(collection)
}

/// Split an unfolded stream into its `BEGIN:VCALENDAR` .. `END:VCALENDAR`
/// blocks. Blank lines between blocks are allowed; any other text outside a
/// block is an error.
fn split_calendars(document: &str) -> Result<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut open: Option<usize> = None;
    let mut offset = 0;

    for line in document.split_inclusive('\n') {
        let trimmed = line.trim();
        match open {
            None if trimmed.eq_ignore_ascii_case("BEGIN:VCALENDAR") => open = Some(offset),
            None if trimmed.is_empty() => {}
            None => {
                return Err(GateError::InvalidCalendar(if blocks.is_empty() {
                    "document does not begin with BEGIN:VCALENDAR".to_string()
                } else {
                    format!("unexpected content after END:VCALENDAR: {}", trimmed)
                }));
            }
            Some(begin) if trimmed.eq_ignore_ascii_case("END:VCALENDAR") => {
                blocks.push(&document[begin..offset + line.len()]);
                open = None;
            }
            Some(_) => {}
        }
        offset += line.len();
    }

    if open.is_some() {
        return Err(GateError::InvalidCalendar(
            "document does not end with END:VCALENDAR".to_string(),
        ));
    }
    if blocks.is_empty() {
        return Err(GateError::InvalidCalendar(
            "document does not begin with BEGIN:VCALENDAR".to_string(),
        ));
    }
    Ok(blocks)
}

/// Flatten the record components, descending through any `VCALENDAR` wrapper.
fn collect_records<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        let name: &str = component.name.as_ref();
        if name.eq_ignore_ascii_case("VCALENDAR") {
            collect_records(&component.components, out);
        } else if !name.eq_ignore_ascii_case("VTIMEZONE") {
            out.push(component);
        }
    }
}

fn to_record(component: &Component<'_>, index: usize) -> (String, CalendarEvent) {
    let kind = RecordKind::from_component_name(component.name.as_ref());

    let mut uid = component
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.trim().is_empty())
        .unwrap_or_else(|| format!("{}-{}", kind, index));
    if let Some(recurrence_id) = component.find_prop("RECURRENCE-ID") {
        uid = format!("{}/{}", uid, recurrence_id.val);
    }

    let summary = component
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .unwrap_or_default();

    let dtstart = date_perhaps_time(component, "DTSTART");
    let start = dtstart.clone().and_then(to_utc);
    let end = match ["DTEND", "DUE"]
        .into_iter()
        .find(|name| component.find_prop(*name).is_some())
    {
        Some(name) => date_perhaps_time(component, name).and_then(to_utc),
        None => implied_end(component, &kind, dtstart, start),
    };

    let last_modified = date_perhaps_time(component, "LAST-MODIFIED").and_then(to_utc);

    let event = CalendarEvent {
        summary,
        start,
        end,
        kind,
        last_modified,
    };
    (uid, event)
}

/// The end of a record that has no `DTEND`/`DUE`.
///
/// `DURATION` is added to the start when present. Otherwise an all-day event
/// lasts one day and a timed event ends at its start (RFC 5545 §3.6.1).
fn implied_end(
    component: &Component<'_>,
    kind: &RecordKind,
    dtstart: Option<DatePerhapsTime>,
    start: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    let start = start?;

    if let Some(prop) = component.find_prop("DURATION") {
        return parse_duration(prop.val.as_ref()).and_then(|d| start.checked_add_signed(d));
    }

    if !kind.is_event() {
        return None;
    }

    match dtstart? {
        DatePerhapsTime::Date(_) => start.checked_add_signed(TimeDelta::days(1)),
        DatePerhapsTime::DateTime(_) => Some(start),
    }
}

fn date_perhaps_time(component: &Component<'_>, name: &str) -> Option<DatePerhapsTime> {
    let prop = component.find_prop(name)?;
    match DatePerhapsTime::try_from(prop) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(property = name, value = %prop.val, "unreadable time value");
            None
        }
    }
}

fn to_utc(value: DatePerhapsTime) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => Some(naive.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz: Tz = match tzid.trim_matches('"').trim_start_matches('/').parse() {
                Ok(tz) => tz,
                Err(_) => {
                    tracing::debug!(tzid = %tzid, "unknown timezone, dropping time value");
                    return None;
                }
            };
            resolve_local(tz, date_time)
        }
    }
}

/// Map a wall-clock time in `tz` to UTC.
///
/// A repeated local time (DST fall-back) takes the earlier instant. A skipped
/// one (DST spring-forward) is read with the offset in force before the gap,
/// so 02:30 on a day New York jumps from 02:00 to 03:00 is 07:30Z.
fn resolve_local(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => Some(dt.with_timezone(&Utc)),
        LocalResult::None => {
            let before_gap = (1..=48)
                .filter_map(|hours| local.checked_sub_signed(TimeDelta::hours(hours)))
                .find_map(|earlier| tz.from_local_datetime(&earlier).latest())?;
            let offset = TimeDelta::seconds(i64::from(before_gap.offset().fix().local_minus_utc()));
            local.checked_sub_signed(offset).map(|utc| utc.and_utc())
        }
    }
}

/// Parse an RFC 5545 duration (`PT1H30M`, `P1D`, `-PT15M`).
fn parse_duration(value: &str) -> Option<TimeDelta> {
    let value = value.trim();
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.trim_start_matches('+')),
    };

    let std_duration: std::time::Duration = iso8601::duration(body).ok()?.into();
    let delta = TimeDelta::from_std(std_duration).ok()?;
    Some(if negative { -delta } else { delta })
}
