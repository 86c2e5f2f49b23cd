//! RRULE expansion for recurring events.
//!
//! Expands a master recurring event into individual instances within a time
//! range, respecting EXDATEs and RECURRENCE-ID overrides from the same feed.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::error::{LockscreenError, LockscreenResult};
use crate::event::{EventTime, FeedEvent};

/// Swap a TZID the rrule crate cannot resolve for the run's timezone.
fn with_known_tzid(time: &EventTime, fallback: Tz) -> EventTime {
    match time {
        EventTime::DateTimeZoned { datetime, tzid } if tzid.parse::<Tz>().is_err() => {
            EventTime::DateTimeZoned {
                datetime: *datetime,
                tzid: fallback.name().to_string(),
            }
        }
        other => other.clone(),
    }
}

/// Format one DTSTART/EXDATE line for the rrule crate parser.
fn rrule_time_line(prop: &str, time: &EventTime) -> String {
    // The rrule crate needs a datetime, so all-day dates become midnight UTC
    // and floating times are carried as UTC; occurrences map back the same way.
    match time {
        EventTime::Date(d) => format!("{prop}:{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!("{prop}:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!("{prop}:{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } => {
            format!("{prop};TZID={tzid}:{}", datetime.format("%Y%m%dT%H%M%S"))
        }
    }
}

/// Build an iCalendar-format RRULE string for the rrule crate parser.
fn build_rrule_string(start: &EventTime, rrule: &str, exdates: &[EventTime], tz: Tz) -> String {
    let mut lines = vec![
        rrule_time_line("DTSTART", start),
        format!("RRULE:{rrule}"),
    ];

    for exdate in exdates {
        lines.push(rrule_time_line("EXDATE", &with_known_tzid(exdate, tz)));
    }

    lines.join("\n")
}

/// Convert an rrule occurrence back to an EventTime matching the master's variant.
fn occurrence_to_event_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.date_naive()),
        EventTime::DateTimeUtc(_) => EventTime::DateTimeUtc(dt.with_timezone(&Utc)),
        EventTime::DateTimeFloating(_) => EventTime::DateTimeFloating(dt.naive_utc()),
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}

/// Instance end, keeping the master's duration and EventTime variant.
fn instance_end(master: &FeedEvent, occurrence: &DateTime<rrule::Tz>, tz: Tz) -> EventTime {
    if let (EventTime::Date(d_start), EventTime::Date(d_end)) = (&master.start, &master.end) {
        let day_diff = (*d_end - *d_start).num_days();
        return EventTime::Date(occurrence.date_naive() + Duration::days(day_diff));
    }

    let duration = master.end.in_timezone(tz) - master.start.in_timezone(tz);

    match &master.start {
        EventTime::DateTimeFloating(_) => {
            EventTime::DateTimeFloating(occurrence.naive_utc() + duration)
        }
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: occurrence.naive_local() + duration,
            tzid: tzid.clone(),
        },
        _ => EventTime::DateTimeUtc(occurrence.with_timezone(&Utc) + duration),
    }
}

/// The wall-clock time of `instant` in `tz`, labelled UTC.
///
/// Date and floating starts reach the rrule crate in this frame.
fn wall_clock_as_utc(instant: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    instant.with_timezone(&tz).naive_local().and_utc()
}

/// Expand a recurring master event into instances starting within
/// [range_start, range_end].
///
/// - `overrides` maps the instant of a RECURRENCE-ID to the override event.
///   An override replaces the generated instance with the same original start
///   and is removed from the map; whatever is left was not consumed.
/// - The master itself is not returned; instances carry `recurrence_id`.
/// - `tz` resolves floating times and TZIDs the tz database does not know.
pub fn expand_recurring_event(
    master: &FeedEvent,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    overrides: &mut HashMap<DateTime<Utc>, FeedEvent>,
    tz: Tz,
) -> LockscreenResult<Vec<FeedEvent>> {
    let recurrence = match &master.recurrence {
        Some(r) => r,
        None => return Ok(Vec::new()),
    };

    let start = with_known_tzid(&master.start, tz);
    let rrule_str = build_rrule_string(&start, &recurrence.rrule, &recurrence.exdates, tz);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        LockscreenError::IcsParse(format!(
            "Failed to parse RRULE for event '{}': {}",
            master.uid, e
        ))
    })?;

    let (range_start, range_end) = match start {
        EventTime::Date(_) | EventTime::DateTimeFloating(_) => (
            wall_clock_as_utc(range_start, tz),
            wall_clock_as_utc(range_end, tz),
        ),
        _ => (range_start, range_end),
    };

    // after/before are exclusive; widen by a second to include the bounds.
    let rrule_tz: rrule::Tz = Utc.into();
    let after = (range_start - Duration::seconds(1)).with_timezone(&rrule_tz);
    let before = (range_end + Duration::seconds(1)).with_timezone(&rrule_tz);

    let result = rrule_set.after(after).before(before).all(366);

    let mut events = Vec::new();

    for occ_dt in &result.dates {
        let occ_start = occurrence_to_event_time(occ_dt, &start);
        let occ_key = occ_start.in_timezone(tz).with_timezone(&Utc);

        if let Some(override_event) = overrides.remove(&occ_key) {
            events.push(override_event);
            continue;
        }

        events.push(FeedEvent {
            uid: master.uid.clone(),
            summary: master.summary.clone(),
            start: occ_start.clone(),
            end: instance_end(master, occ_dt, tz),
            status: master.status.clone(),
            recurrence: None,
            recurrence_id: Some(occ_start),
        });
    }

    Ok(events)
}
