//! Event types.
//!
//! `FeedEvent` is a VEVENT as read from an iCalendar feed, with its times in
//! whatever form the feed used. `Event` is what the renderer draws: one
//! concrete occurrence on the rendered day, in the run's timezone, tagged
//! with the calendar it came from.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::date_range::resolve_local;

/// A point in time as written in an iCalendar feed.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTime {
    /// All-day (VALUE=DATE)
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    /// No timezone; read as local time of the run's timezone
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Resolve to an instant in `tz`.
    ///
    /// Dates become local midnight. Floating times and TZIDs that are not
    /// IANA names (e.g. Windows zone names) are read as wall-clock time in `tz`.
    pub fn in_timezone(&self, tz: Tz) -> DateTime<Tz> {
        match self {
            EventTime::Date(d) => resolve_local(tz, d.and_time(NaiveTime::MIN)),
            EventTime::DateTimeUtc(dt) => dt.with_timezone(&tz),
            EventTime::DateTimeFloating(dt) => resolve_local(tz, *dt),
            EventTime::DateTimeZoned { datetime, tzid } => match tzid.parse::<Tz>() {
                Ok(event_tz) => resolve_local(event_tz, *datetime).with_timezone(&tz),
                Err(_) => resolve_local(tz, *datetime),
            },
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%dT%H:%M:%S"), tzid)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// RRULE and EXDATEs of a recurring master event.
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// A VEVENT read from a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub uid: String,
    pub summary: String,
    pub start: EventTime,
    pub end: EventTime,
    pub status: EventStatus,
    pub recurrence: Option<Recurrence>,
    /// Set on instance overrides of a recurring event
    pub recurrence_id: Option<EventTime>,
}

impl FeedEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }
}

/// One occurrence on the rendered day.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub title: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub all_day: bool,
    /// Name of the calendar source
    pub calendar: String,
    /// Colour string of the calendar source, as configured
    pub color: String,
    /// Position of the calendar source in the config, for stable ordering
    pub source_index: usize,
}

impl Event {
    /// "HH:MM" of the local start time
    pub fn start_label(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    /// "HH:MM-HH:MM" of the local start and end times
    pub fn range_label(&self) -> String {
        format!("{}-{}", self.start_label(), self.end.format("%H:%M"))
    }

    /// All-day by declaration, or a timed event spanning midnight to midnight.
    pub fn is_all_day(&self) -> bool {
        self.all_day || (self.start.time() == NaiveTime::MIN && self.end.time() == NaiveTime::MIN)
    }
}

/// Display order: start time, then calendar order, then title.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(a.source_index.cmp(&b.source_index))
            .then_with(|| a.title.cmp(&b.title))
    });
}
