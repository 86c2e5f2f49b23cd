//! One lockscreen run: fetch, select, render, encode, put.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::background::load_background;
use crate::config::Config;
use crate::date_range::{DayWindow, resolve_local};
use crate::error::LockscreenResult;
use crate::event::Event;
use crate::feed::{FeedFailure, FeedFetcher, fetch_todays_events};
use crate::render::{Rendered, encode_jpeg, render_lockscreen};
use crate::upload::{JPEG_CONTENT_TYPE, ObjectStore};

/// The day being rendered and the instant used for past-event colouring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub today: NaiveDate,
    pub now: DateTime<Tz>,
}

impl Clock {
    /// Current time in `tz`.
    pub fn system(tz: Tz) -> Self {
        let now = Utc::now().with_timezone(&tz);
        Clock {
            today: now.date_naive(),
            now,
        }
    }

    /// Fixed to local midnight of `date`.
    pub fn pinned(date: NaiveDate, tz: Tz) -> Self {
        Clock {
            today: date,
            now: resolve_local(tz, date.and_time(NaiveTime::MIN)),
        }
    }
}

/// The composed image for a day, before it is stored anywhere.
#[derive(Debug, Clone)]
pub struct Composed {
    pub background: PathBuf,
    pub rendered: Rendered,
    pub jpeg: Vec<u8>,
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub date: NaiveDate,
    pub events: Vec<Event>,
    pub shown: usize,
    pub hidden: usize,
    pub failures: Vec<FeedFailure>,
    pub background: PathBuf,
    pub key: String,
    pub url: String,
    pub bytes: usize,
}

/// Pick the background and render `events` over it as JPEG.
pub fn compose(config: &Config, clock: &Clock, events: &[Event]) -> LockscreenResult<Composed> {
    let background = load_background(
        &config.backgrounds_dir(),
        clock.today,
        config.display.width_px,
        config.display.height_px,
    )?;

    let rendered = render_lockscreen(config, &background.image, events, clock.now)?;
    let jpeg = encode_jpeg(&rendered.image, config.output.jpeg_quality)?;

    Ok(Composed {
        background: background.path,
        rendered,
        jpeg,
    })
}

/// Run the whole pipeline for `clock.today` and put the image under `aws.object_key`.
///
/// Feed failures are logged and reported; any error returned here is fatal
/// for the run.
pub async fn run<F: FeedFetcher, S: ObjectStore>(
    config: &Config,
    clock: &Clock,
    fetcher: &F,
    store: &S,
) -> LockscreenResult<RunReport> {
    let window = DayWindow::for_date(clock.today, config.tz());

    tracing::info!("Fetching events for {}", clock.today);
    let outcome = fetch_todays_events(&config.calendars, &window, fetcher).await;
    tracing::info!("Found {} events for today", outcome.events.len());

    if !outcome.failures.is_empty() {
        tracing::warn!(
            "{} of {} calendars could not be read",
            outcome.failures.len(),
            config.calendars.len()
        );
    }

    let composed = compose(config, clock, &outcome.events)?;

    let key = config.aws.object_key.clone();
    let bytes = composed.jpeg.len();
    store.put(&key, composed.jpeg, JPEG_CONTENT_TYPE).await?;
    let url = store.url_for(&key);
    tracing::info!(bytes, "Uploaded lockscreen to {}", url);

    Ok(RunReport {
        date: clock.today,
        events: outcome.events,
        shown: composed.rendered.shown,
        hidden: composed.rendered.hidden,
        failures: outcome.failures,
        background: composed.background,
        key,
        url,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Australia::Brisbane;

    #[test]
    fn test_pinned_clock_is_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        let clock = Clock::pinned(date, Brisbane);

        assert_eq!(clock.today, date);
        assert_eq!(clock.now.date_naive(), date);
        assert_eq!(clock.now.hour(), 0);
        assert_eq!(clock.now.timezone(), Brisbane);
    }

    #[test]
    fn test_system_clock_today_matches_now() {
        let clock = Clock::system(Brisbane);
        assert_eq!(clock.today, clock.now.date_naive());
    }
}
