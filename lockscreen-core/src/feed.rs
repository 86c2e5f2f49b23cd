//! Calendar feed fetching.
//!
//! Downloads each configured feed, expands recurrences and keeps the
//! occurrences that start on the rendered day. A feed that cannot be fetched
//! or parsed is recorded as a failure and skipped; the other feeds still count.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::config::CalendarSource;
use crate::date_range::DayWindow;
use crate::error::{LockscreenError, LockscreenResult};
use crate::event::{Event, FeedEvent, sort_events};
use crate::ics::parse_feed;
use crate::recurrence::expand_recurring_event;

/// Source of raw feed bytes.
#[allow(async_fn_in_trait)]
pub trait FeedFetcher {
    async fn fetch(&self, url: &str) -> LockscreenResult<Vec<u8>>;
}

/// Fetches `http(s)://` and `webcal://` feeds over HTTP and `file://` feeds from disk.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> LockscreenResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lockscreen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LockscreenError::Fetch(format!("Could not build HTTP client: {e}")))?;

        Ok(HttpFetcher { client })
    }
}

impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> LockscreenResult<Vec<u8>> {
        if let Some(path) = url.strip_prefix("file://") {
            return tokio::fs::read(path)
                .await
                .map_err(|e| LockscreenError::Fetch(format!("{path}: {e}")));
        }

        let url = normalize_feed_url(url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LockscreenError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| LockscreenError::Fetch(e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| LockscreenError::Fetch(e.to_string()))?;

        Ok(body.to_vec())
    }
}

/// `webcal://` is plain HTTPS with a calendar-app URL scheme.
pub fn normalize_feed_url(url: &str) -> String {
    match url.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// A calendar whose events are missing from this run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedFailure {
    pub calendar: String,
    pub message: String,
}

/// Events for the day, plus the feeds that were skipped.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub events: Vec<Event>,
    pub failures: Vec<FeedFailure>,
}

/// Fetch every source in config order and collect today's events, sorted for display.
pub async fn fetch_todays_events<F: FeedFetcher>(
    sources: &[CalendarSource],
    window: &DayWindow,
    fetcher: &F,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for (index, source) in sources.iter().enumerate() {
        tracing::debug!(calendar = %source.name, url = %source.url, "Downloading calendar");

        match fetch_source(source, index, window, fetcher).await {
            Ok(events) => {
                tracing::info!(
                    calendar = %source.name,
                    events = events.len(),
                    "Fetched calendar"
                );
                outcome.events.extend(events);
            }
            Err(e) => {
                tracing::error!(calendar = %source.name, error = %e, "Error fetching calendar");
                outcome.failures.push(FeedFailure {
                    calendar: source.name.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    sort_events(&mut outcome.events);
    outcome
}

async fn fetch_source<F: FeedFetcher>(
    source: &CalendarSource,
    index: usize,
    window: &DayWindow,
    fetcher: &F,
) -> LockscreenResult<Vec<Event>> {
    let bytes = fetcher.fetch(&source.url).await?;
    let content = String::from_utf8_lossy(&bytes);
    let feed_events = parse_feed(&content)?;

    let tz = window.tz();
    let events = occurrences_in_window(feed_events, window)
        .into_iter()
        .map(|fe| Event {
            title: fe.summary,
            start: fe.start.in_timezone(tz),
            end: fe.end.in_timezone(tz),
            all_day: fe.start.is_all_day(),
            calendar: source.name.clone(),
            color: source.text_color.clone(),
            source_index: index,
        })
        .collect();

    Ok(events)
}

/// Concrete, non-cancelled occurrences whose start falls in `window`.
pub fn occurrences_in_window(feed_events: Vec<FeedEvent>, window: &DayWindow) -> Vec<FeedEvent> {
    let tz = window.tz();
    let (from, to) = (window.start_utc(), window.end_utc());

    let mut masters = Vec::new();
    let mut singles = Vec::new();
    let mut overrides: HashMap<String, HashMap<DateTime<Utc>, FeedEvent>> = HashMap::new();

    for event in feed_events {
        if event.recurrence.is_some() {
            masters.push(event);
        } else if let Some(recurrence_id) = &event.recurrence_id {
            let key = instant(recurrence_id, tz);
            overrides
                .entry(event.uid.clone())
                .or_default()
                .insert(key, event);
        } else {
            singles.push(event);
        }
    }

    let mut occurrences = singles;

    for master in &masters {
        let master_overrides = overrides.entry(master.uid.clone()).or_default();
        match expand_recurring_event(master, from, to, master_overrides, tz) {
            Ok(instances) => occurrences.extend(instances),
            Err(e) => tracing::warn!(uid = %master.uid, error = %e, "Skipping recurring event"),
        }
    }

    // Overrides no expansion consumed: orphans, instances moved onto this day
    // from another one, and RECURRENCE-IDs the rule never generates. They
    // stand on their own start time.
    occurrences.extend(overrides.into_values().flat_map(HashMap::into_values));

    occurrences
        .into_iter()
        .filter(|e| !e.is_cancelled())
        .filter(|e| window.contains(&e.start.in_timezone(tz)))
        .collect()
}

fn instant(time: &crate::event::EventTime, tz: Tz) -> DateTime<Utc> {
    time.in_timezone(tz).with_timezone(&Utc)
}
