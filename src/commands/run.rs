use std::time::{Duration, Instant};

use anyhow::Result;
use lockscreen_core::feed::HttpFetcher;
use lockscreen_core::pipeline;
use lockscreen_core::upload::S3Store;

use super::prepare;
use crate::Target;

pub async fn run(target: &Target) -> Result<()> {
    let started = Instant::now();
    let (config, clock) = prepare(target)?;

    let fetcher = HttpFetcher::new(Duration::from_secs(config.behavior.fetch_timeout_secs))?;
    let store = S3Store::from_config(&config.aws).await;

    let report = pipeline::run(&config, &clock, &fetcher, &store).await?;

    // Whole seconds are plenty for a scheduled job
    let elapsed = Duration::from_secs(started.elapsed().as_secs());
    tracing::info!(
        events = report.events.len(),
        shown = report.shown,
        failed_feeds = report.failures.len(),
        "Lockscreen published to {} in {}",
        report.url,
        humantime::format_duration(elapsed)
    );

    Ok(())
}
