pub mod init;
pub mod preview;
pub mod run;

use anyhow::{Context, Result};
use lockscreen_core::{Clock, Config};

use crate::Target;
use crate::logging;

/// Load the config, start logging at its level and fix the day to render.
pub fn prepare(target: &Target) -> Result<(Config, Clock)> {
    let config = Config::load(&target.config)
        .with_context(|| format!("Could not load {}", target.config.display()))?;
    logging::init(Some(&config.behavior.log_level));

    let tz = config.tz();
    let clock = match target.date {
        Some(date) => Clock::pinned(date, tz),
        None => Clock::system(tz),
    };
    tracing::info!("Starting lockscreen generation for {} ({})", clock.today, tz);

    Ok((config, clock))
}
