use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use lockscreen_core::feed::HttpFetcher;
use lockscreen_core::pipeline;
use lockscreen_core::upload::DirStore;
use owo_colors::OwoColorize;

use super::prepare;
use crate::Target;

/// Same as `run`, but the JPEG lands at `output` instead of in S3.
pub async fn run(target: &Target, output: &Path) -> Result<()> {
    let (mut config, clock) = prepare(target)?;

    let file_name = output
        .file_name()
        .with_context(|| format!("{} is not a file path", output.display()))?;
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    config.aws.object_key = file_name.to_string_lossy().into_owned();

    let fetcher = HttpFetcher::new(Duration::from_secs(config.behavior.fetch_timeout_secs))?;
    let store = DirStore::new(dir);

    let report = pipeline::run(&config, &clock, &fetcher, &store).await?;

    println!("{}", output.display().green());
    println!(
        "   {} events, {} shown, background {}",
        report.events.len(),
        report.shown,
        report.background.display().dimmed()
    );
    for failure in &report.failures {
        println!("   {} {}", failure.calendar.red(), failure.message);
    }

    Ok(())
}
