use std::path::Path;

use anyhow::Result;
use lockscreen_core::config::write_sample_config;
use owo_colors::OwoColorize;

pub fn run(path: &Path) -> Result<()> {
    write_sample_config(path)?;

    println!("Wrote {}", path.display().green());
    println!("Add your calendars and bucket, then run `lockscreen preview --output preview.jpg`.");

    Ok(())
}
