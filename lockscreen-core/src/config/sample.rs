//! Sample config written by `lockscreen init`.

use std::path::Path;

use crate::error::{LockscreenError, LockscreenResult};

pub static SAMPLE_CONFIG: &str = r##"# lockscreen configuration

[display]
# iPhone 15 Pro Max / 16 Plus
width_px = 1290
height_px = 2796

[paths]
# Relative to this file's directory
backgrounds_folder = "backgrounds"

[timezone]
timezone = "Australia/Brisbane"

[[calendars]]
name = "personal"
url = "https://calendar.example.com/personal.ics"
text_color = "green"

[[calendars]]
name = "work"
url = "webcal://calendar.example.com/work.ics"
text_color = "red"

[text]
font_size = 36
max_title_length = 30
# empty_message = "No events today"
# strip_prefixes = ["S: ", "D: "]
# show_end_time = false

[layout]
box_left_margin = 0.05
# Top edge of the panel, measured up from the bottom of the screen
box_top_position = 0.55
box_width = 0.9
line_height = 60
padding = 30
background_alpha = 0.9
# background_color = "black"
# corner_radius = 15

[behavior]
past_event_threshold_hours = 1
log_level = "info"
# fetch_timeout_secs = 10

[aws]
bucket_name = "my-lockscreen-bucket"
region = "us-east-1"
# Leave unset to use the standard AWS credential chain
# access_key_id = ""
# secret_access_key = ""
# object_key = "lockscreen.jpg"
"##;

/// Write the sample config to `path`, refusing to overwrite an existing file.
pub fn write_sample_config(path: &Path) -> LockscreenResult<()> {
    if path.exists() {
        return Err(LockscreenError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            LockscreenError::Config(format!("Could not create config directory: {e}"))
        })?;
    }

    std::fs::write(path, SAMPLE_CONFIG)
        .map_err(|e| LockscreenError::Config(format!("Could not write config file: {e}")))?;

    Ok(())
}
