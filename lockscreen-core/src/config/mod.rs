//! Run configuration loaded from `config.toml`.
//!
//! Section and key names follow the layout of existing lockscreen config
//! files, so a config written for earlier versions keeps loading unchanged.

mod sample;

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use config::{Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{LockscreenError, LockscreenResult};

pub use sample::{SAMPLE_CONFIG, write_sample_config};

/// Default location, relative to the working directory.
pub static DEFAULT_CONFIG_PATH: &str = "./inputs/config.toml";

/// Prefix for environment overrides, e.g. `LOCKSCREEN_AWS__SECRET_ACCESS_KEY`.
const ENV_PREFIX: &str = "LOCKSCREEN";

const MAX_FONT_SIZE: u32 = 512;
const MAX_PAST_THRESHOLD_HOURS: i64 = 24;

/// Immutable configuration for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub timezone: TimezoneConfig,
    #[serde(default)]
    pub calendars: Vec<CalendarSource>,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    pub aws: AwsConfig,
    #[serde(default)]
    pub output: OutputConfig,

    /// Directory relative paths are resolved against (the config file's directory)
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub backgrounds_folder: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            backgrounds_folder: PathBuf::from("backgrounds"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimezoneConfig {
    pub timezone: Tz,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        TimezoneConfig { timezone: Tz::UTC }
    }
}

/// One iCalendar feed and the colour its events are drawn in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalendarSource {
    pub name: String,
    pub url: String,
    pub text_color: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    /// Glyph cell height in pixels
    pub font_size: u32,
    pub max_title_length: usize,
    pub empty_message: String,
    pub placeholder_color: String,
    /// Prefixes removed from titles before display (e.g. "S: ")
    pub strip_prefixes: Vec<String>,
    pub show_end_time: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        TextConfig {
            font_size: 36,
            max_title_length: 30,
            empty_message: "No events today".to_string(),
            placeholder_color: "white".to_string(),
            strip_prefixes: Vec::new(),
            show_end_time: false,
        }
    }
}

/// Panel geometry. Fractions are of the display size, everything else is pixels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub box_left_margin: f64,
    /// Panel top edge, measured up from the bottom of the display
    pub box_top_position: f64,
    pub box_width: f64,
    pub line_height: u32,
    pub padding: u32,
    pub background_color: String,
    pub background_alpha: f64,
    pub corner_radius: u32,
    pub time_column_offset: u32,
    pub title_column_offset: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            box_left_margin: 0.05,
            box_top_position: 0.55,
            box_width: 0.9,
            line_height: 60,
            padding: 30,
            background_color: "black".to_string(),
            background_alpha: 0.9,
            corner_radius: 15,
            time_column_offset: 20,
            title_column_offset: 150,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub past_event_threshold_hours: i64,
    pub past_event_color: String,
    pub log_level: String,
    pub fetch_timeout_secs: u64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig {
            past_event_threshold_hours: 1,
            past_event_color: "gray".to_string(),
            log_level: "info".to_string(),
            fetch_timeout_secs: 10,
        }
    }
}

/// Upload target.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub object_key: String,
    pub public_read: bool,
    pub cache_control: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        AwsConfig {
            bucket_name: String::new(),
            region: "us-east-1".to_string(),
            access_key_id: None,
            secret_access_key: None,
            object_key: "lockscreen.jpg".to_string(),
            public_read: true,
            cache_control: "max-age=60".to_string(),
        }
    }
}

impl AwsConfig {
    /// Explicit key pair, if both halves are set and non-empty.
    /// Otherwise the SDK's default credential chain applies.
    pub fn static_credentials(&self) -> Option<(&str, &str)> {
        let key = self.access_key_id.as_deref().filter(|k| !k.is_empty())?;
        let secret = self.secret_access_key.as_deref().filter(|s| !s.is_empty())?;
        Some((key, secret))
    }

    /// Predictable public URL of the uploaded object.
    pub fn public_url(&self) -> String {
        crate::upload::s3_public_url(&self.bucket_name, &self.object_key)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { jpeg_quality: 90 }
    }
}

impl Config {
    /// Load and validate a config file, applying `LOCKSCREEN_*` environment overrides.
    pub fn load(path: &Path) -> LockscreenResult<Self> {
        if !path.exists() {
            return Err(LockscreenError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let mut config: Config = config::Config::builder()
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(|e| LockscreenError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| LockscreenError::Config(e.to_string()))?;

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;

        Ok(config)
    }

    /// Parse config from TOML text. Relative paths resolve against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> LockscreenResult<Self> {
        let mut config: Config = config::Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .map_err(|e| LockscreenError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| LockscreenError::Config(e.to_string()))?;

        config.base_dir = base_dir.to_path_buf();
        config.validate()?;

        Ok(config)
    }

    pub fn tz(&self) -> Tz {
        self.timezone.timezone
    }

    /// Background folder with `~` expanded and relative paths resolved.
    pub fn backgrounds_dir(&self) -> PathBuf {
        let expanded =
            shellexpand::tilde(&self.paths.backgrounds_folder.to_string_lossy()).into_owned();
        let path = PathBuf::from(expanded);

        if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        }
    }

    fn validate(&self) -> LockscreenResult<()> {
        let invalid = |msg: String| Err(LockscreenError::Config(msg));

        if self.display.width_px == 0 || self.display.height_px == 0 {
            return invalid(format!(
                "display size must be positive, got {}x{}",
                self.display.width_px, self.display.height_px
            ));
        }

        for cal in &self.calendars {
            if cal.name.trim().is_empty() {
                return invalid("calendar name must not be empty".into());
            }
            if cal.url.trim().is_empty() {
                return invalid(format!("calendar '{}' has no url", cal.name));
            }
        }

        let fractions = [
            ("layout.box_left_margin", self.layout.box_left_margin),
            ("layout.box_top_position", self.layout.box_top_position),
            ("layout.box_width", self.layout.box_width),
            ("layout.background_alpha", self.layout.background_alpha),
        ];
        for (key, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{key} must be between 0 and 1, got {value}"));
            }
        }

        if self.aws.bucket_name.trim().is_empty() {
            return invalid("aws.bucket_name must be set".into());
        }
        if self.aws.object_key.trim().is_empty() {
            return invalid("aws.object_key must not be empty".into());
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return invalid(format!(
                "output.jpeg_quality must be between 1 and 100, got {}",
                self.output.jpeg_quality
            ));
        }

        let height = self.display.height_px;
        if !(1..=height).contains(&self.layout.line_height) {
            return invalid(format!(
                "layout.line_height must be between 1 and the display height ({height}), got {}",
                self.layout.line_height
            ));
        }
        if self.layout.padding > height {
            return invalid(format!(
                "layout.padding must not exceed the display height ({height}), got {}",
                self.layout.padding
            ));
        }
        if !(1..=MAX_FONT_SIZE).contains(&self.text.font_size) {
            return invalid(format!(
                "text.font_size must be between 1 and {MAX_FONT_SIZE}, got {}",
                self.text.font_size
            ));
        }
        if !(0..=MAX_PAST_THRESHOLD_HOURS).contains(&self.behavior.past_event_threshold_hours) {
            return invalid(format!(
                "behavior.past_event_threshold_hours must be between 0 and {MAX_PAST_THRESHOLD_HOURS}, got {}",
                self.behavior.past_event_threshold_hours
            ));
        }

        Ok(())
    }
}
