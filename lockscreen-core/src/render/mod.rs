//! Lockscreen composition: event panel over the day's background.

mod canvas;
mod color;

use chrono::{DateTime, Duration, Timelike};
use chrono_tz::Tz;
use embedded_graphics::mono_font::iso_8859_1::{FONT_9X18, FONT_9X18_BOLD};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, RoundedRectangle};
use embedded_graphics::text::{Baseline, Text};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};

use crate::config::{Config, TextConfig};
use crate::error::{LockscreenError, LockscreenResult};
use crate::event::Event;

use canvas::Canvas;
pub use color::parse_color;

/// Pixel height of the built-in fonts at scale 1.
const BASE_FONT_HEIGHT: u32 = 18;

const ELLIPSIS: &str = "...";

/// One line of the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Empty for all-day events and the placeholder
    pub time: String,
    pub title: String,
    pub color: Rgb888,
}

/// A composed lockscreen and how many rows made it onto the panel.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub image: RgbaImage,
    pub shown: usize,
    pub hidden: usize,
}

/// Turn the day's events into panel rows.
///
/// All-day events come first. Timed events that started before the past
/// cutoff are coloured with `behavior.past_event_color`. With no events the
/// single row is the placeholder message.
pub fn build_rows(events: &[Event], config: &Config, now: DateTime<Tz>) -> LockscreenResult<Vec<Row>> {
    if events.is_empty() {
        return Ok(vec![Row {
            time: String::new(),
            title: config.text.empty_message.clone(),
            color: parse_color(&config.text.placeholder_color)?,
        }]);
    }

    let past_color = parse_color(&config.behavior.past_event_color)?;
    let cutoff = past_cutoff(now, config.behavior.past_event_threshold_hours);

    let (all_day, timed): (Vec<&Event>, Vec<&Event>) =
        events.iter().partition(|event| event.is_all_day());

    all_day
        .into_iter()
        .chain(timed)
        .map(|event| {
            let source_color = parse_color(&event.color)?;
            let all_day = event.is_all_day();

            let time = if all_day {
                String::new()
            } else if config.text.show_end_time {
                event.range_label()
            } else {
                event.start_label()
            };

            Ok(Row {
                time,
                title: clean_title(&event.title, &config.text),
                color: if !all_day && event.start <= cutoff {
                    past_color
                } else {
                    source_color
                },
            })
        })
        .collect()
}

/// Start of the current hour, minus `threshold_hours`.
fn past_cutoff(now: DateTime<Tz>, threshold_hours: i64) -> DateTime<Tz> {
    let hour_start = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    Duration::try_hours(threshold_hours)
        .and_then(|threshold| hour_start.checked_sub_signed(threshold))
        .unwrap_or(hour_start)
}

/// Strip configured prefixes (in order), then truncate to `max_title_length`.
pub fn clean_title(title: &str, text: &TextConfig) -> String {
    let mut title = title.trim();
    for prefix in &text.strip_prefixes {
        if let Some(rest) = title.strip_prefix(prefix.as_str()) {
            title = rest.trim_start();
        }
    }

    truncate_title(title, text.max_title_length)
}

/// Cut to at most `max_chars` characters, ending in "..." when shortened.
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }

    if max_chars <= ELLIPSIS.len() {
        return title.chars().take(max_chars).collect();
    }

    let kept: String = title.chars().take(max_chars - ELLIPSIS.len()).collect();
    format!("{}{ELLIPSIS}", kept.trim_end())
}

/// Panel placement in image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PanelLayout {
    left: u32,
    top: u32,
    width: u32,
    padding: u32,
    line_height: u32,
    /// Rows that fit between the panel top and the image bottom
    capacity: usize,
}

impl PanelLayout {
    fn compute(config: &Config) -> LockscreenResult<Self> {
        let (width, height) = (config.display.width_px, config.display.height_px);
        let layout = &config.layout;

        let left = (f64::from(width) * layout.box_left_margin).round() as u32;
        let panel_width = ((f64::from(width) * layout.box_width).round() as u32)
            .min(width.saturating_sub(left));
        // box_top_position is the fraction of the height above the bottom edge
        let top = ((f64::from(height) * (1.0 - layout.box_top_position)).round() as u32).min(height);

        let room = (height - top).saturating_sub(layout.padding.saturating_mul(2));
        let capacity = (room / layout.line_height) as usize;

        if capacity == 0 {
            return Err(LockscreenError::Render(format!(
                "panel at {top}px has no room for a {}px row",
                layout.line_height
            )));
        }

        Ok(PanelLayout {
            left,
            top,
            width: panel_width,
            padding: layout.padding,
            line_height: layout.line_height,
            capacity,
        })
    }

    fn rect(&self, rows: usize) -> Rectangle {
        Rectangle::new(
            Point::new(self.left as i32, self.top as i32),
            Size::new(
                self.width,
                (rows as u32)
                    .saturating_mul(self.line_height)
                    .saturating_add(self.padding.saturating_mul(2)),
            ),
        )
    }

    fn row_top(&self, index: usize) -> i32 {
        let offset = (index as u32).saturating_mul(self.line_height);
        i32::try_from(self.top.saturating_add(self.padding).saturating_add(offset)).unwrap_or(i32::MAX)
    }
}

fn font_scale(font_size: u32) -> u32 {
    ((f64::from(font_size) / f64::from(BASE_FONT_HEIGHT)).round() as u32).max(1)
}

fn draw_text(
    image: &mut RgbaImage,
    clip: Rectangle,
    origin: Point,
    scale: u32,
    text: &str,
    font: &MonoFont<'_>,
    color: Rgb888,
) {
    if text.is_empty() {
        return;
    }

    let mut canvas = Canvas::new(image)
        .with_clip(clip)
        .with_offset(origin)
        .with_scale(scale);
    let style = MonoTextStyle::new(font, color);

    let Ok(_) = Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut canvas);
}

/// Compose the lockscreen for `events` over an already cropped `background`.
///
/// Output depends only on the arguments, so equal inputs give identical pixels.
pub fn render_lockscreen(
    config: &Config,
    background: &RgbaImage,
    events: &[Event],
    now: DateTime<Tz>,
) -> LockscreenResult<Rendered> {
    let expected = (config.display.width_px, config.display.height_px);
    if background.dimensions() != expected {
        return Err(LockscreenError::Render(format!(
            "background is {}x{}, expected {}x{}",
            background.width(),
            background.height(),
            expected.0,
            expected.1
        )));
    }

    let rows = build_rows(events, config, now)?;
    let panel_color = parse_color(&config.layout.background_color)?;
    let layout = PanelLayout::compute(config)?;

    let shown = rows.len().min(layout.capacity);
    let hidden = rows.len() - shown;
    if hidden > 0 {
        tracing::warn!(
            "Panel fits {} rows, dropping the last {} events",
            shown,
            hidden
        );
    }

    let mut image = background.clone();
    let panel = layout.rect(shown);
    let radius = config
        .layout
        .corner_radius
        .min(panel.size.width / 2)
        .min(panel.size.height / 2);

    let mut panel_canvas =
        Canvas::new(&mut image).with_opacity(config.layout.background_alpha as f32);
    let Ok(()) = RoundedRectangle::with_equal_corners(panel, Size::new(radius, radius))
        .into_styled(PrimitiveStyle::with_fill(panel_color))
        .draw(&mut panel_canvas);

    let scale = font_scale(config.text.font_size);
    let char_width = FONT_9X18.character_size.width.saturating_mul(scale);
    let glyph_height = FONT_9X18.character_size.height.saturating_mul(scale);

    // Keep longer time labels (start-end) clear of the title column.
    let longest_time = rows[..shown]
        .iter()
        .map(|row| row.time.chars().count() as u32)
        .max()
        .unwrap_or(0);
    let time_x = config.layout.time_column_offset;
    let title_x = if longest_time == 0 {
        config.layout.title_column_offset
    } else {
        config
            .layout
            .title_column_offset
            .max(time_x.saturating_add((longest_time + 1).saturating_mul(char_width)))
    };

    let title_room = layout.width.saturating_sub(title_x.saturating_add(time_x)) / char_width;
    let column_x = |offset: u32| i32::try_from(layout.left.saturating_add(offset)).unwrap_or(i32::MAX);
    let text_inset = (layout.line_height as i32 - glyph_height as i32) / 2;

    for (index, row) in rows[..shown].iter().enumerate() {
        let y = layout.row_top(index).saturating_add(text_inset);
        let title = truncate_title(&row.title, title_room as usize);

        draw_text(
            &mut image,
            panel,
            Point::new(column_x(time_x), y),
            scale,
            &row.time,
            &FONT_9X18_BOLD,
            row.color,
        );
        draw_text(
            &mut image,
            panel,
            Point::new(column_x(title_x), y),
            scale,
            &title,
            &FONT_9X18,
            row.color,
        );
    }

    tracing::info!(
        "Rendered {}x{} lockscreen with {} rows",
        expected.0,
        expected.1,
        shown
    );

    Ok(Rendered {
        image,
        shown,
        hidden,
    })
}

/// Encode as baseline JPEG at `quality` (1-100).
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> LockscreenResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).into_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(&rgb)?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Australia::Brisbane;
    use image::Rgba;
    use std::path::Path;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn small_config() -> Config {
        let toml = r#"
[display]
width_px = 200
height_px = 300

[timezone]
timezone = "Australia/Brisbane"

[text]
font_size = 18
max_title_length = 12

[layout]
box_left_margin = 0.1
box_top_position = 0.5
box_width = 0.8
line_height = 20
padding = 10
corner_radius = 4
time_column_offset = 5
title_column_offset = 60

[aws]
bucket_name = "test-bucket"
"#;
        Config::from_toml_str(toml, Path::new(".")).unwrap()
    }

    fn event(title: &str, hour: u32, color: &str) -> Event {
        let start = Brisbane.with_ymd_and_hms(2025, 9, 26, hour, 0, 0).unwrap();
        Event {
            title: title.to_string(),
            start,
            end: start + Duration::hours(1),
            all_day: false,
            calendar: "test".to_string(),
            color: color.to_string(),
            source_index: 0,
        }
    }

    fn all_day(title: &str) -> Event {
        let start = Brisbane.with_ymd_and_hms(2025, 9, 26, 0, 0, 0).unwrap();
        Event {
            all_day: true,
            end: start + Duration::days(1),
            start,
            ..event(title, 0, "blue")
        }
    }

    fn morning() -> DateTime<Tz> {
        Brisbane.with_ymd_and_hms(2025, 9, 26, 0, 0, 0).unwrap()
    }

    fn white_background(config: &Config) -> RgbaImage {
        RgbaImage::from_pixel(config.display.width_px, config.display.height_px, WHITE)
    }

    #[test]
    fn test_truncate_title() {
        assert_eq!(truncate_title("Standup", 30), "Standup");
        assert_eq!(truncate_title("Quarterly planning review", 12), "Quarterly...");
        assert_eq!(truncate_title("Board meeting", 8), "Board...");
        assert_eq!(truncate_title("Standup", 2), "St");
    }

    #[test]
    fn test_clean_title_strips_prefixes() {
        let mut text = small_config().text;
        text.strip_prefixes = vec!["S:".to_string(), "D:".to_string()];

        assert_eq!(clean_title("S: D: Dentist", &text), "Dentist");
        assert_eq!(clean_title("Dentist S:", &text), "Dentist S:");
    }

    #[test]
    fn test_rows_all_day_first() {
        let config = small_config();
        let events = vec![event("Standup", 9, "green"), all_day("Holiday")];

        let rows = build_rows(&events, &config, morning()).unwrap();

        assert_eq!(rows[0].title, "Holiday");
        assert_eq!(rows[0].time, "");
        assert_eq!(rows[1].time, "09:00");
        assert_eq!(rows[1].color, Rgb888::new(0, 128, 0));
    }

    #[test]
    fn test_past_events_grayed() {
        let config = small_config();
        let events = vec![event("Early", 8, "green"), event("Later", 11, "green")];
        let now = Brisbane.with_ymd_and_hms(2025, 9, 26, 10, 45, 0).unwrap();

        let rows = build_rows(&events, &config, now).unwrap();

        // cutoff is 09:00 with the default one hour threshold
        assert_eq!(rows[0].color, Rgb888::new(128, 128, 128));
        assert_eq!(rows[1].color, Rgb888::new(0, 128, 0));
    }

    #[test]
    fn test_past_cutoff_with_huge_threshold() {
        let now = Brisbane.with_ymd_and_hms(2025, 9, 26, 10, 45, 0).unwrap();

        assert_eq!(past_cutoff(now, 24), Brisbane.with_ymd_and_hms(2025, 9, 25, 10, 0, 0).unwrap());
        assert_eq!(past_cutoff(now, i64::MAX), Brisbane.with_ymd_and_hms(2025, 9, 26, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_placeholder_row_when_empty() {
        let config = small_config();
        let rows = build_rows(&[], &config, morning()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, config.text.empty_message);
    }

    #[test]
    fn test_render_dimensions() {
        let config = small_config();
        let rendered = render_lockscreen(
            &config,
            &white_background(&config),
            &[event("Standup", 9, "green")],
            morning(),
        )
        .unwrap();

        assert_eq!(rendered.image.dimensions(), (200, 300));
        assert_eq!((rendered.shown, rendered.hidden), (1, 0));
    }

    #[test]
    fn test_empty_day_still_draws_panel() {
        let config = small_config();
        let rendered =
            render_lockscreen(&config, &white_background(&config), &[], morning()).unwrap();

        // Panel starts at y=150, x=20..180; top padding has no text.
        let inside = rendered.image.get_pixel(100, 152);
        assert!(inside[0] < 50, "panel not drawn: {inside:?}");
        assert_eq!(*rendered.image.get_pixel(100, 140), WHITE);
        assert_eq!(rendered.shown, 1);
    }

    #[test]
    fn test_overflow_keeps_first_rows() {
        let config = small_config();
        // (300 - 150 - 2*10) / 20 = 6 rows
        let events: Vec<Event> = (0..10).map(|h| event(&format!("E{h}"), 8 + h, "red")).collect();

        let rendered =
            render_lockscreen(&config, &white_background(&config), &events, morning()).unwrap();

        assert_eq!((rendered.shown, rendered.hidden), (6, 4));
        // 6 rows end the panel at 150 + 6*20 + 20 = 290
        assert!(rendered.image.get_pixel(100, 285)[0] < 50);
        assert_eq!(*rendered.image.get_pixel(100, 295), WHITE);
    }

    #[test]
    fn test_render_is_pixel_identical() {
        let config = small_config();
        let background = white_background(&config);
        let events = vec![all_day("Holiday"), event("Review", 14, "#ff0000")];

        let first = render_lockscreen(&config, &background, &events, morning()).unwrap();
        let second = render_lockscreen(&config, &background, &events, morning()).unwrap();

        assert_eq!(first.image.as_raw(), second.image.as_raw());
    }

    #[test]
    fn test_text_drawn_in_source_color() {
        let config = small_config();
        let rendered = render_lockscreen(
            &config,
            &white_background(&config),
            &[event("Review", 14, "red")],
            morning(),
        )
        .unwrap();

        let red = Rgba([255, 0, 0, 255]);
        assert!(rendered.image.pixels().any(|p| *p == red));
    }

    #[test]
    fn test_long_title_stays_inside_panel() {
        let config = small_config();
        let title = "W".repeat(40);
        let rendered = render_lockscreen(
            &config,
            &white_background(&config),
            &[event(&title, 14, "red")],
            morning(),
        )
        .unwrap();

        let red = Rgba([255, 0, 0, 255]);
        // Panel spans x=20..180. Titles start at x=80 with room for 10
        // glyphs of 9px, so text ends at x=170.
        for (x, y, pixel) in rendered.image.enumerate_pixels() {
            if x >= 180 {
                assert_eq!(*pixel, WHITE, "pixel right of the panel changed at ({x}, {y})");
            }
            if x >= 170 {
                assert_ne!(*pixel, red, "title drawn past its column at ({x}, {y})");
            }
        }
        assert!(
            rendered
                .image
                .enumerate_pixels()
                .any(|(x, _, pixel)| (80..170).contains(&x) && *pixel == red)
        );
    }

    #[test]
    fn test_unknown_color_is_render_error() {
        let config = small_config();
        let err = render_lockscreen(
            &config,
            &white_background(&config),
            &[event("Review", 14, "not-a-colour")],
            morning(),
        )
        .unwrap_err();

        assert!(matches!(err, LockscreenError::Render(_)));
    }

    #[test]
    fn test_wrong_background_size_is_render_error() {
        let config = small_config();
        let background = RgbaImage::from_pixel(10, 10, WHITE);

        let err = render_lockscreen(&config, &background, &[], morning()).unwrap_err();
        assert!(matches!(err, LockscreenError::Render(_)));
    }

    #[test]
    fn test_encode_jpeg() {
        let config = small_config();
        let bytes = encode_jpeg(&white_background(&config), 90).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 300));
    }
}
