//! Daily background selection.
//!
//! The background for a day is a pure function of the date and the sorted
//! file listing, so every run on the same day picks the same image without
//! keeping any state between runs.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::{LockscreenError, LockscreenResult};

/// A background picked for the day, already cropped to the display size.
#[derive(Debug, Clone)]
pub struct Background {
    pub path: PathBuf,
    pub image: RgbaImage,
}

/// Image files in `dir` that the image crate can decode, sorted by file name.
pub fn list_candidates(dir: &Path) -> LockscreenResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(LockscreenError::Background(format!(
            "Background folder not found: {}",
            dir.display()
        )));
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect();

    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

fn is_supported_image(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));

    !hidden
        && ImageFormat::from_path(path)
            .map(|format| format.reading_enabled())
            .unwrap_or(false)
}

/// Index into a candidate list of length `count` for `date`.
///
/// Uses the first 8 bytes of SHA-256 over the ISO date, which spreads
/// consecutive dates evenly over the candidates.
pub fn selection_index(date: NaiveDate, count: usize) -> usize {
    if count == 0 {
        return 0;
    }

    let digest = Sha256::digest(date.format("%Y-%m-%d").to_string().as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);

    (u64::from_be_bytes(head) % count as u64) as usize
}

/// The candidate for `date`, if there are any.
pub fn select_for_date(date: NaiveDate, candidates: &[PathBuf]) -> Option<&PathBuf> {
    candidates.get(selection_index(date, candidates.len()))
}

/// Scale to cover `width` x `height` (Lanczos3), then centre crop to exactly that size.
pub fn crop_to_fill(image: &DynamicImage, width: u32, height: u32) -> LockscreenResult<RgbaImage> {
    let (orig_width, orig_height) = image.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(LockscreenError::Background("background image is empty".into()));
    }

    let scale = f64::max(
        f64::from(width) / f64::from(orig_width),
        f64::from(height) / f64::from(orig_height),
    );
    let new_width = ((f64::from(orig_width) * scale).round() as u32).max(width);
    let new_height = ((f64::from(orig_height) * scale).round() as u32).max(height);
    tracing::debug!(
        "Scaling background {}x{} -> {}x{} (factor {:.3})",
        orig_width,
        orig_height,
        new_width,
        new_height,
        scale
    );

    let resized = image.resize_exact(new_width, new_height, FilterType::Lanczos3);

    let left = (new_width - width) / 2;
    let top = (new_height - height) / 2;

    Ok(resized.crop_imm(left, top, width, height).to_rgba8())
}

/// Pick, load and crop the background for `date`.
pub fn load_background(
    dir: &Path,
    date: NaiveDate,
    width: u32,
    height: u32,
) -> LockscreenResult<Background> {
    let candidates = list_candidates(dir)?;
    tracing::info!("Found {} background images", candidates.len());

    let path = select_for_date(date, &candidates)
        .ok_or_else(|| {
            LockscreenError::Background(format!("No image files found in {}", dir.display()))
        })?
        .clone();
    tracing::info!(background = %path.display(), %date, "Selected background");

    let decoded = image::open(&path)?;
    let image = crop_to_fill(&decoded, width, height)?;

    Ok(Background { path, image })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use image::{Rgba, RgbaImage};

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save(dir.join(name))
            .unwrap();
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_same_date_same_file() {
        let candidates = paths(&["a.png", "b.png", "c.png"]);
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();

        let first = select_for_date(date, &candidates);
        for _ in 0..10 {
            assert_eq!(select_for_date(date, &candidates), first);
        }
    }

    #[test]
    fn test_selection_roughly_uniform_over_a_year() {
        let mut counts = [0usize; 3];
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

        for offset in 0..365 {
            let date = start + Duration::days(offset);
            counts[selection_index(date, 3)] += 1;
        }

        // Expect ~122 each
        for count in counts {
            assert!((80..=165).contains(&count), "skewed distribution: {counts:?}");
        }
    }

    #[test]
    fn test_selection_index_single_and_empty() {
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();
        assert_eq!(selection_index(date, 1), 0);
        assert_eq!(select_for_date(date, &[]), None);
    }

    #[test]
    fn test_list_candidates_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "b.png", 4, 4, [0, 0, 0, 255]);
        image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]))
            .save(dir.path().join("a.jpg"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        std::fs::write(dir.path().join(".hidden.png"), "junk").unwrap();
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<_> = list_candidates(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.jpg", "b.png"]);
    }

    #[test]
    fn test_missing_folder_is_error() {
        let err = list_candidates(Path::new("./non_existent_folder/")).unwrap_err();
        assert!(matches!(err, LockscreenError::Background(_)));
    }

    #[test]
    fn test_empty_folder_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();

        let err = load_background(dir.path(), date, 10, 20).unwrap_err();
        assert!(err.to_string().contains("No image files"));
    }

    #[test]
    fn test_crop_to_fill_exact_dimensions() {
        let wide = DynamicImage::ImageRgba8(RgbaImage::new(300, 100));
        let tall = DynamicImage::ImageRgba8(RgbaImage::new(100, 700));

        for image in [wide, tall] {
            let cropped = crop_to_fill(&image, 129, 279).unwrap();
            assert_eq!(cropped.dimensions(), (129, 279));
        }
    }

    #[test]
    fn test_crop_is_centred() {
        // Left third red, middle third green, right third blue; a square crop
        // of a 3:1 image keeps only the green middle.
        let mut image = RgbaImage::new(90, 30);
        for (x, _, pixel) in image.enumerate_pixels_mut() {
            *pixel = match x {
                0..30 => Rgba([255, 0, 0, 255]),
                30..60 => Rgba([0, 255, 0, 255]),
                _ => Rgba([0, 0, 255, 255]),
            };
        }

        let cropped = crop_to_fill(&DynamicImage::ImageRgba8(image), 30, 30).unwrap();
        assert_eq!(*cropped.get_pixel(15, 15), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_load_background_picks_by_date() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "1.png", 20, 40, [255, 0, 0, 255]);
        write_image(dir.path(), "2.png", 20, 40, [0, 255, 0, 255]);
        write_image(dir.path(), "3.png", 20, 40, [0, 0, 255, 255]);
        let date = NaiveDate::from_ymd_opt(2025, 9, 26).unwrap();

        let background = load_background(dir.path(), date, 10, 20).unwrap();
        let expected = select_for_date(date, &list_candidates(dir.path()).unwrap())
            .unwrap()
            .clone();

        assert_eq!(background.path, expected);
        assert_eq!(background.image.dimensions(), (10, 20));
    }
}
