//! The stamping pipeline.
//!
//! Turns a raw photo into an attendance photo: the image is scaled to fit the
//! configured bounding box and the `IN`/`Out` label plus a timestamp are
//! burned into the pixels. Stamping never touches its input and holds no
//! state, so any number of stampings may run in parallel.

mod glyphs;

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};
use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use tracing::debug;

use crate::capture::{CaptureRecord, Variant};
use crate::config::StampConfig;

pub use glyphs::{draw_text, line_height, GLYPH_SIZE};

const TIMESTAMP_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Largest size with the aspect ratio of `src_w`×`src_h` that fits inside
/// `max_w`×`max_h`.
///
/// Both dimensions use the same factor, `min(max_w / src_w, max_h / src_h)`,
/// so small images are scaled up as well. Non-empty results are at least one
/// pixel per side; an empty source stays empty.
#[must_use]
pub fn fit_within(src_w: u32, src_h: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (0, 0);
    }

    let factor = (f64::from(max_w) / f64::from(src_w)).min(f64::from(max_h) / f64::from(src_h));
    let w = (f64::from(src_w) * factor).round() as u32;
    let h = (f64::from(src_h) * factor).round() as u32;
    (w.clamp(1, max_w.max(1)), h.clamp(1, max_h.max(1)))
}

/// A photo with its overlay already rendered.
#[derive(Debug, Clone)]
pub struct StampedImage {
    /// The stamped pixels.
    pub image: RgbaImage,
    /// What was drawn, and when.
    pub record: CaptureRecord,
}

impl StampedImage {
    /// The stamped pixels as a [`DynamicImage`].
    #[must_use]
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.image.clone())
    }
}

/// Applies attendance stamps using a fixed [`StampConfig`].
#[derive(Debug, Clone, Default)]
pub struct Stamper {
    config: StampConfig,
}

impl Stamper {
    /// Create a stamper.
    #[must_use]
    pub fn new(config: StampConfig) -> Self {
        Self { config }
    }

    /// Stamp `image` with the current local time.
    #[must_use]
    pub fn stamp_now(&self, image: &DynamicImage, variant: Variant) -> StampedImage {
        self.stamp_at(image, variant, Utc::now())
    }

    /// Stamp `image` as if captured at `at`.
    #[must_use]
    pub fn stamp_at(&self, image: &DynamicImage, variant: Variant, at: DateTime<Utc>) -> StampedImage {
        let timestamp_label = self.format_timestamp(at);
        let image = self.stamp(image, variant.label(), &timestamp_label, variant);
        StampedImage {
            image,
            record: CaptureRecord::new(variant, at, timestamp_label),
        }
    }

    /// Resize `image` into the bounding box and draw both labels onto a copy.
    ///
    /// The primary label sits directly above the vertical mid-line, a quarter
    /// of the width in from the left; the timestamp sits directly below it.
    /// Text that does not fit is clipped at the canvas edge.
    #[must_use]
    pub fn stamp(
        &self,
        image: &DynamicImage,
        primary_label: &str,
        timestamp_label: &str,
        variant: Variant,
    ) -> RgbaImage {
        let (w, h) = fit_within(
            image.width(),
            image.height(),
            self.config.max_width,
            self.config.max_height,
        );
        if w == 0 || h == 0 {
            return image.to_rgba8();
        }

        let mut canvas = if (w, h) == (image.width(), image.height()) {
            image.to_rgba8()
        } else {
            imageops::resize(image, w, h, FilterType::Triangle)
        };
        debug!(
            "Stamping {}x{} -> {}x{} as {}",
            image.width(),
            image.height(),
            w,
            h,
            variant
        );

        let x = i64::from(w / 4);
        let mid = i64::from(h / 2);
        let label_top = mid - i64::from(line_height(self.config.label_scale));
        let timestamp_top = mid + i64::from(self.config.timestamp_scale);

        draw_text(
            &mut canvas,
            primary_label,
            x,
            label_top,
            self.config.label_scale,
            variant.color(),
        );
        draw_text(
            &mut canvas,
            timestamp_label,
            x,
            timestamp_top,
            self.config.timestamp_scale,
            TIMESTAMP_COLOR,
        );

        canvas
    }

    /// Render `at` in local time with the configured format.
    ///
    /// Falls back to RFC 3339 when the format string is malformed.
    #[must_use]
    pub fn format_timestamp(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&Local);
        let mut label = String::new();
        if write!(label, "{}", local.format(&self.config.timestamp_format)).is_err() {
            return local.to_rfc3339();
        }
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::Rgb;

    fn black(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_pixel(w, h, Rgb([0, 0, 0])))
    }

    fn count_in_rows(canvas: &RgbaImage, rows: std::ops::Range<u32>, color: Rgba<u8>) -> usize {
        canvas
            .enumerate_pixels()
            .filter(|(_, y, p)| rows.contains(y) && **p == color)
            .count()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 8, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_fit_within_never_exceeds_bounds() {
        let sizes = [
            (1, 1),
            (799, 801),
            (4032, 3024),
            (3024, 4032),
            (1, 5000),
            (5000, 1),
            (800, 800),
            (123, 457),
        ];
        for (sw, sh) in sizes {
            let (w, h) = fit_within(sw, sh, 800, 800);
            assert!(w <= 800 && h <= 800, "{sw}x{sh} -> {w}x{h}");
            assert!(w >= 1 && h >= 1);
        }
    }

    #[test]
    fn test_fit_within_preserves_aspect_ratio() {
        for (sw, sh) in [(4032, 3024), (3024, 4032), (640, 480), (123, 457), (1000, 10)] {
            let (w, h) = fit_within(sw, sh, 800, 800);
            // Cross-multiplied ratios may differ by at most half a pixel per side.
            let lhs = u64::from(w) * u64::from(sh);
            let rhs = u64::from(h) * u64::from(sw);
            assert!(
                lhs.abs_diff(rhs) <= u64::from(sw.max(sh)),
                "{sw}x{sh} -> {w}x{h}"
            );
        }
    }

    #[test]
    fn test_fit_within_exact_cases() {
        assert_eq!(fit_within(4032, 3024, 800, 800), (800, 600));
        assert_eq!(fit_within(3024, 4032, 800, 800), (600, 800));
        assert_eq!(fit_within(100, 50, 800, 800), (800, 400));
        assert_eq!(fit_within(800, 800, 800, 800), (800, 800));
    }

    #[test]
    fn test_fit_within_empty_source() {
        assert_eq!(fit_within(0, 10, 800, 800), (0, 0));
        assert_eq!(fit_within(10, 0, 800, 800), (0, 0));
    }

    #[test]
    fn test_stamp_resizes_into_box() {
        let stamper = Stamper::default();
        let stamped = stamper.stamp(&black(1600, 1200), "IN", "09:30 AM", Variant::ClockIn);
        assert_eq!(stamped.dimensions(), (800, 600));
    }

    #[test]
    fn test_stamp_leaves_input_untouched() {
        let stamper = Stamper::default();
        let input = black(800, 800);
        let before = input.clone();
        let _ = stamper.stamp(&input, "IN", "09:30 AM", Variant::ClockIn);
        assert_eq!(input, before);
    }

    #[test]
    fn test_clock_in_label_is_green() {
        let stamper = Stamper::default();
        let canvas = stamper.stamp(&black(800, 800), "IN", "09:30 AM", Variant::ClockIn);

        let label_rows = 400 - line_height(6)..400;
        assert!(count_in_rows(&canvas, label_rows, Variant::ClockIn.color()) > 0);
        assert_eq!(count_in_rows(&canvas, 0..800, Variant::ClockOut.color()), 0);
    }

    #[test]
    fn test_clock_out_label_is_red() {
        let stamper = Stamper::default();
        let canvas = stamper.stamp(&black(800, 800), "Out", "17:45 PM", Variant::ClockOut);

        assert!(count_in_rows(&canvas, 352..400, Variant::ClockOut.color()) > 0);
        assert_eq!(count_in_rows(&canvas, 0..800, Variant::ClockIn.color()), 0);
    }

    #[test]
    fn test_timestamp_drawn_white_below_label() {
        let stamper = Stamper::default();
        let canvas = stamper.stamp(&black(800, 800), "IN", "09:30 AM", Variant::ClockIn);

        assert!(count_in_rows(&canvas, 400..800, TIMESTAMP_COLOR) > 0);
        assert_eq!(count_in_rows(&canvas, 0..400, TIMESTAMP_COLOR), 0);
    }

    #[test]
    fn test_text_starts_a_quarter_in() {
        let stamper = Stamper::default();
        let canvas = stamper.stamp(&black(800, 800), "IN", "09:30 AM", Variant::ClockIn);

        let leftmost = canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != Rgba([0, 0, 0, 255]))
            .map(|(x, _, _)| x)
            .min()
            .unwrap();
        assert!(leftmost >= 200);
    }

    #[test]
    fn test_tiny_image_clips_text() {
        let stamper = Stamper::new(StampConfig {
            max_width: 8,
            max_height: 8,
            ..StampConfig::default()
        });
        let canvas = stamper.stamp(
            &black(8, 8),
            "IN",
            "a very long timestamp that cannot fit",
            Variant::ClockIn,
        );
        assert_eq!(canvas.dimensions(), (8, 8));
    }

    #[test]
    fn test_empty_image_passes_through() {
        let stamper = Stamper::default();
        let canvas = stamper.stamp(&black(0, 0), "IN", "now", Variant::ClockIn);
        assert_eq!(canvas.dimensions(), (0, 0));
    }

    #[test]
    fn test_stamp_at_builds_record() {
        let stamper = Stamper::default();
        let at = fixed_time();
        let stamped = stamper.stamp_at(&black(400, 300), Variant::ClockOut, at);

        assert_eq!(stamped.image.dimensions(), (800, 600));
        assert_eq!(stamped.record.variant, Variant::ClockOut);
        assert_eq!(stamped.record.primary_label, "Out");
        assert_eq!(stamped.record.captured_at, at);
        assert_eq!(stamped.record.timestamp_label, stamper.format_timestamp(at));
        assert_eq!(stamped.to_dynamic().width(), 800);
    }

    #[test]
    fn test_format_timestamp_uses_config() {
        let stamper = Stamper::new(StampConfig {
            timestamp_format: "%Y".to_string(),
            ..StampConfig::default()
        });
        assert_eq!(stamper.format_timestamp(fixed_time()), "2024");
    }

    #[test]
    fn test_format_timestamp_falls_back_on_bad_format() {
        let stamper = Stamper::new(StampConfig {
            timestamp_format: "%Q%".to_string(),
            ..StampConfig::default()
        });
        let label = stamper.format_timestamp(fixed_time());
        assert!(label.starts_with("2024-11-0"));
    }
}
