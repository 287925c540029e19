//! Bitmap text rasterisation.
//!
//! Glyphs come from the 8x8 ASCII set in `font8x8`, blown up by an integer
//! scale. Pixels falling outside the canvas are dropped.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

/// Width and height of one unscaled glyph cell.
pub const GLYPH_SIZE: u32 = 8;

/// Pixel height of a line rendered at `scale`.
#[must_use]
pub fn line_height(scale: u32) -> u32 {
    GLYPH_SIZE.saturating_mul(scale)
}

/// Draw `text` with its top-left corner at (`x`, `y`).
///
/// Characters missing from the font advance the cursor but draw nothing.
pub fn draw_text(canvas: &mut RgbaImage, text: &str, x: i64, y: i64, scale: u32, color: Rgba<u8>) {
    let scale = i64::from(scale);
    let advance = i64::from(GLYPH_SIZE) * scale;

    let mut cursor = x;
    for ch in text.chars() {
        if let Some(rows) = BASIC_FONTS.get(ch) {
            for (row, bits) in (0_i64..).zip(rows) {
                for col in 0..i64::from(GLYPH_SIZE) {
                    // Bit 0 is the leftmost pixel of the row.
                    if bits & (1 << col) != 0 {
                        fill_block(canvas, cursor + col * scale, y + row * scale, scale, color);
                    }
                }
            }
        }
        cursor += advance;
    }
}

fn fill_block(canvas: &mut RgbaImage, x: i64, y: i64, size: i64, color: Rgba<u8>) {
    for dy in 0..size {
        for dx in 0..size {
            put_clipped(canvas, x + dx, y + dy, color);
        }
    }
}

fn put_clipped(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x < canvas.width() && y < canvas.height() {
        canvas.put_pixel(x, y, color);
    }
}
