// src/render/labels.rs

//! Chart text drawn from 8x8 bitmap glyphs: the caption, count ticks beside
//! the left axis, and one country label per bar hanging below the baseline.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};
use image::{Rgb, RgbImage};

use super::BarLayout;

pub(crate) const GLYPH: u32 = 8;
pub(crate) const CAPTION: &str = "Universities per country";

/// Space between an axis and its labels.
const GAP: u32 = 4;

/// Fill `[x0, x1) × [y0, y1)`, clipped to the image.
pub(crate) fn fill_rect(
    img: &mut RgbImage,
    (x0, y0): (u32, u32),
    (x1, y1): (u32, u32),
    color: Rgb<u8>,
) {
    let x1 = x1.min(img.width());
    let y1 = y1.min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, color);
        }
    }
}

/// Glyph rows, least significant bit leftmost. Unknown characters show as `?`.
fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

pub(crate) fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * GLYPH * scale
}

/// Horizontal text with its top-left corner at `(x, y)`.
pub(crate) fn draw_text(img: &mut RgbImage, (x, y): (u32, u32), text: &str, scale: u32, color: Rgb<u8>) {
    for (i, c) in text.chars().enumerate() {
        let left = x + i as u32 * GLYPH * scale;
        for (row, bits) in glyph(c).into_iter().enumerate() {
            for col in 0..GLYPH {
                if (bits >> col) & 1 == 1 {
                    let px = left + col * scale;
                    let py = y + row as u32 * scale;
                    fill_rect(img, (px, py), (px + scale, py + scale), color);
                }
            }
        }
    }
}

/// Text turned a quarter clockwise, reading downwards from `(x, y)`.
pub(crate) fn draw_text_down(img: &mut RgbImage, (x, y): (u32, u32), text: &str, color: Rgb<u8>) {
    for (i, c) in text.chars().enumerate() {
        let top = y + i as u32 * GLYPH;
        for (row, bits) in glyph(c).into_iter().enumerate() {
            for col in 0..GLYPH {
                if (bits >> col) & 1 == 1 {
                    if let Some(p) = img.get_pixel_mut_checked(x + GLYPH - 1 - row as u32, top + col) {
                        *p = color;
                    }
                }
            }
        }
    }
}

/// Caption, tick values and bar labels around a plot drawn with `layout`.
/// Bar labels are skipped when slots are narrower than a glyph.
pub(crate) fn annotate(
    img: &mut RgbImage,
    layout: &BarLayout,
    labels: &[String],
    ticks: &[u64],
    color: Rgb<u8>,
) {
    let caption_x = img.width().saturating_sub(text_width(CAPTION, layout.scale)) / 2;
    draw_text(img, (caption_x, BarLayout::MARGIN / 2), CAPTION, layout.scale, color);

    let axis_max = ticks.last().copied().unwrap_or(0);
    for &tick in ticks {
        let text = tick.to_string();
        let x = layout.left.saturating_sub(GAP + text_width(&text, 1));
        let y = layout.y(tick, axis_max).saturating_sub(GLYPH / 2);
        draw_text(img, (x, y), &text, 1, color);
    }

    let slot = layout.slot(labels.len());
    if slot < GLYPH as f64 {
        return;
    }
    let room = (img.height().saturating_sub(layout.baseline + GAP) / GLYPH) as usize;
    for (i, label) in labels.iter().enumerate() {
        let center = layout.left as f64 + slot * (i as f64 + 0.5);
        let x = (center - GLYPH as f64 / 2.0).round().max(0.0) as u32;
        let text: String = label.chars().take(room).collect();
        draw_text_down(img, (x, layout.baseline + GAP), &text, color);
    }
}
