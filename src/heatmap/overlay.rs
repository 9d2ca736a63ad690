//! Flattening of the report heatmap onto a white page with the screen outline
//! and its label drawn on top.

use anyhow::{bail, Context, Result};
use image::{codecs::png::PngEncoder, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};

use super::aggregate::{ReportView, ViewportOutline};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE_COLOR: Rgba<u8> = Rgba([220, 0, 0, 255]);
const OUTLINE_STROKE: u32 = 2;
const DASH_ON: u32 = 10;
const DASH_OFF: u32 = 6;
const LABEL_SCALE: u32 = 2;
const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

pub fn compose_report_image(view: &ReportView, layer: &RgbaImage) -> Result<RgbaImage> {
    if layer.dimensions() != (view.canvas_width, view.canvas_height) {
        bail!(
            "heatmap layer is {:?}, expected {}x{}",
            layer.dimensions(),
            view.canvas_width,
            view.canvas_height
        );
    }

    let mut page = RgbaImage::from_pixel(view.canvas_width, view.canvas_height, BACKGROUND);
    for (x, y, pixel) in layer.enumerate_pixels() {
        blend(page.get_pixel_mut(x, y), *pixel);
    }

    draw_dashed_rect(&mut page, &view.outline);
    draw_label(&mut page, &view.outline);
    Ok(page)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )
        .context("png encoding failed")?;
    Ok(bytes)
}

fn blend(base: &mut Rgba<u8>, top: Rgba<u8>) {
    let alpha = top[3] as f32 / 255.0;
    for channel in 0..3 {
        let mixed = top[channel] as f32 * alpha + base[channel] as f32 * (1.0 - alpha);
        base[channel] = mixed.round() as u8;
    }
}

fn put(page: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < page.width() as i64 && y < page.height() as i64 {
        page.put_pixel(x as u32, y as u32, color);
    }
}

fn dash_visible(step: u32) -> bool {
    step % (DASH_ON + DASH_OFF) < DASH_ON
}

fn draw_dashed_rect(page: &mut RgbaImage, outline: &ViewportOutline) {
    let (left, top) = (outline.x as i64, outline.y as i64);
    let (right, bottom) = (left + outline.width as i64, top + outline.height as i64);

    for step in 0..=outline.width {
        if !dash_visible(step) {
            continue;
        }
        let x = left + step as i64;
        for t in 0..OUTLINE_STROKE as i64 {
            put(page, x, top + t, OUTLINE_COLOR);
            put(page, x, bottom - t, OUTLINE_COLOR);
        }
    }
    for step in 0..=outline.height {
        if !dash_visible(step) {
            continue;
        }
        let y = top + step as i64;
        for t in 0..OUTLINE_STROKE as i64 {
            put(page, left + t, y, OUTLINE_COLOR);
            put(page, right - t, y, OUTLINE_COLOR);
        }
    }
}

/// Label sits just above the outline's top-left corner, or inside it when
/// the margin is too thin.
fn draw_label(page: &mut RgbaImage, outline: &ViewportOutline) {
    let text_height = (GLYPH_HEIGHT * LABEL_SCALE) as i64;
    let gap = 4;
    let origin_x = outline.x as i64 + gap;
    let origin_y = if outline.y as i64 >= text_height + gap {
        outline.y as i64 - text_height - gap
    } else {
        outline.y as i64 + OUTLINE_STROKE as i64 + gap
    };

    let advance = ((GLYPH_WIDTH + 1) * LABEL_SCALE) as i64;
    for (i, ch) in outline.label.chars().enumerate() {
        let Some(rows) = glyph(ch) else {
            continue;
        };
        let glyph_x = origin_x + i as i64 * advance;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..LABEL_SCALE as i64 {
                    for sx in 0..LABEL_SCALE as i64 {
                        put(
                            page,
                            glyph_x + (col * LABEL_SCALE) as i64 + sx,
                            origin_y + row as i64 * LABEL_SCALE as i64 + sy,
                            OUTLINE_COLOR,
                        );
                    }
                }
            }
        }
    }
}

/// 5×7 bitmaps for the characters the outline label uses.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        _ => return None,
    };
    Some(rows)
}
