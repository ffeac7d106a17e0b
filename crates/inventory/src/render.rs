//! Inventory table pages.
//!
//! Rows are split into pages of [`ROWS_PER_PAGE`] and each page is drawn
//! as black 8x8 monospace text on a fixed 800x600 white canvas, one row
//! per line. The canvas never grows: glyph pixels past the right or
//! bottom edge are clipped.

use std::fmt;
use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS, GREEK_FONTS, LATIN_FONTS, MISC_FONTS};
use image::{ImageFormat, Rgb, RgbImage};

use crate::record::Record;

pub const ROWS_PER_PAGE: usize = 25;

pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;
/// Left and top offset of the first line.
pub const MARGIN: u32 = 10;
/// Vertical distance between consecutive lines.
pub const LINE_SPACING: u32 = 20;
pub const GLYPH_SIZE: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const INK: Rgb<u8> = Rgb([0, 0, 0]);

/// One encoded page and the text drawn on it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub lines: Vec<String>,
    pub png: Vec<u8>,
}

#[derive(Debug)]
pub enum RenderError {
    /// PNG encoder failure
    Encode(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Encode(msg) => write!(f, "failed to encode table image: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

/// Render every row, [`ROWS_PER_PAGE`] rows per page, in sheet order.
/// No rows, no pages.
pub fn render_pages(records: &[Record]) -> Result<Vec<RenderedPage>, RenderError> {
    let mut pages = Vec::with_capacity(records.len().div_ceil(ROWS_PER_PAGE));

    for chunk in records.chunks(ROWS_PER_PAGE) {
        let lines: Vec<String> = chunk.iter().map(Record::table_line).collect();
        let png = encode_png(&draw_page(&lines))?;
        pages.push(RenderedPage { lines, png });
    }

    log::debug!("rendered {} rows into {} pages", records.len(), pages.len());
    Ok(pages)
}

/// Draw `lines` top to bottom on a blank canvas.
pub fn draw_page(lines: &[String]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, BACKGROUND);

    let mut y = MARGIN as u64;
    for line in lines {
        draw_text(&mut canvas, MARGIN as u64, y, line);
        y += LINE_SPACING as u64;
    }

    canvas
}

fn draw_text(canvas: &mut RgbImage, x: u64, y: u64, text: &str) {
    let (width, height) = (canvas.width() as u64, canvas.height() as u64);
    if y >= height {
        return;
    }

    let mut pen_x = x;
    for ch in text.chars() {
        if pen_x >= width {
            break;
        }
        let bitmap = glyph(ch);
        for (dy, bits) in bitmap.iter().enumerate() {
            let py = y + dy as u64;
            if py >= height {
                break;
            }
            for dx in 0..GLYPH_SIZE as u64 {
                let px = pen_x + dx;
                if px < width && bits & (1 << dx) != 0 {
                    canvas.put_pixel(px as u32, py as u32, INK);
                }
            }
        }
        pen_x += GLYPH_SIZE as u64;
    }
}

/// 8x8 bitmap for `ch`; rows top to bottom, bit 0 is the leftmost pixel.
fn glyph(ch: char) -> [u8; 8] {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| MISC_FONTS.get(ch))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

pub fn encode_png(canvas: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut buf = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(buf)
}
