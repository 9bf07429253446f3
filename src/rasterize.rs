// this_file: src/rasterize.rs
//! Glyph rasterization using zeno.
//!
//! Outlines arrive in float pixels with y up. The bitmap produced here is
//! aligned to the grid-fitted control box of the outline at the given pen
//! position, so `left`/`top` are the bitmap's pixel bearings relative to the
//! origin.

use crate::face::{ControlBox, Outline, PathEl, RenderMode};
use crate::fixed::{self, Vector};
use zeno::{Cap, Command, Join, Mask, Stroke};

/// A rendered glyph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Pixel column of the bitmap's left edge relative to the origin
    pub left: i32,
    /// Pixel row of the bitmap's top edge above the baseline (y up)
    pub top: i32,
    pub width: u32,
    pub rows: u32,
    /// Bytes per row; packed bits in mono mode
    pub pitch: usize,
    pub mode: RenderMode,
    pub buffer: Vec<u8>,
}

impl GlyphBitmap {
    fn empty(cbox: ControlBox, mode: RenderMode) -> Self {
        Self {
            left: cbox.x_min,
            top: cbox.y_max,
            width: 0,
            rows: 0,
            pitch: 0,
            mode,
            buffer: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    /// Bytes of one row.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.pitch;
        self.buffer.get(start..start + self.pitch).unwrap_or(&[])
    }
}

/// Render an outline placed at `pen` (26.6, y up).
///
/// A non-zero `stroke_radius` (whole pixels) renders the outline's stroke
/// with round caps and joins instead of filling it.
pub fn rasterize(outline: &Outline, pen: Vector, mode: RenderMode, stroke_radius: u32) -> GlyphBitmap {
    let margin = stroke_radius as i32 * fixed::ONE;
    let cbox = outline.control_box(pen, margin);
    if cbox.is_empty() {
        return GlyphBitmap::empty(cbox, mode);
    }

    let width = cbox.width();
    let rows = cbox.height();
    let dx = fixed::to_f32(pen.x) - cbox.x_min as f32;
    let dy = cbox.y_max as f32 - fixed::to_f32(pen.y);
    let commands = to_zeno_commands(outline, dx, dy);

    let mut mask = Mask::new(&commands);
    mask.size(width, rows);
    if stroke_radius > 0 {
        let mut stroke = Stroke::new(2.0 * stroke_radius as f32);
        stroke.cap(Cap::Round).join(Join::Round);
        mask.style(stroke);
    }
    let (coverage, _placement) = mask.render();

    match mode {
        RenderMode::Antialiased => GlyphBitmap {
            left: cbox.x_min,
            top: cbox.y_max,
            width,
            rows,
            pitch: width as usize,
            mode,
            buffer: coverage,
        },
        RenderMode::Mono => {
            let pitch = (width as usize + 7) / 8;
            GlyphBitmap {
                left: cbox.x_min,
                top: cbox.y_max,
                width,
                rows,
                pitch,
                mode,
                buffer: pack_mono(&coverage, width as usize, rows as usize, pitch),
            }
        }
    }
}

/// Threshold 8-bit coverage into MSB-first packed rows.
fn pack_mono(coverage: &[u8], width: usize, rows: usize, pitch: usize) -> Vec<u8> {
    let mut packed = vec![0u8; pitch * rows];
    for y in 0..rows {
        for x in 0..width {
            let covered = coverage.get(y * width + x).is_some_and(|&c| c >= 128);
            if covered {
                packed[y * pitch + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    packed
}

/// Flip to y-down and translate into bitmap space.
fn to_zeno_commands(outline: &Outline, dx: f32, dy: f32) -> Vec<Command> {
    let pt = |x: f32, y: f32| -> zeno::Vector { [x + dx, dy - y].into() };
    outline
        .elements()
        .iter()
        .map(|el| match *el {
            PathEl::MoveTo(x, y) => Command::MoveTo(pt(x, y)),
            PathEl::LineTo(x, y) => Command::LineTo(pt(x, y)),
            PathEl::QuadTo(cx, cy, x, y) => Command::QuadTo(pt(cx, cy), pt(x, y)),
            PathEl::CurveTo(cx0, cy0, cx1, cy1, x, y) => {
                Command::CurveTo(pt(cx0, cy0), pt(cx1, cy1), pt(x, y))
            }
            PathEl::Close => Command::Close,
        })
        .collect()
}
