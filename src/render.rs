// this_file: src/render.rs

//! Text rendering into 8-bit rasters.
//!
//! Rendering lays the text out once, then walks the glyph run twice. The
//! first pass finds the highest glyph top and leftmost bearing so that the
//! whole run can be shifted into the raster; the second pass rasterizes each
//! glyph at its pen position and blends it in.

use crate::error::{Error, Result};
use crate::face::RenderMode;
use crate::fixed::{self, Vector};
use crate::fonts::Font;
use crate::logging::Timer;
use crate::raster::{PixelFormat, Raster};
use crate::rasterize::{self, GlyphBitmap};
use crate::shaping::{self, TextOptions};

impl Font {
    /// Render `text` into an `L` raster.
    ///
    /// A non-zero `stroke_width` draws the glyph outlines stroked with that
    /// radius instead of filled. Empty text leaves the raster untouched.
    pub fn render(
        &self,
        text: &str,
        raster: &mut Raster,
        options: &TextOptions,
        stroke_width: u32,
    ) -> Result<()> {
        if raster.format() != PixelFormat::L {
            return Err(Error::InvalidParameter(format!(
                "text renders into L rasters, got {}",
                raster.format()
            )));
        }

        // The stroke margin is carried in 26.6 as well.
        let stroke = i32::try_from(stroke_width)
            .ok()
            .filter(|s| s.checked_mul(fixed::ONE).is_some())
            .ok_or_else(|| {
                Error::InvalidParameter(format!("stroke width {} is too large", stroke_width))
            })?;

        let _timer = Timer::new("render text");
        let run = shaping::layout(self, text, options)?;
        if run.is_empty() {
            return Ok(());
        }
        let vertical = run.is_vertical();

        let mut outlines = Vec::with_capacity(run.len());
        let mut pen = Vector::ZERO;
        let mut baseline = 0;
        let mut offset = 0;
        for glyph in &run.glyphs {
            let outline = self.face.outline(glyph.index, options.mode)?;
            let cbox = outline.control_box(
                Vector::new(pen.x + glyph.x_offset, pen.y + glyph.y_offset),
                0,
            );
            if vertical {
                offset = offset.max(cbox.y_max);
                baseline = baseline.min(cbox.x_min);
                pen.y += glyph.y_advance;
            } else {
                baseline = baseline.max(cbox.y_max);
                offset = offset.min(cbox.x_min);
                pen.x += glyph.x_advance;
            }
            outlines.push(outline);
        }

        let mut pen = if vertical {
            Vector::new((-baseline + stroke) * fixed::ONE, (-offset - stroke) * fixed::ONE)
        } else {
            Vector::new((-offset + stroke) * fixed::ONE, (-baseline - stroke) * fixed::ONE)
        };

        for (glyph, outline) in run.glyphs.iter().zip(&outlines) {
            let origin = Vector::new(pen.x + glyph.x_offset, pen.y + glyph.y_offset);
            let bitmap = rasterize::rasterize(outline, origin, options.mode, stroke_width);
            blit(raster, &bitmap);
            pen.x += glyph.x_advance;
            pen.y += glyph.y_advance;
        }

        log::debug!(
            "Rendered {} glyphs into {}x{} raster",
            run.len(),
            raster.width(),
            raster.height()
        );
        Ok(())
    }
}

/// Blend a glyph bitmap into the raster at its own bearings.
///
/// Rows outside the raster are skipped and columns are clipped. Mono
/// coverage writes 255; antialiased coverage keeps the per-pixel maximum.
fn blit(raster: &mut Raster, bitmap: &GlyphBitmap) {
    if bitmap.is_empty() {
        return;
    }
    let xx = bitmap.left;
    let width = raster.width() as i32;
    let height = raster.height() as i32;
    let x0 = (-xx).max(0);
    let x1 = (bitmap.width as i32).min(width - xx);
    if x0 >= x1 {
        return;
    }

    for row in 0..bitmap.rows {
        let yy = -bitmap.top + row as i32;
        if yy < 0 || yy >= height {
            continue;
        }
        let source = bitmap.row(row);
        let target = raster.row_mut(yy as u32);
        for j in x0..x1 {
            let dst = &mut target[(xx + j) as usize];
            let coverage = match bitmap.mode {
                RenderMode::Mono => {
                    let byte = source[j as usize / 8];
                    if byte & (0x80 >> (j % 8)) != 0 {
                        255
                    } else {
                        0
                    }
                }
                RenderMode::Antialiased => source[j as usize],
            };
            if *dst < coverage {
                *dst = coverage;
            }
        }
    }
}
