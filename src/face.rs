// this_file: src/face.rs
//! The font engine contract.
//!
//! Everything the layout and rasterization pipeline needs from a font face
//! goes through [`FaceEngine`]: character lookup, advances, kerning, size
//! metrics and scaled outlines. The production implementation lives in
//! [`crate::fonts::SkrifaFace`]; tests plug in synthetic faces.

use crate::error::{Error, Result};
use crate::fixed::{self, Vector};
use crate::status;
use serde::Serialize;
use skrifa::outline::OutlinePen;

/// Index into a face's glyph table. Zero is the missing glyph.
pub type GlyphIndex = u32;

/// How glyphs are loaded and rasterized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// 8-bit coverage, blended with `max`
    #[default]
    Antialiased,
    /// 1-bit coverage, written as 0/255
    Mono,
}

/// Scaled face metrics in 26.6 units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeMetrics {
    pub x_ppem: u16,
    pub y_ppem: u16,
    /// Distance from baseline to the top of the face, rounded up to a pixel
    pub ascender: i32,
    /// Distance from baseline to the bottom (negative), rounded down
    pub descender: i32,
    /// Baseline-to-baseline distance, rounded to a pixel
    pub height: i32,
}

/// One variation axis of a variable font.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariationAxis {
    pub tag: String,
    pub name: Option<String>,
    pub minimum: f32,
    pub default: f32,
    pub maximum: f32,
}

/// A named instance (predefined style) of a variable font.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedInstance {
    pub name: Option<String>,
    pub coordinates: Vec<f32>,
}

/// What the complex shaper needs to open its own view of the face.
#[derive(Debug, Clone)]
pub struct ShapingData<'a> {
    pub data: &'a [u8],
    pub index: u32,
    pub ppem: f32,
    pub variations: Vec<([u8; 4], f32)>,
}

/// Contract between the text pipeline and a font engine.
///
/// All methods take `&self` except variation changes; implementations must
/// not keep per-call positioning state.
pub trait FaceEngine: Send + Sync {
    /// Scaled metrics at the face's pixel size.
    fn size_metrics(&self) -> SizeMetrics;

    /// Number of glyphs in the face.
    fn num_glyphs(&self) -> u32;

    /// Map a character through the selected charmap; 0 when unmapped.
    fn char_index(&self, ch: char) -> GlyphIndex;

    /// Horizontal advance of a glyph in 26.6.
    fn advance(&self, glyph: GlyphIndex, mode: RenderMode) -> Result<i32>;

    /// True when the face carries pair kerning data.
    fn has_kerning(&self) -> bool;

    /// Scaled kerning between two glyphs in 26.6, if the pair is kerned.
    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> Option<Vector>;

    /// Outline in pixels at the face's size, y up, origin at the pen.
    fn outline(&self, glyph: GlyphIndex, mode: RenderMode) -> Result<Outline>;

    /// Raw font data for the complex shaper. `None` disables complex layout.
    fn shaping_data(&self) -> Option<ShapingData<'_>> {
        None
    }

    fn variation_axes(&self) -> Result<Vec<VariationAxis>> {
        Err(Error::face(status::UNIMPLEMENTED_FEATURE))
    }

    fn named_instances(&self) -> Result<Vec<NamedInstance>> {
        Err(Error::face(status::UNIMPLEMENTED_FEATURE))
    }

    /// Set design coordinates, one per axis in axis order.
    fn set_variation(&mut self, _coordinates: &[f32]) -> Result<()> {
        Err(Error::face(status::UNIMPLEMENTED_FEATURE))
    }

    fn set_named_instance(&mut self, _index: usize) -> Result<()> {
        Err(Error::face(status::UNIMPLEMENTED_FEATURE))
    }
}

/// Outline path element in float pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathEl {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    QuadTo(f32, f32, f32, f32),
    CurveTo(f32, f32, f32, f32, f32, f32),
    Close,
}

/// Pixel-space control box, y up. Max edges are exclusive pixel borders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl ControlBox {
    pub fn width(&self) -> u32 {
        (self.x_max - self.x_min).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y_max - self.y_min).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A scaled glyph outline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    elements: Vec<PathEl>,
}

impl Outline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<PathEl>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[PathEl] {
        &self.elements
    }

    /// True when the outline has no points (space-like glyphs).
    pub fn is_empty(&self) -> bool {
        self.elements.iter().all(|el| matches!(el, PathEl::Close))
    }

    /// Grid-fitted control box with the outline placed at `pen`.
    ///
    /// `margin` (26.6) grows the box on every side, used for strokes. An
    /// empty outline has an all-zero box regardless of the pen.
    pub fn control_box(&self, pen: Vector, margin: i32) -> ControlBox {
        let mut x_min = i32::MAX;
        let mut y_min = i32::MAX;
        let mut x_max = i32::MIN;
        let mut y_max = i32::MIN;
        let mut any = false;

        for (x, y) in self.points() {
            let x = fixed::from_f32(x) + pen.x;
            let y = fixed::from_f32(y) + pen.y;
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
            any = true;
        }

        if !any {
            return ControlBox::default();
        }

        ControlBox {
            x_min: fixed::floor_px(x_min - margin),
            y_min: fixed::floor_px(y_min - margin),
            x_max: fixed::ceil_px(x_max + margin),
            y_max: fixed::ceil_px(y_max + margin),
        }
    }

    fn points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.elements.iter().flat_map(|el| {
            let pts: Vec<(f32, f32)> = match *el {
                PathEl::MoveTo(x, y) | PathEl::LineTo(x, y) => vec![(x, y)],
                PathEl::QuadTo(cx, cy, x, y) => vec![(cx, cy), (x, y)],
                PathEl::CurveTo(cx0, cy0, cx1, cy1, x, y) => vec![(cx0, cy0), (cx1, cy1), (x, y)],
                PathEl::Close => Vec::new(),
            };
            pts
        })
    }
}

impl OutlinePen for Outline {
    fn move_to(&mut self, x: f32, y: f32) {
        self.elements.push(PathEl::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.elements.push(PathEl::LineTo(x, y));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.elements.push(PathEl::QuadTo(cx0, cy0, x, y));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.elements
            .push(PathEl::CurveTo(cx0, cy0, cx1, cy1, x, y));
    }

    fn close(&mut self) {
        self.elements.push(PathEl::Close);
    }
}
