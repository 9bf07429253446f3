// this_file: src/fonts.rs

//! Font handles and the skrifa-backed face engine.
//!
//! A [`Font`] owns its face and, when opened from memory, the bytes behind
//! it. Files are memory-mapped. Variation coordinates are clamped to the
//! axis ranges reported by the font before they reach outlines, metrics or
//! the shaper.

use crate::capabilities;
use crate::config::{FontOptions, LayoutEngine};
use crate::error::{Error, Result};
use crate::face::{
    FaceEngine, GlyphIndex, NamedInstance, Outline, RenderMode, ShapingData, SizeMetrics,
    VariationAxis,
};
use crate::fixed::{self, Vector};
use crate::status;
use memmap2::Mmap;
use read_fonts::tables::cmap::{CmapSubtable, PlatformId};
use read_fonts::tables::kern::{Kern, SubtableKind};
use read_fonts::types::{GlyphId, Tag};
use read_fonts::{FileRef, FontRef, TableProvider};
use skrifa::instance::{Location, LocationRef, Size};
use skrifa::outline::DrawSettings;
use skrifa::MetadataProvider;
use std::fs::File;
use std::path::PathBuf;

/// Where font data comes from.
#[derive(Debug, Clone)]
pub enum FontSource {
    /// A font file, memory-mapped for the lifetime of the handle
    Path(PathBuf),
    /// In-memory font data; the handle keeps its own copy
    Bytes(Vec<u8>),
}

impl From<PathBuf> for FontSource {
    fn from(path: PathBuf) -> Self {
        FontSource::Path(path)
    }
}

impl From<Vec<u8>> for FontSource {
    fn from(bytes: Vec<u8>) -> Self {
        FontSource::Bytes(bytes)
    }
}

/// Charmap encodings that can be selected by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Unicode,
    Symbol,
    AppleRoman,
    ShiftJis,
    Prc,
    Big5,
    Wansung,
    Johab,
}

impl Encoding {
    /// Resolve a four-character encoding tag (`unic`, `symb`, ...).
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "unic" => Ok(Encoding::Unicode),
            "symb" => Ok(Encoding::Symbol),
            "armn" => Ok(Encoding::AppleRoman),
            "sjis" => Ok(Encoding::ShiftJis),
            "gb  " => Ok(Encoding::Prc),
            "big5" => Ok(Encoding::Big5),
            "wans" => Ok(Encoding::Wansung),
            "joha" => Ok(Encoding::Johab),
            _ => Err(Error::face(status::INVALID_CHARMAP_HANDLE)),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Encoding::Unicode => "unic",
            Encoding::Symbol => "symb",
            Encoding::AppleRoman => "armn",
            Encoding::ShiftJis => "sjis",
            Encoding::Prc => "gb  ",
            Encoding::Big5 => "big5",
            Encoding::Wansung => "wans",
            Encoding::Johab => "joha",
        }
    }

    fn matches(self, platform: PlatformId, encoding_id: u16) -> bool {
        match self {
            Encoding::Unicode => {
                platform == PlatformId::Unicode
                    || (platform == PlatformId::Windows && matches!(encoding_id, 1 | 10))
                    || (platform == PlatformId::ISO && encoding_id == 1)
            }
            Encoding::AppleRoman => platform == PlatformId::Macintosh && encoding_id == 0,
            Encoding::Symbol => platform == PlatformId::Windows && encoding_id == 0,
            Encoding::ShiftJis => platform == PlatformId::Windows && encoding_id == 2,
            Encoding::Prc => platform == PlatformId::Windows && encoding_id == 3,
            Encoding::Big5 => platform == PlatformId::Windows && encoding_id == 4,
            Encoding::Wansung => platform == PlatformId::Windows && encoding_id == 5,
            Encoding::Johab => platform == PlatformId::Windows && encoding_id == 6,
        }
    }
}

/// An opened font at a fixed pixel size.
pub struct Font {
    pub(crate) face: Box<dyn FaceEngine>,
    size: f32,
    layout_engine: LayoutEngine,
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("size", &self.size)
            .field("layout_engine", &self.layout_engine)
            .finish_non_exhaustive()
    }
}

impl Font {
    /// Open a font file or buffer.
    ///
    /// Asking for complex layout when no complex engine is available falls
    /// back to basic layout with a warning.
    pub fn open(source: FontSource, options: &FontOptions) -> Result<Self> {
        let encoding = match options.encoding.as_deref() {
            Some(tag) => Encoding::from_tag(tag)?,
            None => Encoding::Unicode,
        };
        let face = SkrifaFace::open(source, options.index, options.size, encoding)?;

        let mut layout_engine = options.layout_engine;
        if layout_engine == LayoutEngine::Complex && !capabilities::shaping().available {
            log::warn!("Complex text layout unavailable, falling back to basic layout");
            layout_engine = LayoutEngine::Basic;
        }

        Ok(Self::from_engine(Box::new(face), options.size, layout_engine))
    }

    /// Wrap an existing face engine.
    pub fn from_engine(face: Box<dyn FaceEngine>, size: f32, layout_engine: LayoutEngine) -> Self {
        Self {
            face,
            size,
            layout_engine,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn layout_engine(&self) -> LayoutEngine {
        self.layout_engine
    }

    pub fn face(&self) -> &dyn FaceEngine {
        self.face.as_ref()
    }

    /// Ascender, descender and line height at this size, in 26.6.
    pub fn size_metrics(&self) -> SizeMetrics {
        self.face.size_metrics()
    }

    pub fn variation_axes(&self) -> Result<Vec<VariationAxis>> {
        self.face.variation_axes()
    }

    pub fn named_instances(&self) -> Result<Vec<NamedInstance>> {
        self.face.named_instances()
    }

    /// Set design coordinates in axis order; values are clamped to each axis.
    pub fn set_variation_axes(&mut self, coordinates: &[f32]) -> Result<()> {
        self.face.set_variation(coordinates)
    }

    /// Select a named instance by zero-based index.
    pub fn set_named_instance(&mut self, index: usize) -> Result<()> {
        self.face.set_named_instance(index)
    }
}

enum FontBytes {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl AsRef<[u8]> for FontBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FontBytes::Mapped(mmap) => mmap.as_ref(),
            FontBytes::Owned(bytes) => bytes.as_slice(),
        }
    }
}

/// Face engine reading outlines and metrics through skrifa.
pub struct SkrifaFace {
    bytes: FontBytes,
    index: u32,
    ppem: f32,
    encoding: Encoding,
    units_per_em: u16,
    kern_subtables: usize,
    coordinates: Vec<(Tag, f32)>,
    location: Location,
}

impl SkrifaFace {
    /// Open a face, validating the container, index, size and charmap.
    pub fn open(source: FontSource, index: u32, size: f32, encoding: Encoding) -> Result<Self> {
        if !size.is_finite() || size <= 0.0 {
            return Err(Error::InvalidParameter(
                "font size must be greater than 0".into(),
            ));
        }

        let bytes = load_bytes(source)?;
        let data = bytes.as_ref();
        if !is_valid_font_signature(data) {
            return Err(Error::face(status::UNKNOWN_FILE_FORMAT));
        }

        let faces = match FileRef::new(data) {
            Ok(FileRef::Font(_)) => 1,
            Ok(FileRef::Collection(collection)) => collection.len(),
            Err(e) => {
                log::debug!("Font container rejected: {}", e);
                return Err(Error::face(status::INVALID_FILE_FORMAT));
            }
        };
        if index >= faces {
            return Err(Error::face(status::INVALID_ARGUMENT));
        }

        let font = FontRef::from_index(data, index)
            .map_err(|_| Error::face(status::INVALID_FILE_FORMAT))?;
        let units_per_em = font
            .head()
            .map(|head| head.units_per_em())
            .map_err(|_| Error::face(status::TABLE_MISSING))?;
        if units_per_em == 0 {
            return Err(Error::face(status::INVALID_TABLE));
        }

        if encoding != Encoding::Unicode && !has_charmap(&font, encoding) {
            return Err(Error::face(status::INVALID_CHARMAP_HANDLE));
        }

        let kern_subtables = font.kern().map(|kern| pair_subtables(&kern).count()).unwrap_or(0);

        log::debug!(
            "Opened face {} ({} upem, {} kerning subtables, encoding {})",
            index,
            units_per_em,
            kern_subtables,
            encoding.tag()
        );

        Ok(Self {
            bytes,
            index,
            ppem: size,
            encoding,
            units_per_em,
            kern_subtables,
            coordinates: Vec::new(),
            location: Location::default(),
        })
    }

    fn font_ref(&self) -> Result<FontRef<'_>> {
        FontRef::from_index(self.bytes.as_ref(), self.index)
            .map_err(|_| Error::face(status::INVALID_FACE_HANDLE))
    }

    fn location_ref(&self) -> LocationRef<'_> {
        LocationRef::new(self.location.coords())
    }

    fn map_code(&self, font: &FontRef<'_>, code: u32) -> Option<GlyphId> {
        let cmap = font.cmap().ok()?;
        for record in cmap.encoding_records() {
            if !self
                .encoding
                .matches(record.platform_id(), record.encoding_id())
            {
                continue;
            }
            let Ok(subtable) = record.subtable(cmap.offset_data()) else {
                continue;
            };
            let gid = match subtable {
                CmapSubtable::Format0(table) => table
                    .glyph_id_array()
                    .get(code as usize)
                    .map(|g| GlyphId::new(*g as u32)),
                CmapSubtable::Format4(table) => table.map_codepoint(code),
                CmapSubtable::Format12(table) => table.map_codepoint(code),
                _ => None,
            };
            if let Some(gid) = gid.filter(|g| g.to_u32() != 0) {
                return Some(gid);
            }
        }
        None
    }
}

impl FaceEngine for SkrifaFace {
    fn size_metrics(&self) -> SizeMetrics {
        let ppem = self.ppem.round().clamp(0.0, u16::MAX as f32) as u16;
        let Ok(font) = self.font_ref() else {
            return SizeMetrics {
                x_ppem: ppem,
                y_ppem: ppem,
                ..SizeMetrics::default()
            };
        };
        let metrics = font.metrics(Size::new(self.ppem), self.location_ref());
        let ascender = fixed::from_f32(metrics.ascent);
        let descender = fixed::from_f32(metrics.descent);
        let height = fixed::from_f32(metrics.ascent - metrics.descent + metrics.leading);

        SizeMetrics {
            x_ppem: ppem,
            y_ppem: ppem,
            ascender: (ascender + 63) & -64,
            descender: descender & -64,
            height: (height + 32) & -64,
        }
    }

    fn num_glyphs(&self) -> u32 {
        self.font_ref()
            .and_then(|font| {
                font.maxp()
                    .map(|maxp| maxp.num_glyphs() as u32)
                    .map_err(|_| Error::face(status::TABLE_MISSING))
            })
            .unwrap_or(0)
    }

    fn char_index(&self, ch: char) -> GlyphIndex {
        let Ok(font) = self.font_ref() else {
            return 0;
        };
        let code = ch as u32;
        let gid = match self.encoding {
            Encoding::Unicode => font.charmap().map(ch),
            // Symbol fonts commonly map their glyphs into the private use area.
            Encoding::Symbol => self
                .map_code(&font, code)
                .or_else(|| (code < 0x100).then(|| self.map_code(&font, 0xF000 | code)).flatten()),
            _ => self.map_code(&font, code),
        };
        gid.map(|g| g.to_u32()).unwrap_or(0)
    }

    fn advance(&self, glyph: GlyphIndex, mode: RenderMode) -> Result<i32> {
        let font = self.font_ref()?;
        let advance = font
            .glyph_metrics(Size::new(self.ppem), self.location_ref())
            .advance_width(GlyphId::new(glyph))
            .ok_or_else(|| Error::face(status::INVALID_GLYPH_INDEX))?;
        let advance = fixed::from_f32(advance);
        Ok(match mode {
            RenderMode::Mono => (advance + 32) & -64,
            RenderMode::Antialiased => advance,
        })
    }

    fn has_kerning(&self) -> bool {
        self.kern_subtables > 0
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> Option<Vector> {
        if self.kern_subtables == 0 {
            return None;
        }
        let kern = self.font_ref().ok()?.kern().ok()?;
        let units = kern_pair(&kern, GlyphId::new(left), GlyphId::new(right))?;
        let px = units as f32 * self.ppem / self.units_per_em as f32;
        Some(Vector::new(fixed::from_f32(px), 0))
    }

    fn outline(&self, glyph: GlyphIndex, _mode: RenderMode) -> Result<Outline> {
        let font = self.font_ref()?;
        let glyph = font
            .outline_glyphs()
            .get(GlyphId::new(glyph))
            .ok_or_else(|| Error::face(status::INVALID_GLYPH_INDEX))?;
        let mut outline = Outline::new();
        glyph
            .draw(
                DrawSettings::unhinted(Size::new(self.ppem), self.location_ref()),
                &mut outline,
            )
            .map_err(|e| {
                log::debug!("Outline extraction failed: {:?}", e);
                Error::face(status::INVALID_OUTLINE)
            })?;
        Ok(outline)
    }

    fn shaping_data(&self) -> Option<ShapingData<'_>> {
        Some(ShapingData {
            data: self.bytes.as_ref(),
            index: self.index,
            ppem: self.ppem,
            variations: self
                .coordinates
                .iter()
                .map(|(tag, value)| (tag.to_be_bytes(), *value))
                .collect(),
        })
    }

    fn variation_axes(&self) -> Result<Vec<VariationAxis>> {
        let font = self.font_ref()?;
        let axes: Vec<VariationAxis> = font
            .axes()
            .iter()
            .map(|axis| VariationAxis {
                tag: axis.tag().to_string(),
                name: font
                    .localized_strings(axis.name_id())
                    .english_or_first()
                    .map(|name| name.chars().collect()),
                minimum: axis.min_value(),
                default: axis.default_value(),
                maximum: axis.max_value(),
            })
            .collect();
        if axes.is_empty() {
            return Err(Error::face(status::UNIMPLEMENTED_FEATURE));
        }
        Ok(axes)
    }

    fn named_instances(&self) -> Result<Vec<NamedInstance>> {
        let font = self.font_ref()?;
        if font.axes().is_empty() {
            return Err(Error::face(status::UNIMPLEMENTED_FEATURE));
        }
        Ok(font
            .named_instances()
            .iter()
            .map(|instance| NamedInstance {
                name: font
                    .localized_strings(instance.subfamily_name_id())
                    .english_or_first()
                    .map(|name| name.chars().collect()),
                coordinates: instance.user_coords().collect(),
            })
            .collect())
    }

    fn set_variation(&mut self, coordinates: &[f32]) -> Result<()> {
        let (clamped, location) = {
            let font = self.font_ref()?;
            let axes = font.axes();
            let bounds: Vec<AxisBounds> = axes
                .iter()
                .map(|axis| AxisBounds {
                    tag: axis.tag(),
                    minimum: axis.min_value(),
                    maximum: axis.max_value(),
                })
                .collect();
            let clamped = clamp_to_axes(&bounds, coordinates)?;
            let location = axes.location(clamped.iter().copied());
            (clamped, location)
        };

        self.coordinates = clamped;
        self.location = location;
        Ok(())
    }

    fn set_named_instance(&mut self, index: usize) -> Result<()> {
        let coordinates: Vec<f32> = {
            let font = self.font_ref()?;
            if font.axes().is_empty() {
                return Err(Error::face(status::UNIMPLEMENTED_FEATURE));
            }
            let instance = font
                .named_instances()
                .get(index)
                .ok_or_else(|| Error::face(status::INVALID_ARGUMENT))?;
            instance.user_coords().collect()
        };
        self.set_variation(&coordinates)
    }
}

fn load_bytes(source: FontSource) -> Result<FontBytes> {
    match source {
        FontSource::Bytes(bytes) => Ok(FontBytes::Owned(bytes)),
        FontSource::Path(path) => {
            let file = File::open(&path).map_err(|e| {
                log::debug!("Cannot open {}: {}", path.display(), e);
                Error::face(status::CANNOT_OPEN_RESOURCE)
            })?;
            let len = file
                .metadata()
                .map_err(|_| Error::face(status::CANNOT_OPEN_STREAM))?
                .len();
            if len == 0 {
                return Err(Error::face(status::UNKNOWN_FILE_FORMAT));
            }
            // The mapping lives as long as the face; the file is not mutated
            // while mapped.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
                log::debug!("Cannot map {}: {}", path.display(), e);
                Error::face(status::CANNOT_OPEN_STREAM)
            })?;
            Ok(FontBytes::Mapped(mmap))
        }
    }
}

/// Design-space range of one variation axis.
#[derive(Debug, Clone, Copy)]
struct AxisBounds {
    tag: Tag,
    minimum: f32,
    maximum: f32,
}

/// Pair coordinates with axes in order, clamped to each axis range.
///
/// Fewer coordinates than axes leave the remaining axes at their default.
fn clamp_to_axes(axes: &[AxisBounds], coordinates: &[f32]) -> Result<Vec<(Tag, f32)>> {
    if axes.is_empty() {
        return Err(Error::face(status::UNIMPLEMENTED_FEATURE));
    }
    if coordinates.len() > axes.len() {
        return Err(Error::face(status::INVALID_ARGUMENT));
    }

    Ok(axes
        .iter()
        .zip(coordinates)
        .map(|(axis, &value)| {
            let bounded = value.clamp(axis.minimum, axis.maximum);
            if (bounded - value).abs() > 0.001 {
                log::warn!(
                    "Coordinate for axis '{}' clamped from {} to {} (bounds: [{}, {}])",
                    axis.tag,
                    value,
                    bounded,
                    axis.minimum,
                    axis.maximum
                );
            }
            (axis.tag, bounded)
        })
        .collect())
}

/// Horizontal, in-stream format 0 subtables of a legacy `kern` table.
fn pair_subtables<'a>(kern: &Kern<'a>) -> impl Iterator<Item = SubtableKind<'a>> + 'a {
    kern.subtables()
        .filter_map(|subtable| subtable.ok())
        .filter(|subtable| subtable.is_horizontal() && !subtable.is_cross_stream())
        .filter_map(|subtable| match subtable.kind() {
            Ok(kind @ SubtableKind::Format0(_)) => Some(kind),
            _ => None,
        })
}

/// Pair adjustment in font units, summed over every pair subtable.
fn kern_pair(kern: &Kern<'_>, left: GlyphId, right: GlyphId) -> Option<i32> {
    pair_subtables(kern)
        .filter_map(|kind| match kind {
            SubtableKind::Format0(pairs) => pairs.kerning(left, right),
            _ => None,
        })
        .reduce(|total, value| total + value)
}

/// True when `data` starts with an sfnt or collection tag.
fn is_valid_font_signature(data: &[u8]) -> bool {
    matches!(
        data.get(..4),
        Some([0x00, 0x01, 0x00, 0x00]) | Some(b"OTTO") | Some(b"true") | Some(b"ttcf")
    )
}

fn has_charmap(font: &FontRef<'_>, encoding: Encoding) -> bool {
    font.cmap()
        .map(|cmap| {
            cmap.encoding_records()
                .iter()
                .any(|record| encoding.matches(record.platform_id(), record.encoding_id()))
        })
        .unwrap_or(false)
}
