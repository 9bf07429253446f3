// this_file: src/shaping.rs
//! Text layout: turning a string into a run of positioned glyphs.
//!
//! Two strategies exist. Complex layout hands the text to HarfBuzz and
//! honours direction, language and OpenType features. Basic layout maps
//! characters one by one through the face charmap and applies legacy pair
//! kerning; it rejects every option it cannot honour.

use crate::capabilities;
use crate::config::LayoutEngine;
use crate::error::{Error, Result};
use crate::face::{FaceEngine, GlyphIndex, RenderMode};
use crate::fixed;
use crate::fonts::Font;
use log::debug;
use std::str::FromStr;

/// Writing direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
    Ttb,
}

impl Direction {
    pub fn is_vertical(self) -> bool {
        self == Direction::Ttb
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ltr" => Ok(Direction::Ltr),
            "rtl" => Ok(Direction::Rtl),
            "ttb" => Ok(Direction::Ttb),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

/// Per-call layout and rendering options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextOptions {
    pub mode: RenderMode,
    pub direction: Option<Direction>,
    /// OpenType feature strings such as `liga`, `-kern` or `aalt=2`
    pub features: Option<Vec<String>>,
    /// BCP 47 language tag
    pub language: Option<String>,
    /// Two-character anchor such as `la` or `ms`
    pub anchor: Option<String>,
}

impl TextOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor = Some(anchor.into());
        self
    }

    fn has_complex_options(&self) -> bool {
        self.direction.is_some() || self.language.is_some() || self.features.is_some()
    }
}

/// One positioned glyph. Advances and offsets are 26.6, y up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlyphRecord {
    pub index: GlyphIndex,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
    /// Byte offset of the source character in the text
    pub cluster: usize,
}

/// The output of one layout call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphRun {
    pub glyphs: Vec<GlyphRecord>,
    pub direction: Direction,
}

impl GlyphRun {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_vertical(&self) -> bool {
        self.direction.is_vertical()
    }
}

/// A parsed OpenType feature setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureSetting {
    pub tag: [u8; 4],
    pub value: u32,
}

impl FromStr for FeatureSetting {
    type Err = Error;

    /// Accepts `tag`, `+tag`, `-tag` and `tag=value` (value may be `on`/`off`).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Shaping(format!("failed to add font feature '{}'", s));
        let trimmed = s.trim();
        let (default, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (0, &trimmed[1..]),
            Some(b'+') => (1, &trimmed[1..]),
            _ => (1, trimmed),
        };

        let (name, value) = match body.split_once('=') {
            Some((name, value)) => {
                let value = match value.trim() {
                    "on" | "true" => 1,
                    "off" | "false" => 0,
                    number => number.parse::<u32>().map_err(|_| invalid())?,
                };
                (name.trim(), value)
            }
            None => (body, default),
        };

        if name.is_empty() || name.len() > 4 || !name.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(invalid());
        }
        let mut tag = [b' '; 4];
        tag[..name.len()].copy_from_slice(name.as_bytes());
        Ok(FeatureSetting { tag, value })
    }
}

/// Lay out `text` with the strategy the font and process allow.
pub fn layout(font: &Font, text: &str, options: &TextOptions) -> Result<GlyphRun> {
    if let Some(run) = layout_complex_if_available(font, text, options) {
        return run;
    }
    layout_basic(font.face(), text, options)
}

/// Character-by-character layout with legacy kerning.
///
/// Kerning between two mapped glyphs is rounded up to whole pixels and
/// added to the first glyph's advance.
pub fn layout_basic(face: &dyn FaceEngine, text: &str, options: &TextOptions) -> Result<GlyphRun> {
    if options.has_complex_options() {
        return Err(Error::UnsupportedLayoutOption);
    }

    let kerning = face.has_kerning();
    let mut glyphs: Vec<GlyphRecord> = Vec::with_capacity(text.len());
    let mut last_index: GlyphIndex = 0;

    for (cluster, ch) in text.char_indices() {
        let index = face.char_index(ch);

        if kerning && last_index != 0 && index != 0 {
            if let (Some(delta), Some(prev)) = (face.kerning(last_index, index), glyphs.last_mut())
            {
                prev.x_advance += fixed::ceil_px(delta.x) * fixed::ONE;
            }
        }

        let x_advance = face.advance(index, options.mode)?;
        glyphs.push(GlyphRecord {
            index,
            x_advance,
            y_advance: 0,
            x_offset: 0,
            y_offset: 0,
            cluster,
        });
        last_index = index;
    }

    debug!("Basic layout produced {} glyphs", glyphs.len());
    Ok(GlyphRun {
        glyphs,
        direction: Direction::Ltr,
    })
}

#[cfg(feature = "complex-shaping")]
fn layout_complex_if_available(
    font: &Font,
    text: &str,
    options: &TextOptions,
) -> Option<Result<GlyphRun>> {
    let caps = capabilities::shaping();
    if !caps.available || font.layout_engine() != LayoutEngine::Complex {
        return None;
    }
    let data = font.face().shaping_data()?;
    Some(complex::shape(&data, text, options, caps))
}

#[cfg(not(feature = "complex-shaping"))]
fn layout_complex_if_available(
    font: &Font,
    _text: &str,
    _options: &TextOptions,
) -> Option<Result<GlyphRun>> {
    if font.layout_engine() == LayoutEngine::Complex && capabilities::shaping().available {
        log::warn!("Complex layout requested but not compiled in");
    }
    None
}

#[cfg(feature = "complex-shaping")]
mod complex {
    use super::{Direction, FeatureSetting, GlyphRecord, GlyphRun, TextOptions};
    use crate::capabilities::ShapingCapabilities;
    use crate::error::{Error, Result};
    use crate::face::ShapingData;
    use harfbuzz_rs::{
        Direction as HbDirection, Face, Feature, Font as HbFont, Language, Tag, UnicodeBuffer,
        Variation,
    };
    use std::str::FromStr;

    fn tag(bytes: [u8; 4]) -> Tag {
        Tag::new(
            bytes[0] as char,
            bytes[1] as char,
            bytes[2] as char,
            bytes[3] as char,
        )
    }

    /// Shape `text` in a fresh HarfBuzz session.
    pub(super) fn shape(
        data: &ShapingData<'_>,
        text: &str,
        options: &TextOptions,
        caps: &ShapingCapabilities,
    ) -> Result<GlyphRun> {
        let direction = options.direction.unwrap_or_default();
        if direction.is_vertical() && !caps.vertical_layout {
            return Err(Error::EngineUnavailable(format!(
                "{} does not support 'ttb' direction",
                caps.engine
            )));
        }

        let features = options
            .features
            .iter()
            .flatten()
            .map(|f| {
                f.parse::<FeatureSetting>()
                    .map(|setting| Feature::new(tag(setting.tag), setting.value, 0..usize::MAX))
            })
            .collect::<Result<Vec<Feature>>>()?;

        if text.is_empty() {
            return Ok(GlyphRun {
                glyphs: Vec::new(),
                direction,
            });
        }

        let face = Face::from_bytes(data.data, data.index);
        let mut hb_font = HbFont::new(face);
        let scale = (data.ppem * 64.0).round() as i32;
        hb_font.set_scale(scale, scale);
        if !data.variations.is_empty() {
            let variations: Vec<Variation> = data
                .variations
                .iter()
                .map(|(axis, value)| Variation::new(tag(*axis), *value))
                .collect();
            hb_font.set_variations(&variations);
        }

        let mut buffer = UnicodeBuffer::new().add_str(text);
        // Without an explicit direction HarfBuzz guesses it from the text.
        if options.direction.is_some() {
            buffer = buffer.set_direction(match direction {
                Direction::Ltr => HbDirection::Ltr,
                Direction::Rtl => HbDirection::Rtl,
                Direction::Ttb => HbDirection::Ttb,
            });
        }
        if let Some(lang) = options.language.as_deref() {
            let language = Language::from_str(lang)
                .map_err(|_| Error::Shaping(format!("failed to set language '{}'", lang)))?;
            buffer = buffer.set_language(language);
        }

        let output = harfbuzz_rs::shape(&hb_font, buffer, &features);
        let positions = output.get_glyph_positions();
        let infos = output.get_glyph_infos();
        if positions.len() != infos.len() {
            return Err(Error::Shaping(format!(
                "glyph position/info count mismatch: {} vs {}",
                positions.len(),
                infos.len()
            )));
        }

        let glyphs: Vec<GlyphRecord> = infos
            .iter()
            .zip(positions.iter())
            .map(|(info, pos)| GlyphRecord {
                index: info.codepoint,
                x_advance: pos.x_advance,
                y_advance: pos.y_advance,
                x_offset: pos.x_offset,
                y_offset: pos.y_offset,
                cluster: info.cluster as usize,
            })
            .collect();

        log::debug!(
            "Complex layout produced {} glyphs ({:?})",
            glyphs.len(),
            direction
        );
        Ok(GlyphRun { glyphs, direction })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directions() {
        assert_eq!("ltr".parse::<Direction>().unwrap(), Direction::Ltr);
        assert_eq!("rtl".parse::<Direction>().unwrap(), Direction::Rtl);
        assert_eq!("ttb".parse::<Direction>().unwrap(), Direction::Ttb);
        let err = "btt".parse::<Direction>().unwrap_err();
        assert!(matches!(err, Error::InvalidDirection(ref d) if d == "btt"));
    }

    #[test]
    fn parses_feature_settings() {
        let liga: FeatureSetting = "liga".parse().unwrap();
        assert_eq!(liga, FeatureSetting { tag: *b"liga", value: 1 });

        let off: FeatureSetting = "-kern".parse().unwrap();
        assert_eq!(off, FeatureSetting { tag: *b"kern", value: 0 });

        let on: FeatureSetting = "+kern".parse().unwrap();
        assert_eq!(on.value, 1);

        let alt: FeatureSetting = "aalt=2".parse().unwrap();
        assert_eq!(alt, FeatureSetting { tag: *b"aalt", value: 2 });

        let short: FeatureSetting = "cv1".parse().unwrap();
        assert_eq!(&short.tag, b"cv1 ");
    }

    #[test]
    fn rejects_malformed_features() {
        for bad in ["", "-", "toolong", "liga=x"] {
            assert!(bad.parse::<FeatureSetting>().is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn options_builder_marks_complex_options() {
        assert!(!TextOptions::new().anchor("ms").has_complex_options());
        assert!(TextOptions::new().language("en").has_complex_options());
        assert!(TextOptions::new()
            .features(Vec::<String>::new())
            .has_complex_options());
    }
}
