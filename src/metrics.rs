// this_file: src/metrics.rs
//! Text extents and anchor offsets.
//!
//! The extent is the union of the grid-fitted control boxes of every glyph
//! placed along the pen, widened to cover the advanced pen position along
//! the writing direction. The offset locates the box's top-left corner
//! relative to the requested anchor point.

use crate::error::{Error, Result};
use crate::face::ControlBox;
use crate::fixed::{self, Vector};
use crate::fonts::Font;
use crate::shaping::{self, TextOptions};
use serde::Serialize;

/// Size of rendered text and where it sits relative to the anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TextExtent {
    pub width: i32,
    pub height: i32,
    /// Horizontal distance from the anchor to the left edge
    pub offset_x: i32,
    /// Vertical distance from the anchor down to the top edge
    pub offset_y: i32,
}

impl TextExtent {
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }
}

/// A validated two-character anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub horizontal: char,
    pub vertical: char,
}

/// Horizontal and vertical anchor characters legal for horizontal text.
pub const HORIZONTAL_TEXT_ANCHORS: (&str, &str) = ("lmr", "atmsbd");
/// Horizontal and vertical anchor characters legal for vertical text.
pub const VERTICAL_TEXT_ANCHORS: (&str, &str) = ("lmrs", "tmb");

impl Anchor {
    /// Default anchor for a writing direction: left-ascender or left-top.
    pub fn default_for(vertical_text: bool) -> Self {
        if vertical_text {
            Anchor {
                horizontal: 'l',
                vertical: 't',
            }
        } else {
            Anchor {
                horizontal: 'l',
                vertical: 'a',
            }
        }
    }

    /// Parse and check an anchor against the table for the direction.
    pub fn parse(anchor: &str, vertical_text: bool) -> Result<Self> {
        let bad = || Error::BadAnchor(anchor.to_string());
        let mut chars = anchor.chars();
        let (Some(horizontal), Some(vertical), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(bad());
        };

        let (h_legal, v_legal) = if vertical_text {
            VERTICAL_TEXT_ANCHORS
        } else {
            HORIZONTAL_TEXT_ANCHORS
        };
        if !h_legal.contains(horizontal) || !v_legal.contains(vertical) {
            return Err(bad());
        }
        Ok(Anchor {
            horizontal,
            vertical,
        })
    }
}

impl Font {
    /// Measure `text`: tight pixel size and the offset from the anchor.
    ///
    /// Empty text measures as all zeros.
    pub fn measure(&self, text: &str, options: &TextOptions) -> Result<TextExtent> {
        let vertical_text = options.direction.is_some_and(|d| d.is_vertical());
        let anchor = match options.anchor.as_deref() {
            Some(anchor) => Anchor::parse(anchor, vertical_text)?,
            None => Anchor::default_for(vertical_text),
        };

        let run = shaping::layout(self, text, options)?;
        if run.is_empty() {
            return Ok(TextExtent::default());
        }
        let vertical = run.is_vertical();

        let mut position: i32 = 0;
        let mut bbox = ControlBox::default();
        for glyph in &run.glyphs {
            let pen = if vertical {
                let pen = Vector::new(glyph.x_offset, position + glyph.y_offset);
                position += glyph.y_advance;
                bbox.y_min = bbox.y_min.min(fixed::ceil_px(position));
                pen
            } else {
                let pen = Vector::new(position + glyph.x_offset, glyph.y_offset);
                position += glyph.x_advance;
                bbox.x_max = bbox.x_max.max(fixed::ceil_px(position));
                pen
            };

            let outline = self.face.outline(glyph.index, options.mode)?;
            let cbox = outline.control_box(pen, 0);
            bbox.x_min = bbox.x_min.min(cbox.x_min);
            bbox.y_min = bbox.y_min.min(cbox.y_min);
            bbox.x_max = bbox.x_max.max(cbox.x_max);
            bbox.y_max = bbox.y_max.max(cbox.y_max);
        }

        let (x_anchor, y_anchor) = if vertical {
            let x = match anchor.horizontal {
                'l' => bbox.x_min,
                'm' => (bbox.x_min + bbox.x_max) / 2,
                'r' => bbox.x_max,
                _ => 0,
            };
            let y = match anchor.vertical {
                'm' => fixed::ceil_px(position / 2),
                'b' => fixed::ceil_px(position),
                _ => 0,
            };
            (x, y)
        } else {
            let metrics = self.face.size_metrics();
            let x = match anchor.horizontal {
                'm' => fixed::ceil_px(position / 2),
                'r' => fixed::ceil_px(position),
                _ => 0,
            };
            let y = match anchor.vertical {
                'a' => fixed::ceil_px(metrics.ascender),
                't' => bbox.y_max,
                'm' => fixed::ceil_px((metrics.ascender + metrics.descender) / 2),
                'b' => bbox.y_min,
                'd' => fixed::ceil_px(metrics.descender),
                _ => 0,
            };
            (x, y)
        };

        let extent = TextExtent {
            width: bbox.x_max - bbox.x_min,
            height: bbox.y_max - bbox.y_min,
            offset_x: bbox.x_min - x_anchor,
            offset_y: -(bbox.y_max - y_anchor),
        };
        log::debug!(
            "Measured {} glyphs: {}x{} offset ({}, {})",
            run.len(),
            extent.width,
            extent.height,
            extent.offset_x,
            extent.offset_y
        );
        Ok(extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_legal_horizontal_anchor_parses() {
        for h in HORIZONTAL_TEXT_ANCHORS.0.chars() {
            for v in HORIZONTAL_TEXT_ANCHORS.1.chars() {
                let anchor = format!("{h}{v}");
                assert!(Anchor::parse(&anchor, false).is_ok(), "{anchor}");
            }
        }
    }

    #[test]
    fn every_legal_vertical_anchor_parses() {
        for h in VERTICAL_TEXT_ANCHORS.0.chars() {
            for v in VERTICAL_TEXT_ANCHORS.1.chars() {
                let anchor = format!("{h}{v}");
                assert!(Anchor::parse(&anchor, true).is_ok(), "{anchor}");
            }
        }
    }

    #[test]
    fn direction_specific_anchors_are_rejected_elsewhere() {
        assert!(Anchor::parse("sa", false).is_err());
        assert!(Anchor::parse("la", true).is_err());
        assert!(Anchor::parse("ls", true).is_err());
        assert!(Anchor::parse("ld", true).is_err());
    }

    #[test]
    fn bad_anchor_names_the_string() {
        for bad in ["", "l", "lax", "xx", "ål"] {
            match Anchor::parse(bad, false) {
                Err(Error::BadAnchor(name)) => assert_eq!(name, bad),
                other => panic!("{bad:?}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn defaults_depend_on_direction() {
        assert_eq!(Anchor::default_for(false), Anchor::parse("la", false).unwrap());
        assert_eq!(Anchor::default_for(true), Anchor::parse("lt", true).unwrap());
    }
}
