// this_file: src/fixed.rs
//! 26.6 fixed-point helpers.
//!
//! Positions, advances and metrics travel through the layout pipeline as
//! `i32` values with 6 fractional bits (64 units per pixel).

/// Units per pixel in 26.6.
pub const ONE: i32 = 64;

/// Round a 26.6 coordinate up to whole pixels.
///
/// Any fractional unit rounds towards positive infinity, including for
/// negative values: `-32` (half a pixel left) becomes `0`.
#[inline]
pub fn ceil_px(value: i32) -> i32 {
    (value + 63) >> 6
}

/// Floor a 26.6 coordinate to whole pixels.
#[inline]
pub fn floor_px(value: i32) -> i32 {
    value >> 6
}

/// Convert float pixels to 26.6, rounding to the nearest unit.
#[inline]
pub fn from_f32(px: f32) -> i32 {
    (px * ONE as f32).round() as i32
}

/// Convert 26.6 to float pixels.
#[inline]
pub fn to_f32(value: i32) -> f32 {
    value as f32 / ONE as f32
}

/// A 2D vector in 26.6 units (y grows upwards).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Vector {
    pub x: i32,
    pub y: i32,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}
