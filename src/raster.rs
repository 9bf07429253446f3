// this_file: src/raster.rs
//! Caller-owned pixel rasters.
//!
//! Text is rendered into 8-bit single channel rasters; decoded frames are
//! delivered into a raster of any [`PixelFormat`].

use crate::codec::{PixelLayout, PixelSink, SampleType};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Pixel storage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance
    L,
    /// 8-bit luminance with alpha
    LA,
    /// 16-bit luminance, native endianness
    I16,
    /// 32-bit float luminance
    F,
    /// 8-bit RGB stored in 4 bytes with an opaque padding byte
    Rgb,
    /// 8-bit RGBA
    Rgba,
}

impl PixelFormat {
    /// Bytes each pixel occupies in the raster.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::L => 1,
            PixelFormat::LA | PixelFormat::I16 => 2,
            PixelFormat::F | PixelFormat::Rgb | PixelFormat::Rgba => 4,
        }
    }

    /// Layout the codec must produce for this format.
    pub fn codec_layout(self) -> PixelLayout {
        match self {
            PixelFormat::L => PixelLayout::new(1, SampleType::U8),
            PixelFormat::LA => PixelLayout::new(2, SampleType::U8),
            PixelFormat::I16 => PixelLayout::new(1, SampleType::U16),
            PixelFormat::F => PixelLayout::new(1, SampleType::F32),
            PixelFormat::Rgb => PixelLayout::new(3, SampleType::U8),
            PixelFormat::Rgba => PixelLayout::new(4, SampleType::U8),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PixelFormat::L => "L",
            PixelFormat::LA => "LA",
            PixelFormat::I16 => "I;16",
            PixelFormat::F => "F",
            PixelFormat::Rgb => "RGB",
            PixelFormat::Rgba => "RGBA",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "L" => Ok(PixelFormat::L),
            "LA" => Ok(PixelFormat::LA),
            "I;16" | "I16" => Ok(PixelFormat::I16),
            "F" => Ok(PixelFormat::F),
            "RGB" => Ok(PixelFormat::Rgb),
            "RGBA" => Ok(PixelFormat::Rgba),
            other => Err(Error::InvalidParameter(format!(
                "unsupported pixel format '{}'",
                other
            ))),
        }
    }
}

/// A width x height grid of pixels in row-major order.
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    format: PixelFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl fmt::Debug for Raster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Raster")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Raster {
    /// A zero-filled raster.
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        let len = format.bytes_per_pixel() * width as usize * height as usize;
        Self {
            format,
            width,
            height,
            data: vec![0; len],
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn stride(&self) -> usize {
        self.format.bytes_per_pixel() * self.width as usize
    }

    /// Bytes of row `y`; panics when out of range.
    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Bytes of one pixel, if inside the raster.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let start = y as usize * self.stride() + x as usize * bpp;
        self.data.get(start..start + bpp)
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// True when every byte is zero.
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }
}

/// Writes codec pixel runs into a raster, clipping to its bounds.
pub struct FrameSink<'a> {
    raster: &'a mut Raster,
}

impl<'a> FrameSink<'a> {
    pub fn new(raster: &'a mut Raster) -> Self {
        Self { raster }
    }
}

impl PixelSink for FrameSink<'_> {
    fn write_run(&mut self, x: usize, y: usize, num_pixels: usize, pixels: &[u8]) {
        let width = self.raster.width as usize;
        if y >= self.raster.height as usize || x >= width {
            return;
        }
        let count = num_pixels.min(width - x);
        let format = self.raster.format;
        let row = self.raster.row_mut(y as u32);

        match format {
            PixelFormat::Rgb => {
                for (i, src) in pixels.chunks_exact(3).take(count).enumerate() {
                    let dst = &mut row[(x + i) * 4..(x + i) * 4 + 4];
                    dst[..3].copy_from_slice(src);
                    dst[3] = 255;
                }
            }
            _ => {
                let bpp = format.bytes_per_pixel();
                let len = (count * bpp).min(pixels.len());
                row[x * bpp..x * bpp + len].copy_from_slice(&pixels[..len]);
            }
        }
    }
}
