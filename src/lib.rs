// this_file: src/lib.rs
//! imgbridge - glue between an image library and its native engines
//!
//! This library provides functionality for:
//! - Text layout through a complex shaper or a basic kerning-only path
//! - Text measurement with anchor resolution
//! - Rendering filled or stroked glyphs into 8-bit rasters
//! - Incremental JPEG XL decoding driven by codec events, from buffers or
//!   seekable streams, with frame iteration, rewind and skip

pub mod capabilities;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod face;
pub mod feeder;
pub mod fixed;
pub mod fonts;
pub mod logging;
pub mod metrics;
pub mod raster;
pub mod rasterize;
pub mod render;
pub mod shaping;
pub mod status;

// Re-export commonly used types
pub use codec::{check_signature, BoxType, CodecEngine, Signature};
pub use config::{Config, DecoderOptions, FontOptions, LayoutEngine};
pub use decoder::{Decoder, FrameInfo, ImageInfo};
pub use error::{Error, Result};
pub use face::{FaceEngine, RenderMode};
pub use fonts::{Font, FontSource};
pub use metrics::{Anchor, TextExtent};
pub use raster::{PixelFormat, Raster};
pub use shaping::{Direction, GlyphRecord, GlyphRun, TextOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
