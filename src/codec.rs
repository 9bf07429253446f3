// this_file: src/codec.rs
//! The JPEG XL codec contract.
//!
//! The codec is a pull-based state machine: callers hand it input, call
//! [`CodecEngine::process_input`] and react to the [`Event`] it returns.
//! Only subscribed informational events are reported; status events
//! (success, error, need more input, need output buffer, box output full)
//! are always reported.

use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;

/// Leading bytes of a bare JPEG XL codestream.
pub const CODESTREAM_SIGNATURE: [u8; 2] = [0xFF, 0x0A];

/// Leading bytes of a JPEG XL container (an ISOBMFF `JXL ` box).
pub const CONTAINER_SIGNATURE: [u8; 12] = [
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Events returned by [`CodecEngine::process_input`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// All requested work is done
    Success,
    /// The codec failed; the session cannot continue
    Error,
    /// More input is required to make progress
    NeedMoreInput,
    /// Basic image information is available
    BasicInfo,
    /// The color profile is available
    ColorEncoding,
    /// A frame header is available
    Frame,
    /// The codec needs the pixel layout before delivering pixels
    NeedImageOutBuffer,
    /// All pixels of the current frame were delivered
    FullImage,
    /// A container box starts
    Box,
    /// The current box buffer is full
    BoxNeedMoreOutput,
}

impl Event {
    /// Subscription bit for informational events; `None` for status events.
    pub fn subscription(self) -> Option<EventSet> {
        match self {
            Event::BasicInfo => Some(EventSet::BASIC_INFO),
            Event::ColorEncoding => Some(EventSet::COLOR_ENCODING),
            Event::Frame => Some(EventSet::FRAME),
            Event::FullImage => Some(EventSet::FULL_IMAGE),
            Event::Box => Some(EventSet::BOX),
            _ => None,
        }
    }
}

/// A set of subscribable events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u32);

impl EventSet {
    pub const NONE: EventSet = EventSet(0);
    pub const BASIC_INFO: EventSet = EventSet(1 << 0);
    pub const COLOR_ENCODING: EventSet = EventSet(1 << 1);
    pub const FRAME: EventSet = EventSet(1 << 2);
    pub const FULL_IMAGE: EventSet = EventSet(1 << 3);
    pub const BOX: EventSet = EventSet(1 << 4);

    pub const fn union(self, other: EventSet) -> EventSet {
        EventSet(self.0 | other.0)
    }

    pub const fn contains(self, other: EventSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the codec reports `event` under this subscription.
    pub fn reports(self, event: Event) -> bool {
        event.subscription().map_or(true, |bit| self.contains(bit))
    }
}

impl BitOr for EventSet {
    type Output = EventSet;

    fn bitor(self, rhs: EventSet) -> EventSet {
        self.union(rhs)
    }
}

/// Sample encoding of delivered pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl SampleType {
    pub fn bytes(self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
            SampleType::F32 => 4,
        }
    }
}

/// Interleaved pixel layout requested from the codec. Samples are native
/// endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub channels: u32,
    pub sample: SampleType,
}

impl PixelLayout {
    pub const fn new(channels: u32, sample: SampleType) -> Self {
        Self { channels, sample }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.channels as usize * self.sample.bytes()
    }
}

/// Receives decoded scanline fragments.
pub trait PixelSink {
    /// `pixels` holds `num_pixels` pixels in the registered layout, starting
    /// at column `x` of row `y`.
    fn write_run(&mut self, x: usize, y: usize, num_pixels: usize, pixels: &[u8]);
}

/// Sink that discards pixels.
#[derive(Debug, Default)]
pub struct NullSink;

impl PixelSink for NullSink {
    fn write_run(&mut self, _x: usize, _y: usize, _num_pixels: usize, _pixels: &[u8]) {}
}

/// Four-byte container box type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoxType([u8; 4]);

impl BoxType {
    /// Build a box type; anything but exactly four bytes is rejected.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let tag: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::InvalidBoxType(bytes.len()))?;
        Ok(BoxType(tag))
    }

    pub const fn from_tag(tag: [u8; 4]) -> Self {
        BoxType(tag)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxType(\"{}\")", self)
    }
}

impl Serialize for BoxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Animation parameters from the image header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnimationHeader {
    pub tps_numerator: u32,
    pub tps_denominator: u32,
    pub num_loops: u32,
    pub have_timecodes: bool,
}

/// Image-level information reported with the basic-info event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BasicInfo {
    pub have_container: bool,
    pub xsize: u32,
    pub ysize: u32,
    pub bits_per_sample: u32,
    pub exponent_bits_per_sample: u32,
    pub intensity_target: f32,
    pub min_nits: f32,
    pub relative_to_max_display: bool,
    pub linear_below: f32,
    pub uses_original_profile: bool,
    pub have_preview: bool,
    pub have_animation: bool,
    pub orientation: u32,
    pub num_color_channels: u32,
    pub num_extra_channels: u32,
    pub alpha_bits: u32,
    pub alpha_exponent_bits: u32,
    pub alpha_premultiplied: bool,
    /// Preview size, when `have_preview`
    pub preview: Option<(u32, u32)>,
    /// Animation header, when `have_animation`
    pub animation: Option<AnimationHeader>,
    /// Intrinsic display size, when it differs from the coded size
    pub intrinsic_size: Option<(u32, u32)>,
}

impl BasicInfo {
    pub fn size(&self) -> (u32, u32) {
        (self.xsize, self.ysize)
    }
}

/// Header of the frame that was just announced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameHeader {
    /// Duration in animation ticks
    pub duration: u32,
    pub timecode: u32,
    /// Length of the frame name in bytes; 0 when unnamed
    pub name_length: u32,
    pub is_last: bool,
}

/// Contract of an incremental JPEG XL decoder.
///
/// Queries are only valid right after the event that makes their data
/// available. The engine copies whatever input it has not consumed yet
/// when [`release_input`](CodecEngine::release_input) is called and reports
/// its size; callers re-supply those bytes with the next chunk.
pub trait CodecEngine {
    /// Version string of the codec library.
    fn version(&self) -> String;

    /// Choose which informational events are reported. Only valid before
    /// the first `process_input` after creation or rewind.
    fn subscribe_events(&mut self, events: EventSet) -> Result<()>;

    fn set_input(&mut self, data: &[u8]) -> Result<()>;

    /// Declare that no input follows the current chunk.
    fn close_input(&mut self);

    /// Drop the current input; returns how many bytes were not consumed.
    fn release_input(&mut self) -> usize;

    /// Advance the state machine. Pixels go to `sink` once a layout is set.
    fn process_input(&mut self, sink: &mut dyn PixelSink) -> Event;

    fn basic_info(&self) -> Result<BasicInfo>;

    /// Size of the ICC profile in bytes; 0 when there is none.
    fn icc_profile_size(&self) -> Result<usize>;

    /// Copy the ICC profile; `buf` must be exactly the reported size.
    fn icc_profile(&self, buf: &mut [u8]) -> Result<()>;

    fn frame_header(&self) -> Result<FrameHeader>;

    fn frame_name(&self) -> Result<String>;

    /// Register the pixel layout for the current frame.
    fn set_image_out_format(&mut self, layout: PixelLayout) -> Result<()>;

    /// Type of the box just announced.
    fn box_type(&self) -> Result<BoxType>;

    /// Give the codec storage for box content; it writes from `start`.
    fn set_box_buffer(&mut self, buffer: Vec<u8>, start: usize) -> Result<()>;

    /// Take back the box buffer with the number of unwritten bytes at its end.
    fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)>;

    /// Transparently decompress `brob` boxes.
    fn set_decompress_boxes(&mut self, decompress: bool) -> Result<()>;

    /// Return to the start of the input, keeping settings.
    fn rewind(&mut self);

    /// Skip the next `count` frames without delivering pixels.
    fn skip_frames(&mut self, count: usize);
}

/// The kind of JPEG XL file detected from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Signature {
    Codestream,
    Container,
}

/// Check whether `prefix` starts a JPEG XL file.
///
/// An empty prefix, or one too short to decide but consistent with a
/// signature, is an error. An unrelated prefix is `Ok(None)`.
pub fn check_signature(prefix: &[u8]) -> Result<Option<Signature>> {
    if prefix.is_empty() {
        return Err(Error::InvalidParameter(
            "signature check needs at least one byte".into(),
        ));
    }

    if prefix.starts_with(&CODESTREAM_SIGNATURE) {
        return Ok(Some(Signature::Codestream));
    }
    if prefix.starts_with(&CONTAINER_SIGNATURE) {
        return Ok(Some(Signature::Container));
    }

    let ambiguous = |signature: &[u8]| {
        prefix.len() < signature.len() && signature.starts_with(prefix)
    };
    if ambiguous(&CODESTREAM_SIGNATURE) || ambiguous(&CONTAINER_SIGNATURE) {
        return Err(Error::InvalidParameter(format!(
            "{} bytes are not enough to check the signature",
            prefix.len()
        )));
    }
    Ok(None)
}
