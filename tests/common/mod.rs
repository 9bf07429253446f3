// this_file: tests/common/mod.rs
//! Shared fixtures: a synthetic font face and a toy record-based codec

#![allow(dead_code)]

use imgbridge::codec::{
    BasicInfo, BoxType, CodecEngine, Event, EventSet, FrameHeader, PixelLayout, PixelSink,
    SampleType,
};
use imgbridge::face::{FaceEngine, GlyphIndex, Outline, PathEl, SizeMetrics};
use imgbridge::fixed::Vector;
use imgbridge::{Font, LayoutEngine, RenderMode, Result};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const GLYPH_A: GlyphIndex = 1;
pub const GLYPH_V: GlyphIndex = 2;
pub const GLYPH_SPACE: GlyphIndex = 3;

/// Advance of every synthetic glyph: 10 px.
pub const ADVANCE: i32 = 10 * 64;

/// 16 ppem face where `A` and `V` are 8x12 px boxes starting 1 px right of
/// the pen, space is blank and the pair `AV` kerns by half a pixel.
#[derive(Debug, Clone)]
pub struct SyntheticFace {
    pub kern_av: i32,
}

impl Default for SyntheticFace {
    fn default() -> Self {
        Self { kern_av: 32 }
    }
}

impl FaceEngine for SyntheticFace {
    fn size_metrics(&self) -> SizeMetrics {
        SizeMetrics {
            x_ppem: 16,
            y_ppem: 16,
            ascender: 12 * 64,
            descender: -4 * 64,
            height: 16 * 64,
        }
    }

    fn num_glyphs(&self) -> u32 {
        4
    }

    fn char_index(&self, ch: char) -> GlyphIndex {
        match ch {
            'A' => GLYPH_A,
            'V' => GLYPH_V,
            ' ' => GLYPH_SPACE,
            _ => 0,
        }
    }

    fn advance(&self, _glyph: GlyphIndex, _mode: RenderMode) -> Result<i32> {
        Ok(ADVANCE)
    }

    fn has_kerning(&self) -> bool {
        true
    }

    fn kerning(&self, left: GlyphIndex, right: GlyphIndex) -> Option<Vector> {
        (left == GLYPH_A && right == GLYPH_V).then(|| Vector::new(self.kern_av, 0))
    }

    fn outline(&self, glyph: GlyphIndex, _mode: RenderMode) -> Result<Outline> {
        if glyph == GLYPH_SPACE {
            return Ok(Outline::new());
        }
        Ok(Outline::from_elements(vec![
            PathEl::MoveTo(1.0, 0.0),
            PathEl::LineTo(9.0, 0.0),
            PathEl::LineTo(9.0, 12.0),
            PathEl::LineTo(1.0, 12.0),
            PathEl::Close,
        ]))
    }
}

pub fn synthetic_font() -> Font {
    Font::from_engine(Box::new(SyntheticFace::default()), 16.0, LayoutEngine::Complex)
}

/// A real font for end-to-end checks, if one is installed.
pub fn fixture_font() -> Option<PathBuf> {
    let candidates = [
        std::env::var("IMGBRIDGE_TEST_FONT").unwrap_or_default(),
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string(),
        "/usr/share/fonts/dejavu/DejaVuSans.ttf".to_string(),
    ];
    candidates
        .into_iter()
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Builds files in the toy codec format.
///
/// The file is `TOY1` followed by records of a tag byte, a little-endian
/// u32 payload length and the payload:
/// - `I`: xsize u32, ysize u32, animated u8
/// - `C`: ICC profile bytes
/// - `B`: 4-byte box type then content
/// - `F`: duration u32, is_last u8, name length u32, name, one gray byte per pixel
pub struct ToyImage {
    width: u32,
    height: u32,
    icc: Option<Vec<u8>>,
    boxes: Vec<([u8; 4], Vec<u8>)>,
    frames: Vec<(u32, String, Vec<u8>)>,
}

impl ToyImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            icc: None,
            boxes: Vec::new(),
            frames: Vec::new(),
        }
    }

    pub fn icc(mut self, profile: &[u8]) -> Self {
        self.icc = Some(profile.to_vec());
        self
    }

    pub fn with_box(mut self, box_type: &[u8; 4], content: &[u8]) -> Self {
        self.boxes.push((*box_type, content.to_vec()));
        self
    }

    /// Add a frame whose pixels are all `gray`.
    pub fn frame(self, duration: u32, name: &str, gray: u8) -> Self {
        let pixels = vec![gray; (self.width * self.height) as usize];
        self.frame_pixels(duration, name, pixels)
    }

    pub fn frame_pixels(mut self, duration: u32, name: &str, pixels: Vec<u8>) -> Self {
        self.frames.push((duration, name.to_string(), pixels));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"TOY1".to_vec();
        let mut info = Vec::new();
        info.extend_from_slice(&self.width.to_le_bytes());
        info.extend_from_slice(&self.height.to_le_bytes());
        info.push((self.frames.len() > 1) as u8);
        record(&mut out, b'I', &info);

        if let Some(icc) = &self.icc {
            record(&mut out, b'C', icc);
        }
        for (box_type, content) in &self.boxes {
            let mut payload = box_type.to_vec();
            payload.extend_from_slice(content);
            record(&mut out, b'B', &payload);
        }
        let last = self.frames.len().saturating_sub(1);
        for (i, (duration, name, pixels)) in self.frames.iter().enumerate() {
            let mut payload = Vec::new();
            payload.extend_from_slice(&duration.to_le_bytes());
            payload.push((i == last) as u8);
            payload.extend_from_slice(&(name.len() as u32).to_le_bytes());
            payload.extend_from_slice(name.as_bytes());
            payload.extend_from_slice(pixels);
            record(&mut out, b'F', &payload);
        }
        out
    }
}

fn record(out: &mut Vec<u8>, tag: u8, payload: &[u8]) {
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
}

fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    let bytes: [u8; 4] = data.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

struct ToyFrame {
    header: FrameHeader,
    name: String,
    pixels: Vec<u8>,
}

enum Phase {
    Records,
    AwaitingLayout(ToyFrame),
    Delivering(ToyFrame),
    BoxContent { content: Vec<u8>, written: usize },
}

/// Incremental decoder for the toy format.
///
/// Only whole records are consumed; a partial record stays unused and is
/// expected back, followed by new bytes, with the next input.
pub struct ToyCodec {
    input: Vec<u8>,
    pos: usize,
    closed: bool,
    header_seen: bool,
    subscribed: EventSet,
    phase: Phase,
    basic: Option<BasicInfo>,
    icc: Vec<u8>,
    box_type: Option<BoxType>,
    box_buffer: Option<(Vec<u8>, usize)>,
    frame: Option<(FrameHeader, String)>,
    layout: Option<PixelLayout>,
    skip: usize,
    /// Number of `process_input` calls, for instrumentation
    pub process_calls: Arc<AtomicUsize>,
}

impl Default for ToyCodec {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            pos: 0,
            closed: false,
            header_seen: false,
            subscribed: EventSet::NONE,
            phase: Phase::Records,
            basic: None,
            icc: Vec::new(),
            box_type: None,
            box_buffer: None,
            frame: None,
            layout: None,
            skip: 0,
            process_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl ToyCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// A record is cut short: fail if no input follows, else ask for more.
    fn starved(&self) -> Event {
        if self.closed {
            Event::Error
        } else {
            Event::NeedMoreInput
        }
    }

    fn deliver(&self, frame: &ToyFrame, layout: PixelLayout, sink: &mut dyn PixelSink) {
        let Some(basic) = self.basic else { return };
        let width = basic.xsize as usize;
        for y in 0..basic.ysize as usize {
            let mut row = Vec::with_capacity(width * layout.bytes_per_pixel());
            for &gray in &frame.pixels[y * width..(y + 1) * width] {
                for _ in 0..layout.channels {
                    match layout.sample {
                        SampleType::U8 => row.push(gray),
                        SampleType::U16 => {
                            row.extend_from_slice(&(gray as u16 * 257).to_ne_bytes())
                        }
                        SampleType::F32 => {
                            row.extend_from_slice(&(gray as f32 / 255.0).to_ne_bytes())
                        }
                    }
                }
            }
            sink.write_run(0, y, width, &row);
        }
    }

    fn parse_record(&mut self) -> Option<std::result::Result<(u8, Vec<u8>), Event>> {
        let available = &self.input[self.pos..];
        if available.is_empty() {
            return None;
        }
        let Some(len) = u32_at(available, 1) else {
            return Some(Err(self.starved()));
        };
        let end = 5 + len as usize;
        if available.len() < end {
            return Some(Err(self.starved()));
        }
        let tag = available[0];
        let payload = available[5..end].to_vec();
        self.pos += end;
        Some(Ok((tag, payload)))
    }

    fn parse_frame(&self, payload: &[u8]) -> Option<ToyFrame> {
        let basic = self.basic?;
        let duration = u32_at(payload, 0)?;
        let is_last = *payload.get(4)? != 0;
        let name_length = u32_at(payload, 5)?;
        let name_end = 9 + name_length as usize;
        let name = String::from_utf8(payload.get(9..name_end)?.to_vec()).ok()?;
        let pixels = payload.get(name_end..)?.to_vec();
        if pixels.len() != (basic.xsize * basic.ysize) as usize {
            return None;
        }
        Some(ToyFrame {
            header: FrameHeader {
                duration,
                timecode: 0,
                name_length,
                is_last,
            },
            name,
            pixels,
        })
    }
}

impl CodecEngine for ToyCodec {
    fn version(&self) -> String {
        "toy 1.0".into()
    }

    fn subscribe_events(&mut self, events: EventSet) -> Result<()> {
        self.subscribed = events;
        Ok(())
    }

    fn set_input(&mut self, data: &[u8]) -> Result<()> {
        self.input = data.to_vec();
        self.pos = 0;
        Ok(())
    }

    fn close_input(&mut self) {
        self.closed = true;
    }

    fn release_input(&mut self) -> usize {
        let unused = self.input.len() - self.pos;
        self.input.clear();
        self.pos = 0;
        unused
    }

    fn process_input(&mut self, sink: &mut dyn PixelSink) -> Event {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        loop {
            match std::mem::replace(&mut self.phase, Phase::Records) {
                Phase::AwaitingLayout(frame) => {
                    self.phase = Phase::Delivering(frame);
                    return Event::NeedImageOutBuffer;
                }
                Phase::Delivering(frame) => {
                    let Some(layout) = self.layout.take() else {
                        return Event::Error;
                    };
                    self.deliver(&frame, layout, sink);
                    return Event::FullImage;
                }
                Phase::BoxContent { content, written } => {
                    let Some((buffer, start)) = self.box_buffer.as_mut() else {
                        continue;
                    };
                    let n = (content.len() - written).min(buffer.len() - *start);
                    buffer[*start..*start + n].copy_from_slice(&content[written..written + n]);
                    *start += n;
                    if written + n < content.len() {
                        self.phase = Phase::BoxContent {
                            content,
                            written: written + n,
                        };
                        return Event::BoxNeedMoreOutput;
                    }
                }
                Phase::Records => {
                    if !self.header_seen {
                        if self.input.len() - self.pos < 4 {
                            return self.starved();
                        }
                        if &self.input[self.pos..self.pos + 4] != b"TOY1" {
                            return Event::Error;
                        }
                        self.pos += 4;
                        self.header_seen = true;
                        continue;
                    }

                    let (tag, payload) = match self.parse_record() {
                        None if self.closed => return Event::Success,
                        None => return Event::NeedMoreInput,
                        Some(Err(event)) => return event,
                        Some(Ok(record)) => record,
                    };

                    match tag {
                        b'I' => {
                            let (Some(xsize), Some(ysize), Some(&animated)) =
                                (u32_at(&payload, 0), u32_at(&payload, 4), payload.get(8))
                            else {
                                return Event::Error;
                            };
                            self.basic = Some(BasicInfo {
                                xsize,
                                ysize,
                                bits_per_sample: 8,
                                num_color_channels: 1,
                                have_animation: animated != 0,
                                ..Default::default()
                            });
                            if self.subscribed.contains(EventSet::BASIC_INFO) {
                                return Event::BasicInfo;
                            }
                        }
                        b'C' => {
                            self.icc = payload;
                            if self.subscribed.contains(EventSet::COLOR_ENCODING) {
                                return Event::ColorEncoding;
                            }
                        }
                        b'B' => {
                            let Ok(box_type) = BoxType::new(&payload[..4.min(payload.len())]) else {
                                return Event::Error;
                            };
                            self.box_type = Some(box_type);
                            if self.subscribed.contains(EventSet::BOX) {
                                self.phase = Phase::BoxContent {
                                    content: payload[4..].to_vec(),
                                    written: 0,
                                };
                                return Event::Box;
                            }
                        }
                        b'F' => {
                            let Some(frame) = self.parse_frame(&payload) else {
                                return Event::Error;
                            };
                            if self.skip > 0 {
                                self.skip -= 1;
                                continue;
                            }
                            self.frame = Some((frame.header, frame.name.clone()));
                            if self.subscribed.contains(EventSet::FULL_IMAGE) {
                                self.phase = Phase::AwaitingLayout(frame);
                            }
                            if self.subscribed.contains(EventSet::FRAME) {
                                return Event::Frame;
                            }
                        }
                        _ => return Event::Error,
                    }
                }
            }
        }
    }

    fn basic_info(&self) -> Result<BasicInfo> {
        self.basic
            .ok_or_else(|| imgbridge::Error::Codec("basic info not available".into()))
    }

    fn icc_profile_size(&self) -> Result<usize> {
        Ok(self.icc.len())
    }

    fn icc_profile(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != self.icc.len() {
            return Err(imgbridge::Error::Codec("wrong ICC buffer size".into()));
        }
        buf.copy_from_slice(&self.icc);
        Ok(())
    }

    fn frame_header(&self) -> Result<FrameHeader> {
        self.frame
            .as_ref()
            .map(|(header, _)| *header)
            .ok_or_else(|| imgbridge::Error::Codec("no frame header".into()))
    }

    fn frame_name(&self) -> Result<String> {
        self.frame
            .as_ref()
            .map(|(_, name)| name.clone())
            .ok_or_else(|| imgbridge::Error::Codec("no frame header".into()))
    }

    fn set_image_out_format(&mut self, layout: PixelLayout) -> Result<()> {
        self.layout = Some(layout);
        Ok(())
    }

    fn box_type(&self) -> Result<BoxType> {
        self.box_type
            .ok_or_else(|| imgbridge::Error::Codec("no box".into()))
    }

    fn set_box_buffer(&mut self, buffer: Vec<u8>, start: usize) -> Result<()> {
        self.box_buffer = Some((buffer, start));
        Ok(())
    }

    fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)> {
        self.box_buffer.take().map(|(buffer, start)| {
            let unused = buffer.len() - start;
            (buffer, unused)
        })
    }

    fn set_decompress_boxes(&mut self, _decompress: bool) -> Result<()> {
        Ok(())
    }

    fn rewind(&mut self) {
        self.input.clear();
        self.pos = 0;
        self.closed = false;
        self.header_seen = false;
        self.phase = Phase::Records;
        self.box_buffer = None;
        self.frame = None;
        self.layout = None;
        self.skip = 0;
    }

    fn skip_frames(&mut self, count: usize) {
        self.skip += count;
    }
}

/// Cursor that counts reads and seeks.
pub struct CountingReader {
    inner: Cursor<Vec<u8>>,
    pub reads: Arc<AtomicUsize>,
}

impl CountingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read(buf)
    }
}

impl Seek for CountingReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
