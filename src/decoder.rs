// this_file: src/decoder.rs
//! Incremental JPEG XL decoding sessions.
//!
//! A [`Decoder`] drives a [`CodecEngine`] from a buffer or a stream. Every
//! operation subscribes to the events it needs, drains them through an
//! explicit state machine and treats any event outside its transition table
//! as a protocol error. The info, ICC and box queries rewind the session
//! when they finish so frame iteration always starts from frame 0.

use crate::codec::{BasicInfo, BoxType, CodecEngine, Event, EventSet, NullSink, PixelSink};
use crate::config::DecoderOptions;
use crate::error::{Error, Result};
use crate::feeder::Feeder;
use crate::logging::Timer;
use crate::raster::{FrameSink, Raster};
use serde::Serialize;
use std::io::{Read, Seek};
use std::sync::Arc;

/// Events subscribed while iterating frames.
pub const FRAME_EVENTS: EventSet = EventSet::COLOR_ENCODING
    .union(EventSet::FRAME)
    .union(EventSet::FULL_IMAGE);

const INFO_EVENTS: EventSet = EventSet::BOX
    .union(EventSet::BASIC_INFO)
    .union(EventSet::FRAME);

/// Image-level information collected by [`Decoder::info`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub basic: BasicInfo,
    /// Container box types in encounter order, duplicates included
    pub box_types: Vec<BoxType>,
    pub frame_count: usize,
}

/// Header of a decoded frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameInfo {
    /// Duration in animation ticks
    pub duration: u32,
    pub timecode: u32,
    pub name: Option<String>,
    pub is_last: bool,
}

enum InfoState {
    AwaitingBasicInfo,
    HaveBasicInfo(BasicInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoxState {
    Scanning,
    Reading,
    Skipping,
}

enum FrameState {
    AwaitingFrame,
    AwaitingOutputBuffer(FrameInfo),
    AwaitingFullImage(FrameInfo),
}

impl FrameState {
    fn name(&self) -> &'static str {
        match self {
            FrameState::AwaitingFrame => "awaiting frame",
            FrameState::AwaitingOutputBuffer(_) => "awaiting output buffer",
            FrameState::AwaitingFullImage(_) => "awaiting full image",
        }
    }
}

fn unexpected(event: Event, during: &str) -> Error {
    Error::Protocol(format!("unexpected codec event {:?} while {}", event, during))
}

/// Extend `buffer` by `by` zeroed bytes.
fn grow(mut buffer: Vec<u8>, by: usize) -> Result<Vec<u8>> {
    let target = buffer.len() + by;
    buffer
        .try_reserve_exact(by)
        .map_err(|_| Error::OutOfMemory(format!("box buffer of {} bytes", target)))?;
    buffer.resize(target, 0);
    Ok(buffer)
}

/// A decoding session over one JPEG XL image.
pub struct Decoder<E: CodecEngine> {
    engine: E,
    feeder: Feeder,
    options: DecoderOptions,
    frame: usize,
    info: Option<ImageInfo>,
}

impl<E: CodecEngine> Decoder<E> {
    /// Decode from an in-memory buffer. Rewinds never perform I/O.
    pub fn from_bytes(engine: E, data: impl Into<Arc<[u8]>>, options: DecoderOptions) -> Result<Self> {
        Self::new(engine, Feeder::from_bytes(data), options)
    }

    /// Decode from a seekable stream, read in `options.chunk_size` chunks.
    pub fn from_reader<R: Read + Seek + 'static>(
        engine: E,
        reader: R,
        options: DecoderOptions,
    ) -> Result<Self> {
        options.validate()?;
        let feeder = Feeder::from_reader(reader, options.chunk_size)?;
        Self::new(engine, feeder, options)
    }

    fn new(mut engine: E, feeder: Feeder, options: DecoderOptions) -> Result<Self> {
        options.validate()?;
        engine.set_decompress_boxes(options.decompress_boxes)?;
        log::debug!("Opening decoder session with codec {}", engine.version());

        let mut decoder = Self {
            engine,
            feeder,
            options,
            frame: 0,
            info: None,
        };
        decoder.rewind()?;
        Ok(decoder)
    }

    /// Version string of the codec engine.
    pub fn version(&self) -> String {
        self.engine.version()
    }

    /// Index of the next frame `next_frame` will decode.
    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn options(&self) -> &DecoderOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Basic info, box types and frame count.
    ///
    /// The first call drains the whole image and rewinds; later calls
    /// return the cached record without touching the codec.
    pub fn info(&mut self) -> Result<ImageInfo> {
        if let Some(info) = &self.info {
            return Ok(info.clone());
        }

        self.restart_with(INFO_EVENTS)?;
        let mut box_types = Vec::new();
        let mut frame_count = 0;
        let mut state = InfoState::AwaitingBasicInfo;
        let basic = loop {
            let event = self.next_event(&mut NullSink)?;
            state = match (state, event) {
                (state, Event::Box) => {
                    box_types.push(self.engine.box_type()?);
                    state
                }
                (InfoState::AwaitingBasicInfo, Event::BasicInfo) => {
                    InfoState::HaveBasicInfo(self.engine.basic_info()?)
                }
                (InfoState::HaveBasicInfo(basic), Event::Frame) => {
                    frame_count += 1;
                    InfoState::HaveBasicInfo(basic)
                }
                (InfoState::HaveBasicInfo(basic), Event::Success) => break basic,
                (InfoState::AwaitingBasicInfo, Event::Success) => {
                    return Err(Error::Protocol(
                        "codec finished without reporting basic info".into(),
                    ))
                }
                (_, event) => return Err(unexpected(event, "reading basic info")),
            };
        };

        let info = ImageInfo {
            basic,
            box_types,
            frame_count,
        };
        log::debug!(
            "Image is {}x{} with {} frames and {} boxes",
            info.basic.xsize,
            info.basic.ysize,
            info.frame_count,
            info.box_types.len()
        );
        self.info = Some(info.clone());
        self.rewind()?;
        Ok(info)
    }

    /// The embedded ICC profile, or `None` when the image has none.
    pub fn icc_profile(&mut self) -> Result<Option<Vec<u8>>> {
        self.restart_with(EventSet::COLOR_ENCODING)?;
        let profile = loop {
            match self.next_event(&mut NullSink)? {
                Event::ColorEncoding => {
                    let size = self.engine.icc_profile_size()?;
                    if size == 0 {
                        break None;
                    }
                    let mut profile = grow(Vec::new(), size)?;
                    self.engine.icc_profile(&mut profile)?;
                    break Some(profile);
                }
                Event::Success => break None,
                event => return Err(unexpected(event, "reading the color profile")),
            }
        };
        self.rewind()?;
        Ok(profile)
    }

    /// Contents of boxes of type `box_type`, in encounter order.
    ///
    /// Stops after `max` matches when given.
    pub fn boxes(&mut self, box_type: BoxType, max: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let mut found = Vec::new();
        if max == Some(0) {
            return Ok(found);
        }

        self.restart_with(EventSet::BOX)?;
        let chunk = self.options.box_chunk_size;
        let mut state = BoxState::Scanning;
        loop {
            let event = self.next_event(&mut NullSink)?;
            if state == BoxState::Reading && matches!(event, Event::Box | Event::Success) {
                found.push(self.finish_box()?);
                if max.is_some_and(|max| found.len() >= max) {
                    break;
                }
            }

            state = match (state, event) {
                (_, Event::Success) => break,
                (_, Event::Box) => {
                    if self.engine.box_type()? == box_type {
                        self.engine.set_box_buffer(grow(Vec::new(), chunk)?, 0)?;
                        BoxState::Reading
                    } else {
                        BoxState::Skipping
                    }
                }
                (BoxState::Reading, Event::BoxNeedMoreOutput) => {
                    let (buffer, unused) = self.engine.release_box_buffer().ok_or_else(|| {
                        Error::Protocol("codec asked for box output without a buffer".into())
                    })?;
                    let written = buffer.len().saturating_sub(unused);
                    self.engine.set_box_buffer(grow(buffer, chunk)?, written)?;
                    BoxState::Reading
                }
                (_, event) => return Err(unexpected(event, "reading boxes")),
            };
        }

        log::debug!("Found {} '{}' boxes", found.len(), box_type);
        self.rewind()?;
        Ok(found)
    }

    fn finish_box(&mut self) -> Result<Vec<u8>> {
        let (mut buffer, unused) = self
            .engine
            .release_box_buffer()
            .ok_or_else(|| Error::Protocol("codec did not return the box buffer".into()))?;
        let len = buffer.len().saturating_sub(unused);
        buffer.truncate(len);
        Ok(buffer)
    }

    /// Decode the next frame into `raster`.
    ///
    /// Returns `Ok(None)` once every frame has been decoded.
    pub fn next_frame(&mut self, raster: &mut Raster) -> Result<Option<FrameInfo>> {
        let _timer = Timer::new(format!("decode frame {}", self.frame));
        let layout = raster.format().codec_layout();
        let mut sink = FrameSink::new(raster);
        let mut state = FrameState::AwaitingFrame;

        let frame = loop {
            let event = self.next_event(&mut sink)?;
            state = match (state, event) {
                (FrameState::AwaitingFrame, Event::Success) => return Ok(None),
                (state, Event::ColorEncoding) => state,
                (FrameState::AwaitingFrame, Event::Frame) => {
                    FrameState::AwaitingOutputBuffer(self.frame_info()?)
                }
                (FrameState::AwaitingOutputBuffer(frame), Event::NeedImageOutBuffer) => {
                    self.engine.set_image_out_format(layout)?;
                    FrameState::AwaitingFullImage(frame)
                }
                (FrameState::AwaitingFullImage(frame), Event::FullImage) => break frame,
                (state, event) => return Err(unexpected(event, state.name())),
            };
        };

        self.frame += 1;
        Ok(Some(frame))
    }

    fn frame_info(&self) -> Result<FrameInfo> {
        let header = self.engine.frame_header()?;
        let name = if header.name_length > 0 {
            Some(self.engine.frame_name()?)
        } else {
            None
        };
        Ok(FrameInfo {
            duration: header.duration,
            timecode: header.timecode,
            name,
            is_last: header.is_last,
        })
    }

    /// Skip `count` frames without delivering pixels.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.engine.skip_frames(count);
        self.frame += count;
        log::debug!("Skipped {} frames, next frame is {}", count, self.frame);
        Ok(())
    }

    /// Return to frame 0 with the frame iteration subscription.
    pub fn rewind(&mut self) -> Result<()> {
        self.restart_with(FRAME_EVENTS)?;
        self.frame = 0;
        log::debug!("Rewound decoder session");
        Ok(())
    }

    fn restart_with(&mut self, events: EventSet) -> Result<()> {
        self.engine.rewind();
        self.engine.subscribe_events(events)?;
        self.feeder.restart(&mut self.engine)
    }

    /// Process until the codec reports something other than a need for
    /// input. Error events end the session.
    fn next_event(&mut self, sink: &mut dyn PixelSink) -> Result<Event> {
        loop {
            match self.engine.process_input(sink) {
                Event::NeedMoreInput => self.feeder.refill(&mut self.engine)?,
                Event::Error => return Err(Error::Codec("decoding failed".into())),
                event => {
                    log::trace!("Codec event {:?}", event);
                    return Ok(event);
                }
            }
        }
    }
}

impl<E: CodecEngine> std::fmt::Debug for Decoder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("frame", &self.frame)
            .field("options", &self.options)
            .field("info", &self.info)
            .finish()
    }
}
