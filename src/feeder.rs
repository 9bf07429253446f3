// this_file: src/feeder.rs
//! Bridges a byte source into codec input.
//!
//! After each processing step the codec may hold back bytes it could not
//! use yet. Before the next chunk is supplied those bytes are delivered
//! again: a buffer source simply supplies the whole buffer once and closes
//! the input, a stream source seeks back by the unused count and reads the
//! held-back bytes together with a full chunk of new ones.

use crate::codec::CodecEngine;
use crate::error::{Error, Result};
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A seekable byte stream.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

enum Source {
    Buffer(Arc<[u8]>),
    Stream {
        reader: Box<dyn ReadSeek>,
        chunk_size: usize,
        /// Stream position of the first byte
        start: u64,
        /// Stream position right after the last chunk read
        position: u64,
        chunk: Vec<u8>,
    },
}

/// Supplies codec input from a buffer or a stream.
pub struct Feeder {
    source: Source,
    closed: bool,
}

impl Feeder {
    /// Feed from an in-memory buffer.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            source: Source::Buffer(data.into()),
            closed: false,
        }
    }

    /// Feed from a stream, starting at its current position.
    pub fn from_reader<R: Read + Seek + 'static>(mut reader: R, chunk_size: usize) -> Result<Self> {
        let start = reader.stream_position()?;
        Ok(Self {
            source: Source::Stream {
                reader: Box::new(reader),
                chunk_size: chunk_size.max(1),
                start,
                position: start,
                chunk: Vec::new(),
            },
            closed: false,
        })
    }

    /// True once the codec has been told no more input follows.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Supply input from the very beginning of the source.
    pub fn restart(&mut self, engine: &mut dyn CodecEngine) -> Result<()> {
        engine.release_input();
        self.closed = false;
        match &mut self.source {
            Source::Buffer(data) => {
                engine.set_input(data)?;
                engine.close_input();
                self.closed = true;
                Ok(())
            }
            Source::Stream {
                reader,
                start,
                position,
                ..
            } => {
                seek_checked(reader.as_mut(), SeekFrom::Start(*start), *start)?;
                *position = *start;
                self.supply_next_chunk(engine, 0)
            }
        }
    }

    /// Answer a need-more-input event.
    pub fn refill(&mut self, engine: &mut dyn CodecEngine) -> Result<()> {
        if self.closed {
            return Err(Error::Protocol(
                "codec asked for more input after the end of the data".into(),
            ));
        }
        let unused = engine.release_input();
        let mut carried = 0;
        if let Source::Stream {
            reader, position, ..
        } = &mut self.source
        {
            if unused > 0 {
                let unused = unused as u64;
                let target = position.checked_sub(unused).ok_or_else(|| {
                    Error::Protocol(format!("codec returned {} unused bytes it never got", unused))
                })?;
                seek_checked(reader.as_mut(), SeekFrom::Current(-(unused as i64)), target)?;
                *position = target;
                carried = unused as usize;
            }
        }
        self.supply_next_chunk(engine, carried)
    }

    /// Read `carried` bytes the codec held back plus one chunk of new data,
    /// so every refill makes progress even when nothing was consumed.
    fn supply_next_chunk(&mut self, engine: &mut dyn CodecEngine, carried: usize) -> Result<()> {
        match &mut self.source {
            Source::Buffer(_) => Err(Error::Protocol(
                "buffer input is supplied in one piece".into(),
            )),
            Source::Stream {
                reader,
                chunk_size,
                position,
                chunk,
                ..
            } => {
                let wanted = carried.saturating_add(*chunk_size);
                chunk.clear();
                let read = reader
                    .as_mut()
                    .take(wanted as u64)
                    .read_to_end(chunk)?;
                *position += read as u64;
                log::trace!(
                    "Read {} bytes ({} held back), stream at {}",
                    read,
                    carried,
                    position
                );

                engine.set_input(chunk)?;
                if read < wanted {
                    engine.close_input();
                    self.closed = true;
                }
                Ok(())
            }
        }
    }
}

/// Seek and verify the source landed where it should.
fn seek_checked(reader: &mut dyn ReadSeek, to: SeekFrom, expected: u64) -> Result<()> {
    let landed = reader.seek(to)?;
    if landed != expected {
        return Err(Error::SourceIo(io::Error::new(
            io::ErrorKind::Other,
            format!("source seeked to {} instead of {}", landed, expected),
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        BasicInfo, BoxType, Event, EventSet, FrameHeader, PixelLayout, PixelSink,
    };
    use std::io::Cursor;

    /// Records input calls; consumes everything but the last `hold_back` bytes.
    #[derive(Default)]
    struct InputRecorder {
        inputs: Vec<Vec<u8>>,
        closed: bool,
        hold_back: usize,
        pending: usize,
    }

    impl CodecEngine for InputRecorder {
        fn version(&self) -> String {
            "recorder".into()
        }
        fn subscribe_events(&mut self, _events: EventSet) -> Result<()> {
            Ok(())
        }
        fn set_input(&mut self, data: &[u8]) -> Result<()> {
            self.inputs.push(data.to_vec());
            self.pending = data.len().min(self.hold_back);
            Ok(())
        }
        fn close_input(&mut self) {
            self.closed = true;
        }
        fn release_input(&mut self) -> usize {
            std::mem::take(&mut self.pending)
        }
        fn process_input(&mut self, _sink: &mut dyn PixelSink) -> Event {
            Event::Success
        }
        fn basic_info(&self) -> Result<BasicInfo> {
            Ok(BasicInfo::default())
        }
        fn icc_profile_size(&self) -> Result<usize> {
            Ok(0)
        }
        fn icc_profile(&self, _buf: &mut [u8]) -> Result<()> {
            Ok(())
        }
        fn frame_header(&self) -> Result<FrameHeader> {
            Ok(FrameHeader::default())
        }
        fn frame_name(&self) -> Result<String> {
            Ok(String::new())
        }
        fn set_image_out_format(&mut self, _layout: PixelLayout) -> Result<()> {
            Ok(())
        }
        fn box_type(&self) -> Result<BoxType> {
            BoxType::new(b"test")
        }
        fn set_box_buffer(&mut self, _buffer: Vec<u8>, _start: usize) -> Result<()> {
            Ok(())
        }
        fn release_box_buffer(&mut self) -> Option<(Vec<u8>, usize)> {
            None
        }
        fn set_decompress_boxes(&mut self, _decompress: bool) -> Result<()> {
            Ok(())
        }
        fn rewind(&mut self) {}
        fn skip_frames(&mut self, _count: usize) {}
    }

    #[test]
    fn buffer_is_supplied_whole_and_closed() {
        let mut engine = InputRecorder::default();
        let mut feeder = Feeder::from_bytes(vec![1u8, 2, 3]);
        feeder.restart(&mut engine).unwrap();
        assert_eq!(engine.inputs, vec![vec![1, 2, 3]]);
        assert!(engine.closed);
        assert!(matches!(feeder.refill(&mut engine), Err(Error::Protocol(_))));
    }

    #[test]
    fn stream_redelivers_unused_bytes() {
        let mut engine = InputRecorder {
            hold_back: 2,
            ..Default::default()
        };
        let data: Vec<u8> = (0..10).collect();
        let mut feeder = Feeder::from_reader(Cursor::new(data), 4).unwrap();
        feeder.restart(&mut engine).unwrap();
        feeder.refill(&mut engine).unwrap();
        assert_eq!(
            engine.inputs,
            vec![vec![0, 1, 2, 3], vec![2, 3, 4, 5, 6, 7]]
        );
        assert!(!feeder.is_closed());
        feeder.refill(&mut engine).unwrap();
        assert_eq!(engine.inputs[2], vec![6, 7, 8, 9]);
        assert!(feeder.is_closed());
        assert!(engine.closed);
    }

    #[test]
    fn stream_grows_input_when_nothing_is_consumed() {
        let mut engine = InputRecorder {
            hold_back: usize::MAX,
            ..Default::default()
        };
        let data: Vec<u8> = (0..10).collect();
        let mut feeder = Feeder::from_reader(Cursor::new(data.clone()), 4).unwrap();
        feeder.restart(&mut engine).unwrap();
        feeder.refill(&mut engine).unwrap();
        feeder.refill(&mut engine).unwrap();

        let lengths: Vec<usize> = engine.inputs.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![4, 8, 10]);
        assert_eq!(engine.inputs[2], data);
        assert!(feeder.is_closed());
        assert!(matches!(feeder.refill(&mut engine), Err(Error::Protocol(_))));
    }

    #[test]
    fn stream_starts_at_its_initial_position() {
        let mut engine = InputRecorder::default();
        let mut cursor = Cursor::new(vec![9u8, 9, 1, 2]);
        cursor.set_position(2);
        let mut feeder = Feeder::from_reader(cursor, 16).unwrap();
        feeder.restart(&mut engine).unwrap();
        feeder.restart(&mut engine).unwrap();
        assert_eq!(engine.inputs, vec![vec![1, 2], vec![1, 2]]);
    }

    struct DriftingSeek(Cursor<Vec<u8>>);

    impl Read for DriftingSeek {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }

    impl Seek for DriftingSeek {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            let landed = self.0.seek(pos)?;
            Ok(landed + 1)
        }
    }

    #[test]
    fn misplaced_seek_is_a_source_error() {
        let mut engine = InputRecorder::default();
        let mut feeder = Feeder::from_reader(DriftingSeek(Cursor::new(vec![0u8; 8])), 4).unwrap();
        assert!(matches!(feeder.restart(&mut engine), Err(Error::SourceIo(_))));
    }
}
