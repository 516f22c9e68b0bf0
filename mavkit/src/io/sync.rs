use std::io::{ErrorKind, Read, Write};

use crate::consts::DEFAULT_READ_CHUNK_SIZE;
use crate::prelude::*;
use crate::protocol::{
    CrcExtra, CrcExtraLookup, DialectTable, Encoder, Frame, MavMessage, MessageValue,
    ParserEvent, Payload, StreamParser,
};

/// Reads MAVLink frames from a [`Read`] stream.
///
/// Wraps a [`StreamParser`], so corrupted input is reported as [`ParserEvent::Error`] and never
/// stops reading.
#[derive(Debug)]
pub struct FrameReader<R: Read, L: CrcExtraLookup> {
    reader: R,
    parser: StreamParser<L>,
    chunk: Vec<u8>,
}

/// Writes MAVLink frames into a [`Write`] stream.
#[derive(Debug)]
pub struct FrameWriter<W: Write> {
    writer: W,
    encoder: Encoder,
}

impl<R: Read, L: CrcExtraLookup> FrameReader<R, L> {
    /// Creates a reader with a default [`StreamParser`].
    pub fn new(reader: R, lookup: L) -> Self {
        Self::with_parser(reader, StreamParser::new(lookup))
    }

    /// Creates a reader with a preconfigured parser.
    pub fn with_parser(reader: R, parser: StreamParser<L>) -> Self {
        Self {
            reader,
            parser,
            chunk: vec![0; DEFAULT_READ_CHUNK_SIZE],
        }
    }

    /// Underlying parser.
    pub fn parser(&self) -> &StreamParser<L> {
        &self.parser
    }

    /// Underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Returns underlying reader dropping parser state.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Blocks until the next parser event is available.
    ///
    /// Returns [`Error::Io`] with [`ErrorKind::UnexpectedEof`] when the stream ends.
    pub fn recv(&mut self) -> Result<ParserEvent> {
        loop {
            if let Some(event) = self.parser.next_event() {
                return Ok(event);
            }

            let read = match self.reader.read(&mut self.chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                return Err(std::io::Error::new(ErrorKind::UnexpectedEof, "end of stream").into());
            }

            self.parser.push(&self.chunk[..read]);
        }
    }

    /// Blocks until the next valid frame skipping errors and packet loss events.
    pub fn recv_frame(&mut self) -> Result<Frame> {
        loop {
            match self.recv()? {
                ParserEvent::Frame(frame) => return Ok(frame),
                ParserEvent::Error(err) => log::trace!("skipping invalid frame: {err}"),
                ParserEvent::PacketLoss { .. } => {}
            }
        }
    }
}

impl<R: Read, L: CrcExtraLookup> Iterator for FrameReader<R, L> {
    type Item = Result<ParserEvent>;

    /// Returns parser events until the stream ends.
    fn next(&mut self) -> Option<Self::Item> {
        match self.recv() {
            Err(Error::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => None,
            other => Some(other),
        }
    }
}

impl<W: Write> FrameWriter<W> {
    /// Creates a writer that encodes frames with `encoder`.
    pub fn new(writer: W, encoder: Encoder) -> Self {
        Self { writer, encoder }
    }

    /// Frame encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes and writes a statically typed message.
    pub fn send<M: MavMessage>(&mut self, message: &M) -> Result<Frame> {
        let frame = self.encoder.encode(message)?;
        self.send_frame(&frame)?;
        Ok(frame)
    }

    /// Encodes and writes a dynamic message.
    pub fn send_value(&mut self, value: &MessageValue, table: &DialectTable) -> Result<Frame> {
        let frame = self.encoder.encode_value(value, table)?;
        self.send_frame(&frame)?;
        Ok(frame)
    }

    /// Wraps an encoded payload into a frame and writes it.
    pub fn send_payload(&mut self, payload: Payload, crc_extra: CrcExtra) -> Result<Frame> {
        let frame = self.encoder.encode_payload(payload, crc_extra)?;
        self.send_frame(&frame)?;
        Ok(frame)
    }

    /// Writes an already built frame as is.
    pub fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_all(&frame.to_bytes())?;
        Ok(())
    }

    /// Flushes underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
