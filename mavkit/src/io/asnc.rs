use std::io::ErrorKind;

use async_stream::stream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::Stream;

use crate::consts::DEFAULT_READ_CHUNK_SIZE;
use crate::prelude::*;
use crate::protocol::{
    CrcExtra, CrcExtraLookup, DialectTable, Encoder, Frame, MavMessage, MessageValue,
    ParserEvent, Payload, StreamParser,
};

/// <sup>[`async`](crate::io)</sup>
/// Reads MAVLink frames from an [`AsyncRead`] stream.
///
/// # Usage
///
/// ```rust
/// # #[tokio::main] async fn main() {
/// use std::collections::HashMap;
/// use mavkit::io::AsyncFrameReader;
///
/// let bytes: &[u8] = &[
///     0xFD, 9, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 4, 3, 0x1A, 0x0E,
/// ];
/// let mut reader = AsyncFrameReader::new(bytes, HashMap::from([(0, 50)]));
///
/// let frame = reader.recv_frame().await.unwrap();
/// assert_eq!(frame.sequence(), 1);
/// # }
/// ```
#[derive(Debug)]
pub struct AsyncFrameReader<R: AsyncRead + Unpin, L: CrcExtraLookup> {
    reader: R,
    parser: StreamParser<L>,
    chunk: Vec<u8>,
}

/// <sup>[`async`](crate::io)</sup>
/// Writes MAVLink frames into an [`AsyncWrite`] stream.
#[derive(Debug)]
pub struct AsyncFrameWriter<W: AsyncWrite + Unpin> {
    writer: W,
    encoder: Encoder,
}

impl<R: AsyncRead + Unpin, L: CrcExtraLookup> AsyncFrameReader<R, L> {
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

    /// Returns underlying reader dropping parser state.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Waits for the next parser event.
    ///
    /// Returns [`Error::Io`] with [`ErrorKind::UnexpectedEof`] when the stream ends.
    pub async fn recv(&mut self) -> Result<ParserEvent> {
        loop {
            if let Some(event) = self.parser.next_event() {
                return Ok(event);
            }

            let read = match self.reader.read(&mut self.chunk).await {
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

    /// Waits for the next valid frame skipping errors and packet loss events.
    pub async fn recv_frame(&mut self) -> Result<Frame> {
        loop {
            match self.recv().await? {
                ParserEvent::Frame(frame) => return Ok(frame),
                ParserEvent::Error(err) => log::trace!("skipping invalid frame: {err}"),
                ParserEvent::PacketLoss { .. } => {}
            }
        }
    }

    /// Converts reader into a stream of parser events.
    ///
    /// Stream ends with the underlying reader. I/O errors are yielded once and end the stream.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<ParserEvent>> {
        stream! {
            loop {
                match self.recv().await {
                    Ok(event) => yield Ok(event),
                    Err(Error::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
                    Err(err) => {
                        yield Err(err);
                        break;
                    }
                }
            }
        }
    }
}

impl<W: AsyncWrite + Unpin> AsyncFrameWriter<W> {
    /// Creates a writer that encodes frames with `encoder`.
    pub fn new(writer: W, encoder: Encoder) -> Self {
        Self { writer, encoder }
    }

    /// Frame encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Returns underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encodes and writes a statically typed message.
    pub async fn send<M: MavMessage>(&mut self, message: &M) -> Result<Frame> {
        let frame = self.encoder.encode(message)?;
        self.send_frame(&frame).await?;
        Ok(frame)
    }

    /// Encodes and writes a dynamic message.
    pub async fn send_value(
        &mut self,
        value: &MessageValue,
        table: &DialectTable,
    ) -> Result<Frame> {
        let frame = self.encoder.encode_value(value, table)?;
        self.send_frame(&frame).await?;
        Ok(frame)
    }

    /// Wraps an encoded payload into a frame and writes it.
    pub async fn send_payload(&mut self, payload: Payload, crc_extra: CrcExtra) -> Result<Frame> {
        let frame = self.encoder.encode_payload(payload, crc_extra)?;
        self.send_frame(&frame).await?;
        Ok(frame)
    }

    /// Writes an already built frame as is.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_all(&frame.to_bytes()).await?;
        Ok(())
    }

    /// Flushes underlying writer.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
