use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::consts::DEFAULT_READ_CHUNK_SIZE;
use crate::errors::DecodeError;
use crate::prelude::*;
use crate::protocol::consts::{STX_V1, STX_V2};
use crate::protocol::{decode_frame, CrcExtraLookup, Frame, Header, MavLinkVersion};

const TIMESTAMP_SIZE: usize = 8;

/// Telemetry log record.
#[derive(Clone, Debug, PartialEq)]
pub struct TlogRecord {
    /// Microseconds since UNIX epoch.
    pub timestamp: u64,
    /// Decoded frame or the reason it was rejected.
    pub frame: core::result::Result<Frame, DecodeError>,
}

/// Writes telemetry log (`.tlog`) files.
///
/// Each record is a big-endian `u64` timestamp in microseconds since UNIX epoch followed by a raw
/// MAVLink frame.
#[derive(Debug)]
pub struct TlogWriter<W: Write> {
    writer: W,
}

/// Reads telemetry log (`.tlog`) files written by [`TlogWriter`] or ground control stations.
///
/// A corrupted record is returned with [`TlogRecord::frame`] set to the decoding error. The reader
/// then searches for the next record starting right after the start marker of the corrupted frame.
///
/// # Usage
///
/// ```rust
/// use std::collections::HashMap;
/// use mavkit::io::{TlogReader, TlogWriter};
/// use mavkit::protocol::{encode_frame, MavLinkVersion, Payload};
///
/// let bytes = encode_frame(Payload::new(0, &[1, 2, 3], MavLinkVersion::V2), 50, 0, 1, 1, None)
///     .unwrap();
///
/// let mut writer = TlogWriter::new(Vec::new());
/// writer.write_raw(1_700_000_000_000_000, &bytes).unwrap();
///
/// let log = writer.into_inner();
/// let mut reader = TlogReader::new(log.as_slice(), HashMap::from([(0, 50)]));
///
/// let record = reader.read_record().unwrap().unwrap();
/// assert_eq!(record.timestamp, 1_700_000_000_000_000);
/// assert!(record.frame.is_ok());
/// assert!(reader.read_record().unwrap().is_none());
/// ```
#[derive(Debug)]
pub struct TlogReader<R: Read, L: CrcExtraLookup> {
    reader: R,
    lookup: L,
    window: Vec<u8>,
    chunk: Vec<u8>,
    skipped: u64,
}

impl TlogRecord {
    /// Record time.
    pub fn time(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_micros(self.timestamp)
    }
}

impl<W: Write> TlogWriter<W> {
    /// Creates a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a frame stamped with current time.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_frame_at(frame, SystemTime::now())
    }

    /// Writes a frame stamped with `time`.
    pub fn write_frame_at(&mut self, frame: &Frame, time: SystemTime) -> Result<()> {
        let timestamp = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        self.write_raw(timestamp, &frame.to_bytes())
    }

    /// Writes raw frame bytes.
    pub fn write_raw(&mut self, timestamp: u64, frame: &[u8]) -> Result<()> {
        self.writer.write_all(&timestamp.to_be_bytes())?;
        self.writer.write_all(frame)?;
        Ok(())
    }

    /// Flushes underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<R: Read, L: CrcExtraLookup> TlogReader<R, L> {
    /// Creates a reader.
    pub fn new(reader: R, lookup: L) -> Self {
        Self {
            reader,
            lookup,
            window: Vec::new(),
            chunk: vec![0; DEFAULT_READ_CHUNK_SIZE],
            skipped: 0,
        }
    }

    /// Number of bytes skipped while searching for records.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at the end of the log. An incomplete record at the end of the log is
    /// ignored.
    pub fn read_record(&mut self) -> Result<Option<TlogRecord>> {
        loop {
            if !self.fill(TIMESTAMP_SIZE + 1)? {
                return Ok(self.finish());
            }

            let version = match self.window[TIMESTAMP_SIZE] {
                STX_V1 => MavLinkVersion::V1,
                STX_V2 => MavLinkVersion::V2,
                _ => {
                    self.window.remove(0);
                    self.skipped += 1;
                    continue;
                }
            };

            let mut ts = [0u8; TIMESTAMP_SIZE];
            ts.copy_from_slice(&self.window[..TIMESTAMP_SIZE]);
            let timestamp = u64::from_be_bytes(ts);

            if !self.fill(TIMESTAMP_SIZE + version.header_size())? {
                return Ok(self.finish());
            }
            let header = match Header::decode(&self.window[TIMESTAMP_SIZE..]) {
                Ok(header) => header,
                Err(err) => return Ok(Some(self.reject(timestamp, err))),
            };

            let record_size = TIMESTAMP_SIZE + header.frame_size();
            if !self.fill(record_size)? {
                return Ok(self.finish());
            }

            return Ok(Some(
                match decode_frame(&self.window[TIMESTAMP_SIZE..record_size], &self.lookup) {
                    Ok(frame) => {
                        self.window.drain(..record_size);
                        TlogRecord {
                            timestamp,
                            frame: Ok(frame),
                        }
                    }
                    // Frame is well-formed, only its checksum can't be verified
                    Err(err @ DecodeError::UnknownMessage { .. }) => {
                        self.window.drain(..record_size);
                        TlogRecord {
                            timestamp,
                            frame: Err(err),
                        }
                    }
                    Err(err) => self.reject(timestamp, err),
                },
            ));
        }
    }

    /// Drops timestamp and start marker of a corrupted record.
    fn reject(&mut self, timestamp: u64, err: DecodeError) -> TlogRecord {
        log::trace!("corrupted record at {timestamp}: {err}");
        self.window.drain(..TIMESTAMP_SIZE + 1);
        TlogRecord {
            timestamp,
            frame: Err(err),
        }
    }

    fn finish(&mut self) -> Option<TlogRecord> {
        if !self.window.is_empty() {
            log::debug!("ignoring {} trailing bytes", self.window.len());
            self.skipped += self.window.len() as u64;
            self.window.clear();
        }
        None
    }

    /// Reads until window holds at least `len` bytes. Returns `false` at the end of stream.
    fn fill(&mut self, len: usize) -> Result<bool> {
        while self.window.len() < len {
            let read = match self.reader.read(&mut self.chunk) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                return Ok(false);
            }
            self.window.extend_from_slice(&self.chunk[..read]);
        }
        Ok(true)
    }
}

impl<R: Read, L: CrcExtraLookup> Iterator for TlogReader<R, L> {
    type Item = Result<TlogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

#[cfg(test)]
mod tlog_tests {
    use std::collections::HashMap;

    use super::*;
    use crate::protocol::{encode_frame, CrcExtra, MessageId, Payload};

    fn lookup() -> HashMap<MessageId, CrcExtra> {
        HashMap::from([(0, 50)])
    }

    fn frame(sequence: u8) -> Vec<u8> {
        encode_frame(
            Payload::new(0, &[0, 0, 0, 0, 6, 8, 0, 4, 3], MavLinkVersion::V2),
            50,
            sequence,
            1,
            1,
            None,
        )
        .unwrap()
    }

    #[test]
    fn write_and_read() {
        let time = UNIX_EPOCH + Duration::from_micros(1_600_000_000_123_456);
        let mut writer = TlogWriter::new(Vec::new());
        for seq in 0..3u8 {
            let frame = decode_frame(&frame(seq), &lookup()).unwrap();
            writer
                .write_frame_at(&frame, time + Duration::from_millis(seq as u64))
                .unwrap();
        }
        let log = writer.into_inner();
        assert_eq!(&log[..8], &1_600_000_000_123_456u64.to_be_bytes());

        let records: Vec<TlogRecord> = TlogReader::new(log.as_slice(), lookup())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].time(), time + Duration::from_millis(2));
        assert_eq!(records[1].frame.as_ref().unwrap().sequence(), 1);
    }

    #[test]
    fn corrupted_records() {
        let mut writer = TlogWriter::new(Vec::new());
        let mut corrupted = frame(0);
        corrupted[14] ^= 0x10;
        writer.write_raw(1, &corrupted).unwrap();
        writer.write_raw(2, &frame(1)).unwrap();
        writer.write_raw(3, &[STX_V2, 9, 0]).unwrap();
        let log = writer.into_inner();

        let mut reader = TlogReader::new(log.as_slice(), lookup());

        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.timestamp, 1);
        assert!(matches!(record.frame, Err(DecodeError::CrcMismatch { .. })));

        let record = reader.read_record().unwrap().unwrap();
        assert_eq!(record.timestamp, 2);
        assert_eq!(record.frame.unwrap().sequence(), 1);

        // Truncated tail
        assert!(reader.read_record().unwrap().is_none());
        assert!(reader.skipped() > 0);
    }

    #[test]
    fn unknown_messages_keep_alignment() {
        let mut writer = TlogWriter::new(Vec::new());
        writer.write_raw(1, &frame(0)).unwrap();
        writer.write_raw(2, &frame(1)).unwrap();
        let log = writer.into_inner();

        let records: Vec<TlogRecord> =
            TlogReader::new(log.as_slice(), HashMap::<MessageId, CrcExtra>::new())
                .collect::<Result<_>>()
                .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| matches!(r.frame, Err(DecodeError::UnknownMessage { id: 0, .. }))));
    }
}
