use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::errors::{DecodeError, EncodeError};
use crate::protocol::consts::MESSAGE_ID_V1_MAX;
use crate::protocol::{CrcExtra, MavLinkVersion, MessageId};

/// <sup>[`serde`](https://serde.rs)</sup>
/// Encoded message payload.
///
/// `MAVLink 2` payloads are stored truncated: trailing zero bytes are removed, keeping at least one
/// byte. `MAVLink 1` payloads are stored as is.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Payload {
    id: MessageId,
    version: MavLinkVersion,
    bytes: Vec<u8>,
}

/// Statically typed MAVLink message.
///
/// Implemented by message structs produced by the Rust code generation backend.
pub trait MavMessage: Sized {
    /// Message `ID`.
    const ID: MessageId;
    /// Message name as in definitions.
    const NAME: &'static str;
    /// CRC-extra of the message layout.
    const CRC_EXTRA: CrcExtra;
    /// `MAVLink 1` payload length.
    const BASE_LEN: usize;
    /// Untruncated `MAVLink 2` payload length.
    const MAX_LEN: usize;

    /// Encodes message into a payload of the specified protocol version.
    fn encode_payload(&self, version: MavLinkVersion) -> Result<Payload, EncodeError>;

    /// Decodes message from a payload.
    ///
    /// Fields absent from a `MAVLink 1` or truncated `MAVLink 2` payload are zero.
    fn decode_payload(payload: &Payload) -> Result<Self, DecodeError>;
}

/// Provides CRC-extra values for message `IDs`.
///
/// This is the only information about a dialect that frame decoding requires.
pub trait CrcExtraLookup {
    /// CRC-extra for a message or [`None`] if message is unknown.
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra>;

    /// Maximum payload length for a message.
    ///
    /// Frames with longer payloads are rejected. The default implementation does not restrict
    /// payload length.
    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        let _ = id;
        None
    }
}

/// Writes message fields into a payload buffer.
///
/// Fields must be written in payload order. All values are little-endian.
#[derive(Clone, Debug)]
pub struct PayloadWriter {
    id: MessageId,
    base_len: usize,
    buf: Vec<u8>,
}

/// Reads message fields from a payload.
///
/// Reads past the end of the received bytes return zeros.
#[derive(Clone, Debug)]
pub struct PayloadReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Payload {
    /// Creates a payload from untruncated bytes.
    ///
    /// `MAVLink 2` payloads are truncated.
    pub fn new(id: MessageId, bytes: &[u8], version: MavLinkVersion) -> Self {
        let bytes = match version {
            MavLinkVersion::V1 => bytes.to_vec(),
            MavLinkVersion::V2 => truncate(bytes).to_vec(),
        };
        Self { id, version, bytes }
    }

    /// Creates payload from bytes received on the wire.
    pub(crate) fn from_wire(id: MessageId, bytes: &[u8], version: MavLinkVersion) -> Self {
        Self {
            id,
            version,
            bytes: bytes.to_vec(),
        }
    }

    /// Message `ID`.
    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Protocol version.
    #[inline]
    pub fn version(&self) -> MavLinkVersion {
        self.version
    }

    /// Payload bytes as they are sent on the wire.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }

    /// Payload length on the wire.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if payload has no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes zero-extended to `len`.
    pub fn extended(&self, len: usize) -> Vec<u8> {
        let mut bytes = self.bytes.clone();
        if bytes.len() < len {
            bytes.resize(len, 0);
        }
        bytes
    }
}

/// Removes trailing zero bytes keeping at least one byte.
pub(crate) fn truncate(bytes: &[u8]) -> &[u8] {
    let len = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|idx| idx + 1)
        .unwrap_or(0)
        .max(1)
        .min(bytes.len());
    &bytes[..len]
}

impl PayloadWriter {
    /// Creates a writer for a message with given layout.
    pub fn new(id: MessageId, base_len: usize, max_len: usize) -> Self {
        Self {
            id,
            base_len,
            buf: Vec::with_capacity(max_len),
        }
    }

    /// Creates a writer for a statically typed message.
    pub fn for_message<M: MavMessage>() -> Self {
        Self::new(M::ID, M::BASE_LEN, M::MAX_LEN)
    }

    /// Writes `uint8_t`.
    #[inline]
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Writes `int8_t`.
    #[inline]
    pub fn put_i8(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `uint16_t`.
    #[inline]
    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `int16_t`.
    #[inline]
    pub fn put_i16(&mut self, value: i16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `uint32_t`.
    #[inline]
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `int32_t`.
    #[inline]
    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `uint64_t`.
    #[inline]
    pub fn put_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `int64_t`.
    #[inline]
    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `float`.
    #[inline]
    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `double`.
    #[inline]
    pub fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes `char[len]` padding the string with zeros.
    ///
    /// Fails if string is longer than `len` bytes. A string of exactly `len` bytes is written
    /// without a terminating zero.
    pub fn put_str(
        &mut self,
        message: &str,
        field: &str,
        value: &str,
        len: usize,
    ) -> Result<(), EncodeError> {
        let bytes = value.as_bytes();
        if bytes.len() > len {
            return Err(EncodeError::ArrayLength {
                message: message.to_string(),
                field: field.to_string(),
                expected: len,
                actual: bytes.len(),
            });
        }
        self.buf.extend_from_slice(bytes);
        self.buf.resize(self.buf.len() + len - bytes.len(), 0);
        Ok(())
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing was written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finishes payload for the specified protocol version.
    ///
    /// `MAVLink 1` payloads are cut to the base length, so extension fields are never sent.
    pub fn finish(mut self, version: MavLinkVersion) -> Result<Payload, EncodeError> {
        if version == MavLinkVersion::V1 {
            if self.id > MESSAGE_ID_V1_MAX {
                return Err(EncodeError::MessageIdTooLarge(self.id));
            }
            self.buf.truncate(self.base_len);
        }
        Ok(Payload::new(self.id, &self.buf, version))
    }
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader over payload bytes.
    ///
    /// Fails if payload is longer than `max_len`.
    pub fn new(payload: &'a Payload, max_len: usize) -> Result<Self, DecodeError> {
        if payload.len() > max_len {
            return Err(DecodeError::InvalidPayloadLength {
                id: payload.id(),
                len: payload.len(),
                max: max_len,
            });
        }
        Ok(Self {
            bytes: payload.bytes(),
            pos: 0,
        })
    }

    /// Creates a reader for a statically typed message.
    pub fn for_message<M: MavMessage>(payload: &'a Payload) -> Result<Self, DecodeError> {
        Self::new(payload, M::MAX_LEN)
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let start = self.pos.min(self.bytes.len());
        let end = (self.pos + N).min(self.bytes.len());
        out[..end - start].copy_from_slice(&self.bytes[start..end]);
        self.pos += N;
        out
    }

    /// Reads `uint8_t`.
    #[inline]
    pub fn get_u8(&mut self) -> u8 {
        u8::from_le_bytes(self.take())
    }

    /// Reads `int8_t`.
    #[inline]
    pub fn get_i8(&mut self) -> i8 {
        i8::from_le_bytes(self.take())
    }

    /// Reads `uint16_t`.
    #[inline]
    pub fn get_u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }

    /// Reads `int16_t`.
    #[inline]
    pub fn get_i16(&mut self) -> i16 {
        i16::from_le_bytes(self.take())
    }

    /// Reads `uint32_t`.
    #[inline]
    pub fn get_u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }

    /// Reads `int32_t`.
    #[inline]
    pub fn get_i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take())
    }

    /// Reads `uint64_t`.
    #[inline]
    pub fn get_u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }

    /// Reads `int64_t`.
    #[inline]
    pub fn get_i64(&mut self) -> i64 {
        i64::from_le_bytes(self.take())
    }

    /// Reads `float`.
    #[inline]
    pub fn get_f32(&mut self) -> f32 {
        f32::from_le_bytes(self.take())
    }

    /// Reads `double`.
    #[inline]
    pub fn get_f64(&mut self) -> f64 {
        f64::from_le_bytes(self.take())
    }

    /// Reads `char[len]` up to the first zero byte.
    ///
    /// Invalid UTF-8 sequences are replaced.
    pub fn get_str(&mut self, len: usize) -> String {
        let start = self.pos.min(self.bytes.len());
        let end = (self.pos + len).min(self.bytes.len());
        self.pos += len;

        let raw = &self.bytes[start..end];
        let raw = match raw.iter().position(|&b| b == 0) {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        String::from_utf8_lossy(raw).into_owned()
    }
}

impl CrcExtraLookup for HashMap<MessageId, CrcExtra> {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        self.get(&id).copied()
    }
}

impl CrcExtraLookup for BTreeMap<MessageId, CrcExtra> {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        self.get(&id).copied()
    }
}

impl<L: CrcExtraLookup + ?Sized> CrcExtraLookup for &L {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        (**self).crc_extra(id)
    }

    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        (**self).max_payload_len(id)
    }
}

impl<L: CrcExtraLookup + ?Sized> CrcExtraLookup for Arc<L> {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        (**self).crc_extra(id)
    }

    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        (**self).max_payload_len(id)
    }
}

impl<L: CrcExtraLookup + ?Sized> CrcExtraLookup for Box<L> {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        (**self).crc_extra(id)
    }

    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        (**self).max_payload_len(id)
    }
}

#[cfg(test)]
mod payload_tests {
    use super::*;

    #[test]
    fn truncation() {
        assert_eq!(truncate(&[1, 2, 0, 0]), &[1, 2]);
        assert_eq!(truncate(&[0, 0, 0]), &[0]);
        assert_eq!(truncate(&[0, 0, 3]), &[0, 0, 3]);
        assert_eq!(truncate(&[]), &[] as &[u8]);

        let payload = Payload::new(0, &[5, 0, 0], MavLinkVersion::V2);
        assert_eq!(payload.bytes(), &[5]);
        let payload = Payload::new(0, &[5, 0, 0], MavLinkVersion::V1);
        assert_eq!(payload.bytes(), &[5, 0, 0]);
    }

    #[test]
    fn writer_and_reader() {
        let mut writer = PayloadWriter::new(300, 7, 9);
        writer.put_u32(0xDEADBEEF);
        writer.put_i16(-2);
        writer.put_u8(7);
        writer.put_str("MSG", "name", "ab", 2).unwrap();
        assert_eq!(writer.len(), 9);

        let payload = writer.finish(MavLinkVersion::V2).unwrap();
        assert_eq!(payload.len(), 9);

        let mut reader = PayloadReader::new(&payload, 9).unwrap();
        assert_eq!(reader.get_u32(), 0xDEADBEEF);
        assert_eq!(reader.get_i16(), -2);
        assert_eq!(reader.get_u8(), 7);
        assert_eq!(reader.get_str(2), "ab");
        // Past the end
        assert_eq!(reader.get_u64(), 0);
    }

    #[test]
    fn v1_cuts_extensions_and_large_ids() {
        let mut writer = PayloadWriter::new(1, 2, 4);
        writer.put_u16(0);
        writer.put_u16(0xFFFF);
        let payload = writer.clone().finish(MavLinkVersion::V1).unwrap();
        assert_eq!(payload.bytes(), &[0, 0]);
        let payload = writer.finish(MavLinkVersion::V2).unwrap();
        assert_eq!(payload.bytes(), &[0, 0, 0xFF, 0xFF]);

        let writer = PayloadWriter::new(300, 1, 1);
        assert_eq!(
            writer.finish(MavLinkVersion::V1),
            Err(EncodeError::MessageIdTooLarge(300))
        );
    }

    #[test]
    fn strings() {
        let mut writer = PayloadWriter::new(1, 4, 4);
        assert!(matches!(
            writer.put_str("MSG", "name", "abcde", 4),
            Err(EncodeError::ArrayLength {
                expected: 4,
                actual: 5,
                ..
            })
        ));
        writer.put_str("MSG", "name", "ab", 4).unwrap();
        let payload = writer.finish(MavLinkVersion::V1).unwrap();
        assert_eq!(payload.bytes(), b"ab\0\0");

        let mut reader = PayloadReader::new(&payload, 4).unwrap();
        assert_eq!(reader.get_str(4), "ab");

        assert!(matches!(
            PayloadReader::new(&payload, 3),
            Err(DecodeError::InvalidPayloadLength { len: 4, max: 3, .. })
        ));
    }
}
