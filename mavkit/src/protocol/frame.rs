//! MAVLink frame.

use crate::errors::{DecodeError, EncodeError};
use crate::protocol::consts::{
    CHECKSUM_SIZE, MAVLINK_IFLAG_SIGNED, MAVLINK_SUPPORTED_IFLAGS, MESSAGE_ID_V1_MAX,
    MESSAGE_ID_V2_MAX, PAYLOAD_MAX_SIZE, SIGNATURE_SIZE,
};
use crate::protocol::crc::checksum;
use crate::protocol::{
    Checksum, ComponentId, CrcExtra, CrcExtraLookup, FrameSigner, MavLinkId, MavLinkVersion,
    MavMessage, MavTimestamp, MessageId, Payload, Sequence, Signature, SignedLinkId, SystemId,
};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink frame header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    version: MavLinkVersion,
    payload_length: u8,
    incompat_flags: u8,
    compat_flags: u8,
    sequence: Sequence,
    system_id: SystemId,
    component_id: ComponentId,
    message_id: MessageId,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink frame: header, payload, checksum, and optional signature.
///
/// Frames are produced either by decoding ([`decode_frame`],
/// [`StreamParser`](crate::protocol::StreamParser)) or by encoding ([`Frame::builder`],
/// [`Encoder`](crate::protocol::Encoder)). A frame always has a checksum consistent with its header
/// and payload for the CRC-extra it was built or verified with.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    header: Header,
    payload: Payload,
    checksum: Checksum,
    signature: Option<Signature>,
}

/// Builder for [`Frame`].
///
/// # Usage
///
/// ```rust
/// use mavkit::protocol::{Frame, MavLinkVersion, Payload};
///
/// let payload = Payload::new(0, &[0, 0, 0, 0, 6, 8, 0, 4, 3], MavLinkVersion::V2);
/// let frame = Frame::builder()
///     .sequence(1)
///     .system_id(1)
///     .component_id(1)
///     .build(payload, 50)
///     .unwrap();
///
/// assert_eq!(frame.checksum(), 0x0e1a);
/// ```
#[derive(Clone, Debug, Default)]
pub struct FrameBuilder<'a> {
    sequence: Sequence,
    system_id: SystemId,
    component_id: ComponentId,
    compat_flags: u8,
    signer: Option<&'a FrameSigner>,
}

impl Header {
    /// Protocol version.
    #[inline]
    pub fn version(&self) -> MavLinkVersion {
        self.version
    }

    /// Payload length.
    #[inline]
    pub fn payload_length(&self) -> u8 {
        self.payload_length
    }

    /// Incompatibility flags (always zero for `MAVLink 1`).
    #[inline]
    pub fn incompat_flags(&self) -> u8 {
        self.incompat_flags
    }

    /// Compatibility flags (always zero for `MAVLink 1`).
    #[inline]
    pub fn compat_flags(&self) -> u8 {
        self.compat_flags
    }

    /// Packet sequence number.
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// System `ID`.
    #[inline]
    pub fn system_id(&self) -> SystemId {
        self.system_id
    }

    /// Component `ID`.
    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Message `ID`.
    #[inline]
    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Whether signature flag is set.
    #[inline]
    pub fn is_signed(&self) -> bool {
        self.version == MavLinkVersion::V2 && self.incompat_flags & MAVLINK_IFLAG_SIGNED != 0
    }

    /// Header size including the start marker.
    #[inline]
    pub fn size(&self) -> usize {
        self.version.header_size()
    }

    /// Full frame size described by this header.
    pub fn frame_size(&self) -> usize {
        let signature = if self.is_signed() { SIGNATURE_SIZE } else { 0 };
        self.size() + self.payload_length as usize + CHECKSUM_SIZE + signature
    }

    /// Parses header bytes (including start marker).
    ///
    /// Slice must contain at least [`MavLinkVersion::header_size`] bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let marker = *bytes.first().ok_or(DecodeError::Truncated {
            expected: 1,
            actual: 0,
        })?;
        let version = MavLinkVersion::from_marker(marker).ok_or(DecodeError::InvalidMarker(marker))?;

        if bytes.len() < version.header_size() {
            return Err(DecodeError::Truncated {
                expected: version.header_size(),
                actual: bytes.len(),
            });
        }

        let header = match version {
            MavLinkVersion::V1 => Self {
                version,
                payload_length: bytes[1],
                incompat_flags: 0,
                compat_flags: 0,
                sequence: bytes[2],
                system_id: bytes[3],
                component_id: bytes[4],
                message_id: bytes[5] as MessageId,
            },
            MavLinkVersion::V2 => {
                let incompat_flags = bytes[2];
                if incompat_flags & !MAVLINK_SUPPORTED_IFLAGS != 0 {
                    return Err(DecodeError::IncompatibleFlags(incompat_flags));
                }
                Self {
                    version,
                    payload_length: bytes[1],
                    incompat_flags,
                    compat_flags: bytes[3],
                    sequence: bytes[4],
                    system_id: bytes[5],
                    component_id: bytes[6],
                    message_id: u32::from_le_bytes([bytes[7], bytes[8], bytes[9], 0]),
                }
            }
        };

        Ok(header)
    }

    /// Header bytes including the start marker.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.push(self.version.marker());
        bytes.push(self.payload_length);
        match self.version {
            MavLinkVersion::V1 => {
                bytes.extend_from_slice(&[
                    self.sequence,
                    self.system_id,
                    self.component_id,
                    self.message_id as u8,
                ]);
            }
            MavLinkVersion::V2 => {
                bytes.extend_from_slice(&[
                    self.incompat_flags,
                    self.compat_flags,
                    self.sequence,
                    self.system_id,
                    self.component_id,
                ]);
                bytes.extend_from_slice(&self.message_id.to_le_bytes()[..3]);
            }
        }
        bytes
    }
}

impl Frame {
    /// Instantiates an empty [`FrameBuilder`].
    pub fn builder<'a>() -> FrameBuilder<'a> {
        FrameBuilder::default()
    }

    /// Frame header.
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Protocol version.
    #[inline]
    pub fn version(&self) -> MavLinkVersion {
        self.header.version
    }

    /// Packet sequence number.
    #[inline]
    pub fn sequence(&self) -> Sequence {
        self.header.sequence
    }

    /// System `ID`.
    #[inline]
    pub fn system_id(&self) -> SystemId {
        self.header.system_id
    }

    /// Component `ID`.
    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.header.component_id
    }

    /// Sender `ID`: system and component.
    #[inline]
    pub fn sender(&self) -> MavLinkId {
        MavLinkId::new(self.header.system_id, self.header.component_id)
    }

    /// Message `ID`.
    #[inline]
    pub fn message_id(&self) -> MessageId {
        self.header.message_id
    }

    /// Payload.
    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Checksum.
    #[inline]
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// `MAVLink 2` signature.
    #[inline]
    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// Whether a frame is signed.
    #[inline]
    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Signature link `ID`.
    #[inline]
    pub fn link_id(&self) -> Option<SignedLinkId> {
        self.signature.map(|s| s.link_id)
    }

    /// Signature timestamp.
    #[inline]
    pub fn timestamp(&self) -> Option<MavTimestamp> {
        self.signature.map(|s| s.timestamp)
    }

    /// Frame size on the wire.
    #[inline]
    pub fn size(&self) -> usize {
        self.header.frame_size()
    }

    /// Decodes payload into a statically typed message.
    pub fn decode<M: MavMessage>(&self) -> Result<M, DecodeError> {
        if self.message_id() != M::ID {
            return Err(DecodeError::UnknownMessage {
                id: self.message_id(),
                raw: self.to_bytes(),
            });
        }
        M::decode_payload(&self.payload)
    }

    /// Bytes covered by signature: everything from the start marker to the checksum.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(self.payload.bytes());
        bytes.extend_from_slice(&self.checksum.to_le_bytes());
        bytes
    }

    /// Wire representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.signed_bytes();
        if let Some(signature) = &self.signature {
            bytes.extend_from_slice(&signature.to_bytes());
        }
        bytes
    }

    /// Verifies frame checksum against the provided CRC-extra.
    pub fn checksum_matches(&self, crc_extra: CrcExtra) -> bool {
        self.calculate_checksum(crc_extra) == self.checksum
    }

    fn calculate_checksum(&self, crc_extra: CrcExtra) -> Checksum {
        checksum(&self.header.to_bytes()[1..], self.payload.bytes(), crc_extra)
    }
}

impl<'a> FrameBuilder<'a> {
    /// Set packet sequence number.
    pub fn sequence(self, sequence: Sequence) -> Self {
        Self { sequence, ..self }
    }

    /// Set system `ID`.
    pub fn system_id(self, system_id: SystemId) -> Self {
        Self { system_id, ..self }
    }

    /// Set component `ID`.
    pub fn component_id(self, component_id: ComponentId) -> Self {
        Self {
            component_id,
            ..self
        }
    }

    /// Set `MAVLink 2` compatibility flags.
    pub fn compat_flags(self, compat_flags: u8) -> Self {
        Self {
            compat_flags,
            ..self
        }
    }

    /// Set signer for `MAVLink 2` frames.
    ///
    /// Frame is signed only if [`FrameSigner::should_sign`] allows it.
    pub fn signer(self, signer: &'a FrameSigner) -> Self {
        Self {
            signer: Some(signer),
            ..self
        }
    }

    /// Builds frame for a payload.
    ///
    /// Protocol version is defined by payload. `MAVLink 1` frames can't carry message `IDs` above
    /// 255, `MAVLink 2` frames are limited to 24 bits. Payloads can't exceed 255 bytes.
    pub fn build(self, payload: Payload, crc_extra: CrcExtra) -> Result<Frame, EncodeError> {
        let version = payload.version();
        let max_id = match version {
            MavLinkVersion::V1 => MESSAGE_ID_V1_MAX,
            MavLinkVersion::V2 => MESSAGE_ID_V2_MAX,
        };
        if payload.id() > max_id {
            return Err(EncodeError::MessageIdTooLarge(payload.id()));
        }
        if payload.len() > PAYLOAD_MAX_SIZE {
            return Err(EncodeError::PayloadTooLarge {
                len: payload.len(),
                max: PAYLOAD_MAX_SIZE,
            });
        }

        let signer = self
            .signer
            .filter(|signer| signer.should_sign(version, payload.id()));

        let header = Header {
            version,
            payload_length: payload.len() as u8,
            incompat_flags: if signer.is_some() {
                MAVLINK_IFLAG_SIGNED
            } else {
                0
            },
            compat_flags: match version {
                MavLinkVersion::V1 => 0,
                MavLinkVersion::V2 => self.compat_flags,
            },
            sequence: self.sequence,
            system_id: self.system_id,
            component_id: self.component_id,
            message_id: payload.id(),
        };

        let mut frame = Frame {
            header,
            payload,
            checksum: 0,
            signature: None,
        };
        frame.checksum = frame.calculate_checksum(crc_extra);

        if let Some(signer) = signer {
            frame.signature = Some(signer.sign_bytes(&frame.signed_bytes()));
        }

        Ok(frame)
    }
}

/// Encodes payload into frame bytes.
///
/// This is a shortcut for [`Frame::builder`] followed by [`Frame::to_bytes`].
pub fn encode_frame(
    payload: Payload,
    crc_extra: CrcExtra,
    sequence: Sequence,
    system_id: SystemId,
    component_id: ComponentId,
    signer: Option<&FrameSigner>,
) -> Result<Vec<u8>, EncodeError> {
    let mut builder = Frame::builder()
        .sequence(sequence)
        .system_id(system_id)
        .component_id(component_id);
    if let Some(signer) = signer {
        builder = builder.signer(signer);
    }
    Ok(builder.build(payload, crc_extra)?.to_bytes())
}

/// Decodes a single frame from the beginning of `bytes`.
///
/// Trailing bytes after the frame are ignored, use [`Frame::size`] to find where the frame ends.
/// Signatures are parsed but not verified, see [`FrameSigner::has_valid_signature`].
///
/// Returns [`DecodeError::Truncated`] if `bytes` hold less than a complete frame.
pub fn decode_frame<L: CrcExtraLookup + ?Sized>(
    bytes: &[u8],
    lookup: &L,
) -> Result<Frame, DecodeError> {
    let header = Header::decode(bytes)?;
    let size = header.frame_size();
    if bytes.len() < size {
        return Err(DecodeError::Truncated {
            expected: size,
            actual: bytes.len(),
        });
    }

    let id = header.message_id;
    let crc_extra = lookup
        .crc_extra(id)
        .ok_or_else(|| DecodeError::UnknownMessage {
            id,
            raw: bytes[..size].to_vec(),
        })?;

    let payload_end = header.size() + header.payload_length as usize;
    if let Some(max) = lookup.max_payload_len(id) {
        if header.payload_length as usize > max {
            return Err(DecodeError::InvalidPayloadLength {
                id,
                len: header.payload_length as usize,
                max,
            });
        }
    }

    let received = Checksum::from_le_bytes([bytes[payload_end], bytes[payload_end + 1]]);
    let expected = checksum(&bytes[1..header.size()], &bytes[header.size()..payload_end], crc_extra);
    if expected != received {
        return Err(DecodeError::CrcMismatch {
            id,
            expected,
            actual: received,
        });
    }

    let signature = if header.is_signed() {
        let start = payload_end + CHECKSUM_SIZE;
        let mut raw = [0u8; SIGNATURE_SIZE];
        raw.copy_from_slice(&bytes[start..start + SIGNATURE_SIZE]);
        Some(Signature::from_bytes(&raw))
    } else {
        None
    };

    Ok(Frame {
        header,
        payload: Payload::from_wire(id, &bytes[header.size()..payload_end], header.version),
        checksum: received,
        signature,
    })
}

#[cfg(test)]
mod frame_tests {
    use super::*;
    use std::collections::HashMap;

    const HEARTBEAT_PAYLOAD: [u8; 9] = [0, 0, 0, 0, 6, 8, 0, 4, 3];

    fn lookup() -> HashMap<MessageId, CrcExtra> {
        HashMap::from([(0, 50)])
    }

    #[test]
    fn heartbeat_v2() {
        let payload = Payload::new(0, &HEARTBEAT_PAYLOAD, MavLinkVersion::V2);
        let bytes = encode_frame(payload, 50, 1, 1, 1, None).unwrap();

        assert_eq!(
            bytes,
            vec![0xFD, 9, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 4, 3, 0x1A, 0x0E]
        );

        let frame = decode_frame(bytes.as_slice(), &lookup()).unwrap();
        assert_eq!(frame.size(), bytes.len());
        assert_eq!(frame.sequence(), 1);
        assert_eq!(frame.payload().bytes(), &HEARTBEAT_PAYLOAD);
        assert!(!frame.is_signed());
        assert_eq!(frame.to_bytes(), bytes);
    }

    #[test]
    fn heartbeat_v1() {
        let payload = Payload::new(0, &HEARTBEAT_PAYLOAD, MavLinkVersion::V1);
        let bytes = encode_frame(payload, 50, 1, 1, 1, None).unwrap();

        assert_eq!(
            bytes,
            vec![0xFE, 9, 1, 1, 1, 0, 0, 0, 0, 0, 6, 8, 0, 4, 3, 0x7A, 0x3D]
        );

        let frame = decode_frame(bytes.as_slice(), &lookup()).unwrap();
        assert_eq!(frame.version(), MavLinkVersion::V1);
        assert_eq!(frame.message_id(), 0);
    }

    #[test]
    fn decode_errors() {
        let payload = Payload::new(0, &HEARTBEAT_PAYLOAD, MavLinkVersion::V2);
        let mut bytes = encode_frame(payload, 50, 1, 1, 1, None).unwrap();

        assert_eq!(
            decode_frame(&bytes[..5], &lookup()),
            Err(DecodeError::Truncated {
                expected: 10,
                actual: 5
            })
        );
        assert_eq!(
            decode_frame(&bytes[..15], &lookup()),
            Err(DecodeError::Truncated {
                expected: 21,
                actual: 15
            })
        );
        assert!(matches!(
            decode_frame(bytes.as_slice(), &HashMap::<MessageId, CrcExtra>::new()),
            Err(DecodeError::UnknownMessage { id: 0, .. })
        ));
        assert_eq!(
            decode_frame(&[0x55, 0, 0], &lookup()),
            Err(DecodeError::InvalidMarker(0x55))
        );

        bytes[14] ^= 0xFF;
        assert!(matches!(
            decode_frame(bytes.as_slice(), &lookup()),
            Err(DecodeError::CrcMismatch { id: 0, .. })
        ));

        bytes[2] = 0x80;
        assert_eq!(
            decode_frame(bytes.as_slice(), &lookup()),
            Err(DecodeError::IncompatibleFlags(0x80))
        );
    }

    #[test]
    fn v1_rejects_large_ids() {
        let payload = Payload::new(300, &[1], MavLinkVersion::V1);
        assert_eq!(
            encode_frame(payload, 0, 0, 1, 1, None),
            Err(EncodeError::MessageIdTooLarge(300))
        );
    }

    #[test]
    fn v2_rejects_oversized_frames() {
        let payload = Payload::new(0x100_0000, &[1], MavLinkVersion::V2);
        assert_eq!(
            encode_frame(payload, 0, 0, 1, 1, None),
            Err(EncodeError::MessageIdTooLarge(0x100_0000))
        );

        let payload = Payload::new(MESSAGE_ID_V2_MAX, &[1], MavLinkVersion::V2);
        let bytes = encode_frame(payload, 0, 0, 1, 1, None).unwrap();
        assert_eq!(&bytes[7..10], &[0xFF, 0xFF, 0xFF]);

        let payload = Payload::new(0, &[1; 300], MavLinkVersion::V2);
        assert_eq!(
            encode_frame(payload, 50, 0, 1, 1, None),
            Err(EncodeError::PayloadTooLarge { len: 300, max: 255 })
        );

        let mut encoder = crate::protocol::Encoder::default();
        assert_eq!(
            encoder.encode_payload(Payload::new(0, &[1; 256], MavLinkVersion::V2), 50),
            Err(EncodeError::PayloadTooLarge { len: 256, max: 255 })
        );
        assert_eq!(encoder.sequencer().current(), 0);
    }

    #[test]
    fn signed_frames() {
        let signer = FrameSigner::new(7, "secret");
        let payload = Payload::new(0, &HEARTBEAT_PAYLOAD, MavLinkVersion::V2);
        let bytes = encode_frame(payload, 50, 1, 1, 1, Some(&signer)).unwrap();

        assert_eq!(bytes.len(), 21 + SIGNATURE_SIZE);
        assert_eq!(bytes[2], MAVLINK_IFLAG_SIGNED);

        let frame = decode_frame(bytes.as_slice(), &lookup()).unwrap();
        assert_eq!(frame.link_id(), Some(7));
        assert!(signer.has_valid_signature(&frame));
        assert!(!FrameSigner::new(7, "other").has_valid_signature(&frame));

        // `MAVLink 1` frames are never signed
        let payload = Payload::new(0, &HEARTBEAT_PAYLOAD, MavLinkVersion::V1);
        let bytes = encode_frame(payload, 50, 1, 1, 1, Some(&signer)).unwrap();
        assert_eq!(bytes.len(), 17);
    }
}
