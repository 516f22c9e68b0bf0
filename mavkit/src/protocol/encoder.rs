use crate::consts::{DEFAULT_COMPONENT_ID, DEFAULT_SYSTEM_ID, DEFAULT_VERSION};
use crate::errors::EncodeError;
use crate::protocol::{
    ComponentId, CrcExtra, DialectTable, Frame, FrameSigner, MavLinkVersion, MavMessage,
    MessageValue, Payload, Sequencer, SystemId,
};

/// Encodes messages into frames on behalf of a single MAVLink component.
///
/// Keeps outgoing sequence numbers and an optional [`FrameSigner`]. Sequence number advances only
/// when a frame was successfully built.
///
/// # Usage
///
/// ```rust
/// use mavkit::protocol::{Encoder, MavLinkVersion, Payload};
///
/// let mut encoder = Encoder::new(MavLinkVersion::V2, 1, 1);
///
/// let payload = Payload::new(0, &[0, 0, 0, 0, 6, 8, 0, 4, 3], MavLinkVersion::V2);
/// let frame = encoder.encode_payload(payload, 50).unwrap();
///
/// assert_eq!(frame.sequence(), 0);
/// assert_eq!(encoder.sequencer().current(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Encoder {
    version: MavLinkVersion,
    system_id: SystemId,
    component_id: ComponentId,
    sequencer: Sequencer,
    signer: Option<FrameSigner>,
}

impl Default for Encoder {
    /// Creates a `MAVLink 2` encoder for system `1` and component `1`.
    fn default() -> Self {
        Self::new(DEFAULT_VERSION, DEFAULT_SYSTEM_ID, DEFAULT_COMPONENT_ID)
    }
}

impl Encoder {
    /// Creates an encoder for a component.
    pub fn new(version: MavLinkVersion, system_id: SystemId, component_id: ComponentId) -> Self {
        Self {
            version,
            system_id,
            component_id,
            sequencer: Sequencer::default(),
            signer: None,
        }
    }

    /// Sets frame signer.
    pub fn with_signer(mut self, signer: FrameSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Sets initial sequence number.
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequencer = Sequencer::new(sequence);
        self
    }

    /// Protocol version of produced frames.
    #[inline]
    pub fn version(&self) -> MavLinkVersion {
        self.version
    }

    /// System `ID` of produced frames.
    #[inline]
    pub fn system_id(&self) -> SystemId {
        self.system_id
    }

    /// Component `ID` of produced frames.
    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    /// Outgoing sequence state.
    #[inline]
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Frame signer.
    #[inline]
    pub fn signer(&self) -> Option<&FrameSigner> {
        self.signer.as_ref()
    }

    /// Encodes a statically typed message.
    pub fn encode<M: MavMessage>(&mut self, message: &M) -> Result<Frame, EncodeError> {
        let payload = message.encode_payload(self.version)?;
        self.encode_payload(payload, M::CRC_EXTRA)
    }

    /// Encodes a dynamic message using layouts from `table`.
    pub fn encode_value(
        &mut self,
        value: &MessageValue,
        table: &DialectTable,
    ) -> Result<Frame, EncodeError> {
        let layout = table
            .layout(value.id())
            .ok_or(EncodeError::UnknownMessage(value.id()))?;
        let crc_extra = layout.crc_extra();
        let payload = table.encode_value(value, self.version)?;
        self.encode_payload(payload, crc_extra)
    }

    /// Wraps an already encoded payload into a frame.
    ///
    /// Payload version must match encoder version.
    pub fn encode_payload(
        &mut self,
        payload: Payload,
        crc_extra: CrcExtra,
    ) -> Result<Frame, EncodeError> {
        if payload.version() != self.version {
            return Err(EncodeError::VersionMismatch);
        }

        let mut builder = Frame::builder()
            .sequence(self.sequencer.current())
            .system_id(self.system_id)
            .component_id(self.component_id);
        if let Some(signer) = &self.signer {
            builder = builder.signer(signer);
        }

        let frame = builder.build(payload, crc_extra)?;
        self.sequencer.advance();

        log::trace!(
            "[{}:{}] encoded message #{} seq={}",
            self.system_id,
            self.component_id,
            frame.message_id(),
            frame.sequence()
        );

        Ok(frame)
    }
}

#[cfg(test)]
mod encoder_tests {
    use super::*;
    use crate::protocol::{DialectTable, MessageValue};
    use crate::test_utils::heartbeat_dialect;

    #[test]
    fn sequence_advances_on_success_only() {
        let mut encoder = Encoder::new(MavLinkVersion::V1, 1, 1).with_sequence(255);

        let frame = encoder
            .encode_payload(Payload::new(0, &[1], MavLinkVersion::V1), 50)
            .unwrap();
        assert_eq!(frame.sequence(), 255);
        assert_eq!(encoder.sequencer().current(), 0);

        assert_eq!(
            encoder.encode_payload(Payload::new(300, &[1], MavLinkVersion::V1), 0),
            Err(EncodeError::MessageIdTooLarge(300))
        );
        assert_eq!(
            encoder.encode_payload(Payload::new(0, &[1], MavLinkVersion::V2), 50),
            Err(EncodeError::VersionMismatch)
        );
        assert_eq!(encoder.sequencer().current(), 0);
    }

    #[test]
    fn signed_encoder() {
        let mut encoder =
            Encoder::new(MavLinkVersion::V2, 1, 1).with_signer(FrameSigner::new(1, "key"));

        let first = encoder
            .encode_payload(Payload::new(0, &[1], MavLinkVersion::V2), 50)
            .unwrap();
        let second = encoder
            .encode_payload(Payload::new(0, &[1], MavLinkVersion::V2), 50)
            .unwrap();

        assert!(first.is_signed());
        assert!(second.timestamp() > first.timestamp());
        assert!(encoder.signer().unwrap().has_valid_signature(&second));
    }

    #[test]
    fn encode_dynamic_heartbeat() {
        let table = DialectTable::new(&heartbeat_dialect());
        let mut encoder = Encoder::default();
        let heartbeat = MessageValue::new(0)
            .with("type", 6u8)
            .with("autopilot", 8u8)
            .with("base_mode", 0u8)
            .with("custom_mode", 0u32)
            .with("system_status", 4u8)
            .with("mavlink_version", 3u8);

        let frame = encoder.encode_value(&heartbeat, &table).unwrap();
        assert_eq!(
            frame.to_bytes(),
            vec![0xFD, 9, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 4, 3, 0x0A, 0x80]
        );
        assert_eq!(encoder.sequencer().current(), 1);
    }
}
