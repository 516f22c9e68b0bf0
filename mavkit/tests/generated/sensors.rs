//! MAVLink dialect `sensors`.
//!
//! Generated by mavkit. Do not edit.
//!
//! Definitions version: 2.

use mavkit::errors::{DecodeError, EncodeError};
use mavkit::protocol::{
    CrcExtra, CrcExtraLookup, MavLinkVersion, MavMessage, MessageId, Payload,
    PayloadReader, PayloadWriter,
};

/// Dialect name.
pub const DIALECT_NAME: &str = "sensors";

/// Enum `SENSOR_CAPABILITY`.
///
/// Bitmask flags.
pub mod sensor_capability {
    pub const SENSOR_CAPABILITY_TEMPERATURE: u64 = 1;
    pub const SENSOR_CAPABILITY_PRESSURE: u64 = 2;
}

/// Enum `SENSOR_STATUS`.
///
/// Health of a sensor.
pub mod sensor_status {
    /// Sensor is healthy.
    pub const SENSOR_STATUS_OK: u64 = 0;
    pub const SENSOR_STATUS_DEGRADED: u64 = 1;
    pub const SENSOR_STATUS_FAILED: u64 = 2;
}

/// Reading of a single sensor.
///
/// MAVLink message `SENSOR_REPORT` (`ID` 200).
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReport {
    /// Sensor index.
    pub sensor_id: u8,
    /// Health.
    ///
    /// Values: [`sensor_status`].
    pub status: u8,
    /// Temperature.
    ///
    /// Units: `degC`.
    pub temperature: f32,
    /// Calibration offsets.
    pub offsets: [i16; 3],
    /// Sensor label.
    pub label: String,
    /// Capabilities.
    ///
    /// Values: [`sensor_capability`].
    ///
    /// Extension field, `MAVLink 2` only.
    pub capabilities: u32,
    /// Pressure.
    ///
    /// Units: `Pa`.
    ///
    /// Extension field, `MAVLink 2` only.
    pub pressure: f64,
}

impl Default for SensorReport {
    fn default() -> Self {
        Self {
            sensor_id: 0,
            status: 0,
            temperature: 0.0,
            offsets: [0; 3],
            label: String::new(),
            capabilities: 0,
            pressure: 0.0,
        }
    }
}

impl MavMessage for SensorReport {
    const ID: MessageId = 200;
    const NAME: &'static str = "SENSOR_REPORT";
    const CRC_EXTRA: CrcExtra = 14;
    const BASE_LEN: usize = 20;
    const MAX_LEN: usize = 32;

    fn encode_payload(&self, version: MavLinkVersion) -> Result<Payload, EncodeError> {
        let mut writer = PayloadWriter::for_message::<Self>();
        writer.put_f32(self.temperature);
        for value in &self.offsets {
            writer.put_i16(*value);
        }
        writer.put_u8(self.sensor_id);
        writer.put_u8(self.status);
        writer.put_str(Self::NAME, "label", &self.label, 8)?;
        writer.put_u32(self.capabilities);
        writer.put_f64(self.pressure);
        writer.finish(version)
    }

    fn decode_payload(payload: &Payload) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader::for_message::<Self>(payload)?;
        Ok(Self {
            temperature: reader.get_f32(),
            offsets: std::array::from_fn(|_| reader.get_i16()),
            sensor_id: reader.get_u8(),
            status: reader.get_u8(),
            label: reader.get_str(8),
            capabilities: reader.get_u32(),
            pressure: reader.get_f64(),
        })
    }
}

/// MAVLink message `SENSOR_RESET` (`ID` 201).
///
/// Deprecated.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorReset {
    /// Sensor type.
    pub type_: u8,
    /// Units: `ms`.
    pub delay: u16,
}

impl Default for SensorReset {
    fn default() -> Self {
        Self {
            type_: 0,
            delay: 0,
        }
    }
}

impl MavMessage for SensorReset {
    const ID: MessageId = 201;
    const NAME: &'static str = "SENSOR_RESET";
    const CRC_EXTRA: CrcExtra = 55;
    const BASE_LEN: usize = 3;
    const MAX_LEN: usize = 3;

    fn encode_payload(&self, version: MavLinkVersion) -> Result<Payload, EncodeError> {
        let mut writer = PayloadWriter::for_message::<Self>();
        writer.put_u16(self.delay);
        writer.put_u8(self.type_);
        writer.finish(version)
    }

    fn decode_payload(payload: &Payload) -> Result<Self, DecodeError> {
        let mut reader = PayloadReader::for_message::<Self>(payload)?;
        Ok(Self {
            delay: reader.get_u16(),
            type_: reader.get_u8(),
        })
    }
}

/// CRC-extra of a message or `None` if message is not in the dialect.
pub fn crc_extra(id: MessageId) -> Option<CrcExtra> {
    match id {
        200 => Some(14),
        201 => Some(55),
        _ => None,
    }
}

/// Untruncated payload length of a message.
pub fn max_len(id: MessageId) -> Option<usize> {
    match id {
        200 => Some(32),
        201 => Some(3),
        _ => None,
    }
}

/// Message name by `ID`.
pub fn message_name(id: MessageId) -> Option<&'static str> {
    match id {
        200 => Some("SENSOR_REPORT"),
        201 => Some("SENSOR_RESET"),
        _ => None,
    }
}

/// Message lookup for frame decoding.
#[derive(Copy, Clone, Debug, Default)]
pub struct Lookup;

impl CrcExtraLookup for Lookup {
    fn crc_extra(&self, id: MessageId) -> Option<CrcExtra> {
        crc_extra(id)
    }

    fn max_payload_len(&self, id: MessageId) -> Option<usize> {
        max_len(id)
    }
}
