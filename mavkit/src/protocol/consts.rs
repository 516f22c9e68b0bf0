//! # MAVLink protocol constants
//!
//! Sizes, markers, and flags of the `MAVLink 1` and `MAVLink 2` wire formats.

use crate::protocol::MessageId;

/// `MAVLink 1` packet start marker.
pub const STX_V1: u8 = 0xFE;
/// `MAVLink 2` packet start marker.
pub const STX_V2: u8 = 0xFD;

/// `MAVLink 1` header size in bytes (including the start marker).
pub const HEADER_V1_SIZE: usize = 6;
/// `MAVLink 2` header size in bytes (including the start marker).
pub const HEADER_V2_SIZE: usize = 10;
/// Largest header size.
pub const HEADER_MAX_SIZE: usize = HEADER_V2_SIZE;

/// Checksum size in bytes.
pub const CHECKSUM_SIZE: usize = 2;
/// `MAVLink 2` signature size in bytes.
pub const SIGNATURE_SIZE: usize = 13;
/// Signature value size in bytes (truncated SHA-256).
pub const SIGNATURE_VALUE_SIZE: usize = 6;
/// Signature timestamp size in bytes.
pub const SIGNATURE_TIMESTAMP_SIZE: usize = 6;
/// Secret key size in bytes.
pub const SIGNATURE_SECRET_KEY_SIZE: usize = 32;

/// Maximum payload size in bytes.
pub const PAYLOAD_MAX_SIZE: usize = 255;
/// Maximum frame size in bytes: `MAVLink 2` header, payload, checksum, and signature.
pub const FRAME_MAX_SIZE: usize =
    HEADER_V2_SIZE + PAYLOAD_MAX_SIZE + CHECKSUM_SIZE + SIGNATURE_SIZE;

/// `MAVLink 2` incompatibility flag: frame is signed.
pub const MAVLINK_IFLAG_SIGNED: u8 = 0x01;
/// All incompatibility flags supported by this implementation.
pub const MAVLINK_SUPPORTED_IFLAGS: u8 = MAVLINK_IFLAG_SIGNED;

/// Largest message `ID` that fits `MAVLink 1` header.
pub const MESSAGE_ID_V1_MAX: MessageId = 0xFF;
/// Largest message `ID` that fits `MAVLink 2` header.
pub const MESSAGE_ID_V2_MAX: MessageId = 0xFF_FFFF;

/// Offset of MAVLink signature timestamps: 2015-01-01T00:00:00Z as seconds since UNIX epoch.
pub const SIGNATURE_EPOCH_UNIX_SECS: u64 = 1_420_070_400;
