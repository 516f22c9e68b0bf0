//! # Mavkit errors
//!
//! Errors are split by the stage at which they occur. [`SchemaError`] is fatal and aborts dialect
//! loading or code generation. [`EncodeError`] is returned per call. [`DecodeError`] is reported
//! per frame and never stops the [`StreamParser`](crate::protocol::StreamParser).
//!
//! All of them can be converted into the crate-level [`Error`].

use std::sync::Arc;

use crate::protocol::{Checksum, MessageId};

/// Common result type returned by `mavkit` functions.
pub type Result<T> = core::result::Result<T, Error>;

/// All errors generated by `mavkit`.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// Dialect definitions are malformed or inconsistent.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Message can't be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    /// Frame or payload can't be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Code generation failed.
    #[error("code generation error: {0}")]
    Codegen(#[from] CodegenError),
    /// Waypoint file error.
    #[error("mission error: {0}")]
    Mission(#[from] MissionError),
    /// I/O error.
    ///
    /// Wrapped into [`Arc`] to keep [`Error`] cloneable.
    #[error("I/O error: {0}")]
    Io(#[from] Arc<std::io::Error>),
}

/// Errors related to loading and validation of dialect definitions.
///
/// Schema errors are never recovered from: a dialect is either loaded completely or rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// Definition file can't be fetched by a resolver.
    #[error("can't fetch definition `{name}`: {reason}")]
    Fetch {
        /// Definition name as requested.
        name: String,
        /// Failure description.
        reason: String,
    },
    /// Definition is not a well-formed XML document.
    #[error("malformed XML in `{file}` at position {position}: {reason}")]
    Xml {
        /// Definition file.
        file: String,
        /// Byte position reported by the reader.
        position: usize,
        /// Failure description.
        reason: String,
    },
    /// Required attribute is missing.
    #[error("`{element}` in `{file}` is missing attribute `{attribute}`")]
    MissingAttribute {
        /// Definition file.
        file: String,
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
    },
    /// Attribute or element value can't be interpreted.
    #[error("invalid value `{value}` for `{context}` in `{file}`")]
    InvalidValue {
        /// Definition file.
        file: String,
        /// Where the value was found.
        context: String,
        /// Raw value.
        value: String,
    },
    /// Field type is not one of the supported MAVLink types.
    #[error("unknown type `{type_name}` of field `{message}.{field}`")]
    UnknownType {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Type token as written in the definition.
        type_name: String,
    },
    /// Array field declared with zero length.
    #[error("field `{message}.{field}` is a zero-length array")]
    ZeroLengthArray {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Field name is used twice within a message.
    #[error("field `{field}` is declared twice in `{message}`")]
    DuplicateField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Regular field is declared after extension fields.
    #[error("field `{message}.{field}` follows extension fields but is not an extension")]
    MisplacedExtension {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Message has no fields.
    #[error("message `{0}` has no fields")]
    EmptyMessage(String),
    /// Message payload exceeds MAVLink limits.
    #[error("payload of `{name}` is {size} bytes, at most 255 is allowed")]
    PayloadTooLarge {
        /// Message name.
        name: String,
        /// Payload size in bytes.
        size: usize,
    },
    /// Message ID can't be represented in MAVLink 2 header.
    #[error("message `{name}` has ID {id} that exceeds 24 bits")]
    MessageIdOutOfRange {
        /// Message name.
        name: String,
        /// Message ID.
        id: u64,
    },
    /// Includes form a cycle.
    #[error("include cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),
    /// The same message ID is bound to different names.
    #[error("message ID {id} is bound to both `{name}` and `{other}`")]
    DuplicateMessageId {
        /// Message ID.
        id: MessageId,
        /// Name seen first.
        name: String,
        /// Conflicting name.
        other: String,
    },
    /// The same message name is bound to different IDs.
    #[error("message `{name}` is bound to both ID {id} and ID {other}")]
    DuplicateMessageName {
        /// Message name.
        name: String,
        /// ID seen first.
        id: MessageId,
        /// Conflicting ID.
        other: MessageId,
    },
    /// The same message is defined with different layouts.
    #[error("message `{name}` (ID {id}) is defined twice with different fields")]
    ConflictingMessage {
        /// Message name.
        name: String,
        /// Message ID.
        id: MessageId,
    },
    /// Enum entry is bound inconsistently across definitions.
    #[error("enum `{name}` entry `{entry}` conflicts with an existing entry")]
    ConflictingEnumEntry {
        /// Enum name.
        name: String,
        /// Entry name.
        entry: String,
    },
    /// Field refers to an enum which is not defined.
    #[error("field `{message}.{field}` refers to unknown enum `{name}`")]
    UnknownEnum {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Enum name.
        name: String,
    },
}

/// Errors related to message encoding.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EncodeError {
    /// Message is not part of the dialect used for encoding.
    #[error("message {0} is not in dialect")]
    UnknownMessage(MessageId),
    /// Required field is absent.
    #[error("field `{message}.{field}` is missing")]
    MissingField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Field is not defined for the message.
    #[error("message `{message}` has no field `{field}`")]
    UnknownField {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
    },
    /// Value kind does not match the declared field type.
    #[error("field `{message}.{field}` expects {expected}")]
    TypeMismatch {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Expected type.
        expected: String,
    },
    /// Value does not fit the declared width.
    #[error("value {value} does not fit field `{message}.{field}` of type {expected}")]
    OutOfRange {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Declared type.
        expected: String,
        /// Offending value.
        value: String,
    },
    /// Array or string does not match the declared length.
    #[error("field `{message}.{field}` expects {expected} elements, got {actual}")]
    ArrayLength {
        /// Message name.
        message: String,
        /// Field name.
        field: String,
        /// Declared length (maximum length for strings).
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Message ID does not fit the header of the frame version.
    #[error("message ID {0} does not fit the frame header")]
    MessageIdTooLarge(MessageId),
    /// Payload is longer than a frame can carry.
    #[error("payload of {len} bytes exceeds {max} bytes")]
    PayloadTooLarge {
        /// Payload length.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },
    /// Payload was built for another protocol version.
    #[error("payload version does not match frame version")]
    VersionMismatch,
}

/// Errors related to frame and payload decoding.
///
/// Within a [`StreamParser`](crate::protocol::StreamParser) every variant except
/// [`DecodeError::Truncated`] results in a dropped frame and resynchronization.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Message ID is not known to the dialect.
    ///
    /// Frame is well-formed but its checksum can't be verified. Raw frame bytes are returned to
    /// the caller undecoded.
    #[error("unknown message {id}")]
    UnknownMessage {
        /// Message ID.
        id: MessageId,
        /// Raw frame bytes starting with the magic byte.
        raw: Vec<u8>,
    },
    /// Checksum calculated with the local CRC-extra differs from the received one.
    ///
    /// Either the stream is corrupted or sender and receiver use different definitions.
    #[error("checksum mismatch for message {id}: expected {expected:#06x}, got {actual:#06x}")]
    CrcMismatch {
        /// Message ID.
        id: MessageId,
        /// Checksum calculated locally.
        expected: Checksum,
        /// Checksum received.
        actual: Checksum,
    },
    /// Frame signature is missing, invalid, or replayed.
    #[error("bad signature for message {id}")]
    BadSignature {
        /// Message ID.
        id: MessageId,
    },
    /// Not enough bytes for a complete frame.
    ///
    /// This is a suspend state rather than an error for stream parsing.
    #[error("truncated frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Required number of bytes (may grow once header is known).
        expected: usize,
        /// Available number of bytes.
        actual: usize,
    },
    /// Frame does not start with a MAVLink magic byte.
    #[error("invalid magic byte {0:#04x}")]
    InvalidMarker(u8),
    /// `MAVLink 2` frame has unsupported incompatibility flags.
    #[error("unsupported incompatibility flags {0:#04x}")]
    IncompatibleFlags(u8),
    /// Payload is longer than message allows.
    #[error("payload of message {id} is {len} bytes, at most {max} is allowed")]
    InvalidPayloadLength {
        /// Message ID.
        id: MessageId,
        /// Received length.
        len: usize,
        /// Maximum length.
        max: usize,
    },
}

/// Errors related to code generation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CodegenError {
    /// Two entities map to the same identifier in the target language.
    #[error("[{backend}] `{first}` and `{second}` both render as `{ident}`")]
    NameClash {
        /// Backend name.
        backend: String,
        /// Rendered identifier.
        ident: String,
        /// First entity.
        first: String,
        /// Second entity.
        second: String,
    },
    /// Target is not supported.
    #[error("unknown code generation target `{0}`")]
    UnknownTarget(String),
}

/// Errors related to waypoint files.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MissionError {
    /// File header is not supported.
    #[error("unsupported waypoint format `{0}`")]
    UnsupportedFormat(String),
    /// Line has a wrong number of columns.
    #[error("invalid waypoint line {line} with {columns} values")]
    InvalidLine {
        /// Line number (starting from 1).
        line: usize,
        /// Number of columns found.
        columns: usize,
    },
    /// Column can't be parsed as a number.
    #[error("invalid number `{value}` at line {line}")]
    InvalidNumber {
        /// Line number (starting from 1).
        line: usize,
        /// Raw value.
        value: String,
    },
    /// `QGC WPL 100` action has no `MAV_CMD` counterpart.
    #[error("unknown waypoint action {action} at line {line}")]
    UnknownAction {
        /// Line number (starting from 1).
        line: usize,
        /// Raw action code.
        action: u16,
    },
    /// Legacy fence file describes no closed polygon.
    #[error("fence needs at least {min} points, got {count}")]
    NotEnoughFencePoints {
        /// Number of points in the file.
        count: usize,
        /// Return point, three vertices, and the closing point.
        min: usize,
    },
    /// Item index is past the end of the list.
    #[error("waypoint index {index} is out of range for list of {len} items")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// List length.
        len: usize,
    },
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`] into [`Error::Io`].
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}
