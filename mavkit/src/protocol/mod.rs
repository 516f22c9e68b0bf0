//! # MAVLink protocol
//!
//! Runtime half of `mavkit`: wire formats of `MAVLink 1` and `MAVLink 2`, payload codecs, frame
//! signing, sequencing, and the [`StreamParser`] that turns an unreliable byte stream into
//! [`Frame`]s.
//!
//! Everything here works with fixed lookup tables. Use [`DialectTable`] built from a loaded
//! [`Dialect`](crate::schema::Dialect) or a lookup produced by the Rust code generator.
//!
//! ```rust
//! use std::collections::HashMap;
//! use mavkit::protocol::{decode_frame, encode_frame, MavLinkVersion, Payload};
//!
//! let payload = Payload::new(0, &[0, 0, 0, 0, 6, 8, 0, 4, 3], MavLinkVersion::V2);
//! let bytes = encode_frame(payload, 50, 1, 1, 1, None).unwrap();
//!
//! let frame = decode_frame(&bytes, &HashMap::from([(0, 50)])).unwrap();
//! assert_eq!(frame.payload().bytes(), &[0, 0, 0, 0, 6, 8, 0, 4, 3]);
//! ```

pub mod consts;
pub(crate) mod crc;
mod encoder;
mod frame;
mod parser;
mod payload;
mod peer;
mod signature;
mod table;
mod value;
mod version;

pub use crc::checksum;
pub use encoder::Encoder;
pub use frame::{decode_frame, encode_frame, Frame, FrameBuilder, Header};
pub use parser::{ParserEvent, ParserStats, StreamParser, StreamParserBuilder};
pub use payload::{CrcExtraLookup, MavMessage, Payload, PayloadReader, PayloadWriter};
pub use peer::{MavLinkId, Peer, SequenceTracker, Sequencer};
pub use signature::builder as signer_builder;
pub use signature::{FrameSigner, MavTimestamp, SecretKey, SignStrategy, Signature};
pub use table::{DialectTable, FieldLayout, MessageLayout};
pub use value::{MessageValue, Value};
pub use version::MavLinkVersion;

/// Message `ID` (24 bits for `MAVLink 2`, 8 bits for `MAVLink 1`).
pub type MessageId = u32;
/// One-byte schema fingerprint mixed into the checksum.
pub type CrcExtra = u8;
/// Frame checksum.
pub type Checksum = u16;
/// MAVLink system `ID`.
pub type SystemId = u8;
/// MAVLink component `ID`.
pub type ComponentId = u8;
/// Packet sequence number.
pub type Sequence = u8;
/// Link `ID` of a signed frame.
pub type SignedLinkId = u8;
