//! # MavKit
//!
//! A [MAVLink](https://mavlink.io/en/) toolkit written in Rust. MavKit compiles MAVLink XML message
//! definitions into a validated dialect model and takes care of the wire protocol: payload
//! serialization, v1/v2 framing, checksums, message signing, and resilient parsing of byte
//! streams.
//!
//! * [`schema`] loads dialects with their includes and computes `CRC_EXTRA` values.
//! * [`codegen`] renders dialects into Rust or Python source code.
//! * [`protocol`] encodes and decodes frames, either for generated messages or dynamically via
//!   [`DialectTable`](protocol::DialectTable).
//! * [`io`] adapts protocol to [`std::io`] and (with `async` feature) Tokio streams, and handles
//!   telemetry logs.
//! * [`mission`] reads and writes waypoint files.
//!
//! # Usage
//!
//! ```rust
//! use mavkit::prelude::*;
//!
//! let resolver = MemoryResolver::new().with(
//!     "minimal.xml",
//!     r#"<mavlink>
//!         <messages>
//!           <message id="0" name="HEARTBEAT">
//!             <field type="uint8_t" name="type">Vehicle type</field>
//!             <field type="uint8_t" name="autopilot">Autopilot type</field>
//!             <field type="uint8_t" name="base_mode">System mode bitmap</field>
//!             <field type="uint32_t" name="custom_mode">Autopilot-specific flags</field>
//!             <field type="uint8_t" name="system_status">System status flag</field>
//!             <field type="uint8_t_mavlink_version" name="mavlink_version">MAVLink version</field>
//!           </message>
//!         </messages>
//!       </mavlink>"#,
//! );
//! let dialect = DialectLoader::new(resolver).load("minimal").unwrap();
//! assert_eq!(dialect.message_by_name("HEARTBEAT").unwrap().crc_extra(), 50);
//!
//! let table = DialectTable::new(&dialect);
//! let mut encoder = Encoder::new(MavLinkVersion::V2, 1, 1);
//! let heartbeat = MessageValue::new(0)
//!     .with("type", 6u8)
//!     .with("autopilot", 8u8)
//!     .with("base_mode", 0u8)
//!     .with("custom_mode", 0u32)
//!     .with("system_status", 4u8)
//!     .with("mavlink_version", 3u8);
//!
//! let frame = encoder.encode_value(&heartbeat, &table).unwrap();
//! assert_eq!(table.decode_frame(&frame).unwrap(), heartbeat);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! # Feature flags
#![doc = document_features::document_features!()]

pub mod codegen;
pub mod consts;
pub mod errors;
pub mod io;
pub mod mission;
pub mod prelude;
pub mod protocol;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_utils;
