//! # Frame I/O
//!
//! Adapters between [`protocol`](crate::protocol) and caller-supplied byte streams.
//!
//! * [`FrameReader`] and [`FrameWriter`] work with [`std::io::Read`] and [`std::io::Write`].
//! * `AsyncFrameReader` and `AsyncFrameWriter` work with Tokio `AsyncRead` and `AsyncWrite`
//!   (requires `async` feature).
//! * [`TlogReader`] and [`TlogWriter`] handle telemetry log files.
//!
//! Adapters never open sockets or files themselves.
//!
//! ```rust
//! use std::collections::HashMap;
//! use mavkit::io::{FrameReader, FrameWriter};
//! use mavkit::protocol::{Encoder, MavLinkVersion, Payload};
//!
//! let mut writer = FrameWriter::new(Vec::new(), Encoder::new(MavLinkVersion::V2, 1, 1));
//! writer
//!     .send_payload(Payload::new(0, &[0, 0, 0, 0, 6, 8, 0, 4, 3], MavLinkVersion::V2), 50)
//!     .unwrap();
//!
//! let bytes = writer.into_inner();
//! let mut reader = FrameReader::new(bytes.as_slice(), HashMap::from([(0, 50)]));
//!
//! let frame = reader.recv_frame().unwrap();
//! assert_eq!(frame.message_id(), 0);
//! ```

#[cfg(feature = "async")]
mod asnc;
mod sync;
mod tlog;

#[cfg(feature = "async")]
pub use asnc::{AsyncFrameReader, AsyncFrameWriter};
pub use sync::{FrameReader, FrameWriter};
pub use tlog::{TlogReader, TlogRecord, TlogWriter};
