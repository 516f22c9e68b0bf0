//! # MAVLink definitions
//!
//! This module loads MAVLink XML definitions into an immutable [`Dialect`]. Definitions are fetched
//! by a [`Resolve`] implementation, parsed, merged with their includes, and validated by
//! [`DialectLoader`].
//!
//! ```rust,no_run
//! use mavkit::schema::{DialectLoader, FsResolver};
//!
//! let loader = DialectLoader::new(FsResolver::new(["./message_definitions/v1.0"]));
//! let dialect = loader.load("common.xml").unwrap();
//!
//! for message in dialect.messages() {
//!     println!("{} #{}: crc_extra={}", message.name(), message.id(), message.crc_extra());
//! }
//! ```

mod crc_extra;
mod loader;
mod model;
mod types;
mod xml;

pub use crc_extra::crc_extra;
pub use loader::{DialectLoader, FsResolver, MemoryResolver, Resolve};
pub use model::{Dialect, Enum, EnumEntry, Field, Message};
pub use types::{FieldType, PrimitiveType};
