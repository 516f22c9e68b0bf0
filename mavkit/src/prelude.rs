//! # Basic imports

pub use crate::errors::{Error, Result};

pub use crate::codegen::{Generator, Target};
pub use crate::protocol::{
    DialectTable, Encoder, Frame, MavLinkVersion, MavMessage, MessageValue, ParserEvent,
    StreamParser, Value,
};
pub use crate::schema::{Dialect, DialectLoader, FsResolver, MemoryResolver};
