//! Benchmarks for MavKit.

#[doc(hidden)]
pub mod trallocator;

#[cfg(feature = "async")]
pub mod asnc;
#[cfg(feature = "sync")]
pub mod sync;

use mavkit::protocol::{DialectTable, MessageValue};
use mavkit::schema::{DialectLoader, MemoryResolver};

pub(crate) const MINIMAL_XML: &str = include_str!("../../mavkit/tests/definitions/minimal.xml");
pub(crate) const COMMON_XML: &str = include_str!("../../mavkit/tests/definitions/common.xml");

/// Dialect table for the bundled subset of `common.xml`.
pub fn common_table() -> DialectTable {
    let resolver = MemoryResolver::new()
        .with("minimal.xml", MINIMAL_XML)
        .with("common.xml", COMMON_XML);
    let dialect = DialectLoader::new(resolver).load("common").unwrap();
    DialectTable::new(&dialect)
}

/// Sample messages of different sizes.
pub fn sample_messages() -> Vec<MessageValue> {
    vec![
        MessageValue::new(0)
            .with("type", 2u8)
            .with("autopilot", 12u8)
            .with("base_mode", 129u8)
            .with("custom_mode", 0u32)
            .with("system_status", 4u8)
            .with("mavlink_version", 3u8),
        MessageValue::new(30)
            .with("time_boot_ms", 1_000u32)
            .with("roll", 0.1f32)
            .with("pitch", -0.05f32)
            .with("yaw", 1.57f32)
            .with("rollspeed", 0.0f32)
            .with("pitchspeed", 0.0f32)
            .with("yawspeed", 0.01f32),
        MessageValue::new(22)
            .with("param_id", "SYSID_THISMAV")
            .with("param_value", 1.0f32)
            .with("param_type", 9u8)
            .with("param_count", 900u16)
            .with("param_index", 17u16),
    ]
}
