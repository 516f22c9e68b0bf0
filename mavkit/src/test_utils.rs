//! Test utils.
//!
//! These utils are generated only when `#[cfg(test)]` enabled.

use std::sync::Once;

use crate::schema::{Dialect, DialectLoader, MemoryResolver};

static INIT_LOGGER: Once = Once::new();
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Debug;

pub const HEARTBEAT_XML: &str = r#"<?xml version="1.0"?>
<mavlink>
  <version>3</version>
  <dialect>0</dialect>
  <messages>
    <message id="0" name="HEARTBEAT">
      <description>The heartbeat message.</description>
      <field type="uint8_t" name="type">Vehicle or component type.</field>
      <field type="uint8_t" name="autopilot">Autopilot type.</field>
      <field type="uint8_t" name="base_mode">System mode bitmap.</field>
      <field type="uint32_t" name="custom_mode">Autopilot-specific flags.</field>
      <field type="uint8_t" name="system_status">System status flag.</field>
      <field type="uint8_t_mavlink_version" name="mavlink_version">MAVLink version.</field>
    </message>
  </messages>
</mavlink>
"#;

pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::builder()
            // Suppress everything below `warn` for third-party modules
            .filter_level(log::LevelFilter::Warn)
            // Allow everything above `LOG_LEVEL` from current package
            .filter_module(env!("CARGO_PKG_NAME"), LOG_LEVEL)
            .is_test(true)
            .init();
    });
}

/// Loads a single-file dialect from `source`.
pub fn load_dialect(source: &str) -> Dialect {
    DialectLoader::new(MemoryResolver::new().with("test.xml", source))
        .load("test")
        .unwrap()
}

pub fn heartbeat_dialect() -> Dialect {
    load_dialect(HEARTBEAT_XML)
}
