use std::fmt::{Display, Formatter};

use crate::protocol::consts::{HEADER_V1_SIZE, HEADER_V2_SIZE, STX_V1, STX_V2};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink protocol version.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MavLinkVersion {
    /// `MAVLink 1`: 8-bit message IDs, no extension fields, no signing.
    V1,
    /// `MAVLink 2`: 24-bit message IDs, payload truncation, extension fields, and signing.
    #[default]
    V2,
}

impl MavLinkVersion {
    /// Packet start marker.
    #[inline]
    pub fn marker(&self) -> u8 {
        match self {
            MavLinkVersion::V1 => STX_V1,
            MavLinkVersion::V2 => STX_V2,
        }
    }

    /// Header size including the start marker.
    #[inline]
    pub fn header_size(&self) -> usize {
        match self {
            MavLinkVersion::V1 => HEADER_V1_SIZE,
            MavLinkVersion::V2 => HEADER_V2_SIZE,
        }
    }

    /// Detects protocol version by packet start marker.
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            STX_V1 => Some(MavLinkVersion::V1),
            STX_V2 => Some(MavLinkVersion::V2),
            _ => None,
        }
    }
}

impl Display for MavLinkVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MavLinkVersion::V1 => f.write_str("MAVLink 1"),
            MavLinkVersion::V2 => f.write_str("MAVLink 2"),
        }
    }
}
