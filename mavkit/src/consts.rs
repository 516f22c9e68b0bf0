//! Common constants.

use crate::protocol::{ComponentId, MavLinkVersion, SystemId};

/// Whether [`StreamParser`](crate::protocol::StreamParser) tracks sequence numbers by default.
pub const DEFAULT_TRACK_SEQUENCES: bool = true;
/// Default number of undrained events kept by [`StreamParser`](crate::protocol::StreamParser).
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;
/// Default protocol version of frame writers.
pub const DEFAULT_VERSION: MavLinkVersion = MavLinkVersion::V2;
/// Default system `ID` of frame writers.
pub const DEFAULT_SYSTEM_ID: SystemId = 1;
/// Default component `ID` of frame writers.
pub const DEFAULT_COMPONENT_ID: ComponentId = 1;
/// Size of a chunk requested from a reader by frame readers.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 512;
/// Header line of waypoint files written by [`WaypointList`](crate::mission::WaypointList).
pub const WAYPOINT_FILE_HEADER: &str = "QGC WPL 110";
/// Header line of legacy waypoint files that are only read.
pub const WAYPOINT_FILE_HEADER_V100: &str = "QGC WPL 100";
/// Minimum number of points in a legacy fence file.
pub const FENCE_MIN_POINTS: usize = 5;
/// Default file extension of generated Rust modules.
pub const RUST_FILE_EXTENSION: &str = "rs";
/// Default file extension of generated Python modules.
pub const PYTHON_FILE_EXTENSION: &str = "py";
