//! # Waypoint files
//!
//! Reads and writes missions in the `QGC WPL 110` text format used by ground control stations.
//! Legacy `QGC WPL 100` missions, plain fence point lists, and `RALLY` point files are read as
//! well. Lists are always written as `QGC WPL 110`.
//!
//! ```rust
//! use mavkit::mission::WaypointList;
//!
//! let text = "QGC WPL 110\n\
//!     0\t1\t0\t16\t0\t0\t0\t0\t47.39\t8.54\t488.0\t1\n\
//!     ## climb\n\
//!     1\t0\t3\t22\t0\t0\t0\t0\t0\t0\t20\t1\n";
//!
//! let mission: WaypointList = text.parse().unwrap();
//! assert_eq!(mission.len(), 2);
//! assert_eq!(mission.item(1).unwrap().command, 22);
//! assert_eq!(mission.item(1).unwrap().comment.as_deref(), Some("climb"));
//! ```

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use crate::consts::{FENCE_MIN_POINTS, WAYPOINT_FILE_HEADER, WAYPOINT_FILE_HEADER_V100};
use crate::errors::MissionError;
use crate::prelude::*;
use crate::protocol::{ComponentId, MessageId, MessageValue, SystemId};

/// `MISSION_ITEM` message `ID`.
pub const MISSION_ITEM_ID: MessageId = 39;
/// `MAV_CMD_NAV_WAYPOINT` command.
pub const MAV_CMD_NAV_WAYPOINT: u16 = 16;
/// `MAV_CMD_NAV_LOITER_UNLIM` command.
pub const MAV_CMD_NAV_LOITER_UNLIM: u16 = 17;
/// `MAV_CMD_NAV_RETURN_TO_LAUNCH` command.
pub const MAV_CMD_NAV_RETURN_TO_LAUNCH: u16 = 20;
/// `MAV_CMD_NAV_LAND` command.
pub const MAV_CMD_NAV_LAND: u16 = 21;
/// `MAV_CMD_NAV_TAKEOFF` command.
pub const MAV_CMD_NAV_TAKEOFF: u16 = 22;
/// `MAV_CMD_NAV_FENCE_RETURN_POINT` command.
pub const MAV_CMD_NAV_FENCE_RETURN_POINT: u16 = 5000;
/// `MAV_CMD_NAV_FENCE_POLYGON_VERTEX_INCLUSION` command.
pub const MAV_CMD_NAV_FENCE_POLYGON_VERTEX_INCLUSION: u16 = 5001;
/// `MAV_CMD_NAV_RALLY_POINT` command.
pub const MAV_CMD_NAV_RALLY_POINT: u16 = 5100;

const MAV_FRAME_GLOBAL: u8 = 0;
const MAV_FRAME_GLOBAL_RELATIVE_ALT: u8 = 3;

const COLUMNS: usize = 12;
const COLUMNS_V100: usize = 13;
const RALLY_COLUMNS: usize = 7;
const RALLY_KEYWORD: &str = "RALLY";

/// <sup>[`serde`](https://serde.rs)</sup>
/// Kind of items a [`WaypointList`] holds (`MAV_MISSION_TYPE`).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MissionType {
    /// Navigation and action items.
    #[default]
    Mission,
    /// Geofence points.
    Fence,
    /// Rally points.
    Rally,
}

impl MissionType {
    /// Value of the `mission_type` message field.
    pub fn as_u8(self) -> u8 {
        match self {
            MissionType::Mission => 0,
            MissionType::Fence => 1,
            MissionType::Rally => 2,
        }
    }
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Single mission item.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MissionItem {
    /// Position in the mission. Maintained by [`WaypointList`].
    pub seq: u16,
    /// `1` for the current item.
    pub current: u8,
    /// Coordinate frame (`MAV_FRAME`).
    pub frame: u8,
    /// Command (`MAV_CMD`).
    pub command: u16,
    /// Command parameter 1.
    pub param1: f64,
    /// Command parameter 2.
    pub param2: f64,
    /// Command parameter 3.
    pub param3: f64,
    /// Command parameter 4.
    pub param4: f64,
    /// Latitude or local X.
    pub x: f64,
    /// Longitude or local Y.
    pub y: f64,
    /// Altitude or local Z.
    pub z: f64,
    /// `1` to continue to the next item automatically.
    pub autocontinue: u8,
    /// Comment written above the item.
    pub comment: Option<String>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Ordered list of mission items.
///
/// Item sequence numbers always match their positions.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WaypointList {
    items: Vec<MissionItem>,
    mission_type: MissionType,
}

impl MissionItem {
    /// Creates a navigation waypoint at the given position.
    pub fn waypoint(frame: u8, x: f64, y: f64, z: f64) -> Self {
        Self {
            frame,
            command: MAV_CMD_NAV_WAYPOINT,
            x,
            y,
            z,
            autocontinue: 1,
            ..Default::default()
        }
    }

    /// Converts item into a dynamic `MISSION_ITEM` message.
    ///
    /// Encode the result with a [`DialectTable`](crate::protocol::DialectTable) built from a dialect
    /// that includes `common.xml`.
    pub fn to_message_value(
        &self,
        target_system: SystemId,
        target_component: ComponentId,
        mission_type: u8,
    ) -> MessageValue {
        MessageValue::new(MISSION_ITEM_ID)
            .with("target_system", target_system)
            .with("target_component", target_component)
            .with("seq", self.seq)
            .with("frame", self.frame)
            .with("command", self.command)
            .with("current", self.current)
            .with("autocontinue", self.autocontinue)
            .with("param1", self.param1)
            .with("param2", self.param2)
            .with("param3", self.param3)
            .with("param4", self.param4)
            .with("x", self.x)
            .with("y", self.y)
            .with("z", self.z)
            .with("mission_type", mission_type)
    }

    fn parse_line(line_no: usize, line: &str) -> core::result::Result<Self, MissionError> {
        let columns = split_columns(line_no, line, COLUMNS)?;

        Ok(Self {
            seq: num(line_no, columns[0])?,
            current: num(line_no, columns[1])?,
            frame: num(line_no, columns[2])?,
            command: num(line_no, columns[3])?,
            param1: num(line_no, columns[4])?,
            param2: num(line_no, columns[5])?,
            param3: num(line_no, columns[6])?,
            param4: num(line_no, columns[7])?,
            x: num(line_no, columns[8])?,
            y: num(line_no, columns[9])?,
            z: num(line_no, columns[10])?,
            autocontinue: num(line_no, columns[11])?,
            comment: None,
        })
    }

    /// Parses a `QGC WPL 100` line: `seq frame action p3 p4 p1 p2 current lon lat alt - autocontinue`.
    fn parse_line_v100(line_no: usize, line: &str) -> core::result::Result<Self, MissionError> {
        let columns = split_columns(line_no, line, COLUMNS_V100)?;

        let action: u16 = num(line_no, columns[2])?;
        let command = match action {
            2 | 24 => MAV_CMD_NAV_TAKEOFF,
            3 => MAV_CMD_NAV_RETURN_TO_LAUNCH,
            4 | 26 => MAV_CMD_NAV_LAND,
            25 => MAV_CMD_NAV_WAYPOINT,
            27 => MAV_CMD_NAV_LOITER_UNLIM,
            _ => {
                return Err(MissionError::UnknownAction {
                    line: line_no,
                    action,
                })
            }
        };

        Ok(Self {
            seq: num(line_no, columns[0])?,
            current: num(line_no, columns[7])?,
            frame: num(line_no, columns[1])?,
            command,
            param1: num(line_no, columns[5])?,
            param2: num(line_no, columns[6])?,
            param3: num(line_no, columns[3])?,
            param4: num(line_no, columns[4])?,
            x: num(line_no, columns[9])?,
            y: num(line_no, columns[8])?,
            z: num(line_no, columns[10])?,
            autocontinue: num(line_no, columns[12])?,
            comment: None,
        })
    }

    fn location(frame: u8, command: u16, x: f64, y: f64, z: f64) -> Self {
        Self {
            frame,
            command,
            x,
            y,
            z,
            ..Default::default()
        }
    }
}

fn split_columns(
    line_no: usize,
    line: &str,
    expected: usize,
) -> core::result::Result<Vec<&str>, MissionError> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() != expected {
        return Err(MissionError::InvalidLine {
            line: line_no,
            columns: columns.len(),
        });
    }
    Ok(columns)
}

fn num<T: FromStr>(line: usize, value: &str) -> core::result::Result<T, MissionError> {
    value.parse().map_err(|_| MissionError::InvalidNumber {
        line,
        value: value.to_string(),
    })
}

/// Numbered lines that carry data, comments and blank lines skipped.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.starts_with('#'))
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

impl WaypointList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty list of fence or rally points.
    pub fn with_mission_type(mission_type: MissionType) -> Self {
        Self {
            items: Vec::new(),
            mission_type,
        }
    }

    /// Kind of items in the list.
    pub fn mission_type(&self) -> MissionType {
        self.mission_type
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the list has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in mission order.
    pub fn items(&self) -> &[MissionItem] {
        self.items.as_slice()
    }

    /// Item at `idx`.
    pub fn item(&self, idx: usize) -> Option<&MissionItem> {
        self.items.get(idx)
    }

    /// Appends an item assigning the next sequence number.
    pub fn add(&mut self, mut item: MissionItem) {
        item.seq = self.items.len() as u16;
        self.items.push(item);
    }

    /// Inserts an item at `idx` shifting the rest. Appends when `idx` is past the end.
    pub fn insert(&mut self, idx: usize, item: MissionItem) {
        if idx >= self.items.len() {
            self.add(item);
            return;
        }
        self.items.insert(idx, item);
        self.reindex();
    }

    /// Replaces an item at `idx`. Setting the item right past the end appends it.
    pub fn set(&mut self, idx: usize, mut item: MissionItem) -> core::result::Result<(), MissionError> {
        let len = self.items.len();
        if idx == len {
            self.add(item);
            return Ok(());
        }
        if idx > len {
            return Err(MissionError::IndexOutOfRange { index: idx, len });
        }
        item.seq = idx as u16;
        self.items[idx] = item;
        Ok(())
    }

    /// Removes and returns an item at `idx`.
    pub fn remove(&mut self, idx: usize) -> Option<MissionItem> {
        if idx >= self.items.len() {
            return None;
        }
        let item = self.items.remove(idx);
        self.reindex();
        Some(item)
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Assigns sequence numbers according to item positions.
    pub fn reindex(&mut self) {
        for (seq, item) in self.items.iter_mut().enumerate() {
            item.seq = seq as u16;
        }
    }

    /// Converts all items into dynamic `MISSION_ITEM` messages tagged with the list mission type.
    pub fn to_message_values(
        &self,
        target_system: SystemId,
        target_component: ComponentId,
    ) -> Vec<MessageValue> {
        self.items
            .iter()
            .map(|item| {
                item.to_message_value(target_system, target_component, self.mission_type.as_u8())
            })
            .collect()
    }

    /// Parses waypoint file contents.
    ///
    /// Accepts `QGC WPL 110` and `QGC WPL 100` files.
    pub fn parse(text: &str) -> core::result::Result<Self, MissionError> {
        let mut lines = text.lines().enumerate();

        let header = lines.next().map(|(_, l)| l.trim()).unwrap_or_default();
        let parse_line = match header {
            WAYPOINT_FILE_HEADER => MissionItem::parse_line,
            WAYPOINT_FILE_HEADER_V100 => MissionItem::parse_line_v100,
            _ => return Err(MissionError::UnsupportedFormat(header.to_string())),
        };

        let mut list = Self::new();
        let mut comment = None;
        for (idx, line) in lines {
            if let Some(text) = line.strip_prefix('#') {
                comment = Some(text.trim().to_string());
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut item = parse_line(idx + 1, line)?;
            // Home position written by some planners
            if list.is_empty() && item.seq == 0 && item.command == 0 {
                item.command = MAV_CMD_NAV_WAYPOINT;
            }
            item.comment = comment.take();
            list.add(item);
        }

        log::debug!("parsed {} waypoints ({header})", list.len());
        Ok(list)
    }

    /// Parses fence points.
    ///
    /// A file of `lat lon` pairs is read as a return point followed by a closed polygon, the
    /// closing point is dropped. Anything else is parsed as a waypoint file.
    pub fn parse_fence(text: &str) -> core::result::Result<Self, MissionError> {
        let legacy = data_lines(text).next().is_some_and(|(_, line)| {
            let mut columns = line.split_whitespace();
            columns.next().is_some_and(|c| c.parse::<f64>().is_ok())
                && columns.next().is_some_and(|c| c.parse::<f64>().is_ok())
        });
        if !legacy {
            let mut list = Self::parse(text)?;
            list.mission_type = MissionType::Fence;
            return Ok(list);
        }

        let mut points = Vec::new();
        for (line_no, line) in data_lines(text) {
            let columns = split_columns(line_no, line, 2)?;
            let lat: f64 = num(line_no, columns[0])?;
            let lon: f64 = num(line_no, columns[1])?;
            points.push((lat, lon));
        }
        if points.len() < FENCE_MIN_POINTS {
            return Err(MissionError::NotEnoughFencePoints {
                count: points.len(),
                min: FENCE_MIN_POINTS,
            });
        }

        let mut list = Self::with_mission_type(MissionType::Fence);
        let (lat, lon) = points[0];
        list.add(MissionItem::location(
            MAV_FRAME_GLOBAL,
            MAV_CMD_NAV_FENCE_RETURN_POINT,
            lat,
            lon,
            0.0,
        ));
        let vertices = &points[1..points.len() - 1];
        for &(lat, lon) in vertices {
            let mut item = MissionItem::location(
                MAV_FRAME_GLOBAL,
                MAV_CMD_NAV_FENCE_POLYGON_VERTEX_INCLUSION,
                lat,
                lon,
                0.0,
            );
            item.param1 = vertices.len() as f64;
            list.add(item);
        }

        log::debug!("parsed {} fence vertices", vertices.len());
        Ok(list)
    }

    /// Parses rally points.
    ///
    /// Files of `RALLY lat lon alt break_alt land_dir flags` lines are converted into
    /// `MAV_CMD_NAV_RALLY_POINT` items. Anything else is parsed as a waypoint file.
    pub fn parse_rally(text: &str) -> core::result::Result<Self, MissionError> {
        let legacy = data_lines(text).next().is_some_and(|(_, line)| {
            line.split_whitespace()
                .next()
                .is_some_and(|c| c == RALLY_KEYWORD)
        });
        if !legacy {
            let mut list = Self::parse(text)?;
            list.mission_type = MissionType::Rally;
            return Ok(list);
        }

        let mut list = Self::with_mission_type(MissionType::Rally);
        for (line_no, line) in data_lines(text) {
            let columns = split_columns(line_no, line, RALLY_COLUMNS)?;
            if !columns[0].eq_ignore_ascii_case(RALLY_KEYWORD) {
                continue;
            }
            list.add(MissionItem::location(
                MAV_FRAME_GLOBAL_RELATIVE_ALT,
                MAV_CMD_NAV_RALLY_POINT,
                num(line_no, columns[1])?,
                num(line_no, columns[2])?,
                num(line_no, columns[3])?,
            ));
        }

        log::debug!("parsed {} rally points", list.len());
        Ok(list)
    }

    /// Loads waypoints from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text)?)
    }

    /// Loads fence points from a file. See [`WaypointList::parse_fence`].
    pub fn load_fence(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse_fence(&text)?)
    }

    /// Loads rally points from a file. See [`WaypointList::parse_rally`].
    pub fn load_rally(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse_rally(&text)?)
    }

    /// Renders waypoints in `QGC WPL 110` format.
    pub fn to_text(&self) -> String {
        let mut text = format!("{WAYPOINT_FILE_HEADER}\n");
        for item in &self.items {
            if let Some(comment) = item.comment.as_deref().filter(|c| !c.is_empty()) {
                let _ = writeln!(text, "# {comment}");
            }
            let _ = writeln!(
                text,
                "{}\t{}\t{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{:.6}\t{}",
                item.seq,
                item.current,
                item.frame,
                item.command,
                item.param1,
                item.param2,
                item.param3,
                item.param4,
                item.x,
                item.y,
                item.z,
                item.autocontinue,
            );
        }
        text
    }

    /// Saves waypoints into a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_text())?;
        Ok(())
    }
}

impl FromStr for WaypointList {
    type Err = MissionError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<'a> IntoIterator for &'a WaypointList {
    type Item = &'a MissionItem;
    type IntoIter = std::slice::Iter<'a, MissionItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod mission_tests {
    use super::*;
    use crate::protocol::Value;

    const MISSION: &str = "QGC WPL 110
0\t1\t0\t0\t0\t0\t0\t0\t-35.363262\t149.165237\t584.090000\t1
# take off
1\t0\t3\t22\t0.000000\t0.000000\t0.000000\t0.000000\t0.000000\t0.000000\t20.000000\t1

2 0 3 16 0 0 0 0 -35.361 149.163 20 1
";

    #[test]
    fn parse_mission() {
        let list = WaypointList::parse(MISSION).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list.item(0).unwrap().command, MAV_CMD_NAV_WAYPOINT);
        assert_eq!(list.item(0).unwrap().current, 1);
        assert_eq!(list.item(1).unwrap().comment.as_deref(), Some("take off"));
        assert_eq!(list.item(1).unwrap().z, 20.0);
        assert!(list.item(2).unwrap().comment.is_none());
        assert_eq!(list.item(2).unwrap().x, -35.361);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            WaypointList::parse("QGC WPL 120\n").unwrap_err(),
            MissionError::UnsupportedFormat("QGC WPL 120".into())
        );
        assert!(matches!(
            WaypointList::parse(""),
            Err(MissionError::UnsupportedFormat(_))
        ));
        assert_eq!(
            WaypointList::parse("QGC WPL 110\n0 1 0 16 0 0 0 0\n").unwrap_err(),
            MissionError::InvalidLine {
                line: 2,
                columns: 8
            }
        );
        assert_eq!(
            WaypointList::parse("QGC WPL 110\n0 1 0 16 0 0 0 0 1 2 x 1\n").unwrap_err(),
            MissionError::InvalidNumber {
                line: 2,
                value: "x".into()
            }
        );
    }

    #[test]
    fn text_roundtrip() {
        let list = WaypointList::parse(MISSION).unwrap();
        let text = list.to_text();

        assert!(text.starts_with("QGC WPL 110\n0\t1\t0\t16\t0.000000\t"));
        assert!(text.contains("\n# take off\n1\t0\t3\t22\t"));
        assert_eq!(WaypointList::parse(&text).unwrap(), list);
    }

    #[test]
    fn editing_keeps_sequence() {
        let mut list = WaypointList::new();
        for z in [10.0, 20.0, 30.0] {
            list.add(MissionItem::waypoint(3, 0.0, 0.0, z));
        }

        list.insert(1, MissionItem::waypoint(3, 1.0, 1.0, 15.0));
        list.insert(10, MissionItem::waypoint(3, 2.0, 2.0, 40.0));
        assert_eq!(list.len(), 5);
        assert!(list.items().iter().enumerate().all(|(i, w)| w.seq as usize == i));
        assert_eq!(list.item(1).unwrap().z, 15.0);
        assert_eq!(list.item(4).unwrap().z, 40.0);

        let removed = list.remove(0).unwrap();
        assert_eq!(removed.z, 10.0);
        assert_eq!(list.item(0).unwrap().seq, 0);
        assert_eq!(list.item(0).unwrap().z, 15.0);
        assert!(list.remove(100).is_none());

        list.set(0, MissionItem::waypoint(3, 0.0, 0.0, 5.0)).unwrap();
        list.set(4, MissionItem::waypoint(3, 0.0, 0.0, 50.0)).unwrap();
        assert_eq!(list.item(4).unwrap().seq, 4);
        assert_eq!(
            list.set(10, MissionItem::default()).unwrap_err(),
            MissionError::IndexOutOfRange { index: 10, len: 5 }
        );

        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn mission_item_message() {
        let list = WaypointList::parse(MISSION).unwrap();
        let value = list.item(1).unwrap().to_message_value(1, 190, 0);

        assert_eq!(value.id(), MISSION_ITEM_ID);
        assert_eq!(value.get("seq"), Some(&Value::UInt(1)));
        assert_eq!(value.get("command"), Some(&Value::UInt(22)));
        assert_eq!(value.get("target_component"), Some(&Value::UInt(190)));
        assert_eq!(value.get("z"), Some(&Value::Float(20.0)));
        assert_eq!(value.fields().count(), 15);
    }

    #[test]
    fn parse_v100_mission() {
        let text = "QGC WPL 100
0 0 25 0 0 0 0 1 149.165237 -35.363262 584.09 0 1
# climb out
1 3 24 0 0 15 0 0 0 0 20 0 1
2 3 27 0 0 0 0 0 149.163 -35.361 30 0 1
";
        let list = WaypointList::parse(text).unwrap();

        assert_eq!(list.len(), 3);
        let home = list.item(0).unwrap();
        assert_eq!(home.command, MAV_CMD_NAV_WAYPOINT);
        assert_eq!(home.current, 1);
        assert_eq!(home.x, -35.363262);
        assert_eq!(home.y, 149.165237);

        let takeoff = list.item(1).unwrap();
        assert_eq!(takeoff.command, MAV_CMD_NAV_TAKEOFF);
        assert_eq!(takeoff.param1, 15.0);
        assert_eq!(takeoff.comment.as_deref(), Some("climb out"));

        assert_eq!(list.item(2).unwrap().command, MAV_CMD_NAV_LOITER_UNLIM);
        assert!(list.to_text().starts_with("QGC WPL 110\n"));

        assert_eq!(
            WaypointList::parse("QGC WPL 100\n0 0 99 0 0 0 0 0 0 0 0 0 1\n").unwrap_err(),
            MissionError::UnknownAction { line: 2, action: 99 }
        );
        assert_eq!(
            WaypointList::parse("QGC WPL 100\n0 1 0 16 0 0 0 0 1 2 3 1\n").unwrap_err(),
            MissionError::InvalidLine {
                line: 2,
                columns: 12
            }
        );
    }

    #[test]
    fn parse_fence_points() {
        let text = "# return point first
-35.363 149.165
-35.360 149.160
-35.360 149.170
-35.366 149.170
-35.366 149.160
-35.360 149.160
";
        let fence = WaypointList::parse_fence(text).unwrap();

        assert_eq!(fence.mission_type(), MissionType::Fence);
        assert_eq!(fence.len(), 5);
        assert_eq!(fence.item(0).unwrap().command, MAV_CMD_NAV_FENCE_RETURN_POINT);
        assert_eq!(fence.item(0).unwrap().x, -35.363);
        assert!(fence.items()[1..].iter().all(|item| {
            item.command == MAV_CMD_NAV_FENCE_POLYGON_VERTEX_INCLUSION && item.param1 == 4.0
        }));
        assert_eq!(fence.item(4).unwrap().seq, 4);
        assert_eq!(fence.item(4).unwrap().y, 149.160);

        assert_eq!(
            WaypointList::parse_fence("1 2\n3 4\n5 6\n").unwrap_err(),
            MissionError::NotEnoughFencePoints { count: 3, min: 5 }
        );
        assert_eq!(
            WaypointList::parse_fence("1 2\n3 4 5\n").unwrap_err(),
            MissionError::InvalidLine {
                line: 2,
                columns: 3
            }
        );

        let qgc = WaypointList::parse_fence(MISSION).unwrap();
        assert_eq!(qgc.mission_type(), MissionType::Fence);
        assert_eq!(qgc.len(), 3);
    }

    #[test]
    fn parse_rally_points() {
        let text = "RALLY -35.361 149.163 60.0 40.0 0.0 0
# second point
RALLY -35.368 149.170 80.0 40.0 90.0 1
";
        let rally = WaypointList::parse_rally(text).unwrap();

        assert_eq!(rally.mission_type(), MissionType::Rally);
        assert_eq!(rally.len(), 2);
        let point = rally.item(1).unwrap();
        assert_eq!(point.command, MAV_CMD_NAV_RALLY_POINT);
        assert_eq!(point.frame, MAV_FRAME_GLOBAL_RELATIVE_ALT);
        assert_eq!((point.x, point.y, point.z), (-35.368, 149.170, 80.0));

        assert!(matches!(
            WaypointList::parse_rally("RALLY 1 2 3\n"),
            Err(MissionError::InvalidLine { line: 1, columns: 4 })
        ));
        assert_eq!(
            WaypointList::parse_rally(MISSION).unwrap().mission_type(),
            MissionType::Rally
        );
    }

    #[test]
    fn message_values_carry_mission_type() {
        let rally = WaypointList::parse_rally("RALLY 1.5 2.5 30 40 0 0\n").unwrap();
        let values = rally.to_message_values(1, 1);

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].get("mission_type"), Some(&Value::UInt(2)));
        assert_eq!(values[0].get("command"), Some(&Value::UInt(5100)));
        assert_eq!(values[0].get("x"), Some(&Value::Float(1.5)));

        let mission = WaypointList::parse(MISSION).unwrap();
        assert!(mission
            .to_message_values(1, 1)
            .iter()
            .all(|value| value.get("mission_type") == Some(&Value::UInt(0))));
    }
}
