use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use crate::protocol::{ComponentId, Sequence, SystemId};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink device address: system and component `IDs`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MavLinkId {
    /// MAVLink system `ID`.
    pub system: SystemId,
    /// MAVLink component `ID`.
    pub component: ComponentId,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink device seen by a [`SequenceTracker`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Peer {
    id: MavLinkId,
    last_sequence: Sequence,
    received: u64,
    lost: u64,
}

/// Tracks packet sequence numbers per sender and detects gaps.
///
/// A jump of `d = seq - last (mod 256)` greater than one means that `d - 1` packets were lost.
/// A repeated sequence number is not a loss.
#[derive(Clone, Debug, Default)]
pub struct SequenceTracker {
    peers: HashMap<MavLinkId, Peer>,
}

/// Generates packet sequence numbers for outgoing frames.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequencer(Sequence);

impl MavLinkId {
    /// Creates an address from system and component `IDs`.
    #[inline]
    pub fn new(system: SystemId, component: ComponentId) -> Self {
        Self { system, component }
    }
}

impl Display for MavLinkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.system, self.component)
    }
}

impl Peer {
    /// Peer address.
    #[inline]
    pub fn id(&self) -> MavLinkId {
        self.id
    }

    /// MAVLink system `ID`.
    #[inline]
    pub fn system_id(&self) -> SystemId {
        self.id.system
    }

    /// MAVLink component `ID`.
    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.id.component
    }

    /// Last seen sequence number.
    #[inline]
    pub fn last_sequence(&self) -> Sequence {
        self.last_sequence
    }

    /// Number of received frames.
    #[inline]
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Number of frames detected as lost.
    #[inline]
    pub fn lost(&self) -> u64 {
        self.lost
    }
}

impl SequenceTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sequence number and returns the number of lost packets since the previous one.
    ///
    /// The first frame of a sender never reports loss.
    pub fn track(&mut self, id: MavLinkId, sequence: Sequence) -> Option<u8> {
        let peer = match self.peers.entry(id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(Peer {
                    id,
                    last_sequence: sequence,
                    received: 1,
                    lost: 0,
                });
                return None;
            }
        };

        let delta = sequence.wrapping_sub(peer.last_sequence);
        peer.last_sequence = sequence;
        peer.received += 1;

        if delta > 1 {
            let lost = delta - 1;
            peer.lost += lost as u64;
            Some(lost)
        } else {
            None
        }
    }

    /// Peer state by address.
    pub fn peer(&self, id: MavLinkId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    /// All known peers.
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Forgets all peers.
    pub fn clear(&mut self) {
        self.peers.clear()
    }
}

impl Sequencer {
    /// Creates a sequencer that starts from `sequence`.
    pub fn new(sequence: Sequence) -> Self {
        Self(sequence)
    }

    /// Sequence number that will be returned by the next call to [`Sequencer::advance`].
    #[inline]
    pub fn current(&self) -> Sequence {
        self.0
    }

    /// Returns current sequence number and advances to the next one (wrapping after 255).
    pub fn advance(&mut self) -> Sequence {
        let sequence = self.0;
        self.0 = self.0.wrapping_add(1);
        sequence
    }
}
