use std::collections::{HashMap, VecDeque};

use crate::consts::{DEFAULT_EVENT_QUEUE_CAPACITY, DEFAULT_TRACK_SEQUENCES};
use crate::errors::DecodeError;
use crate::protocol::consts::{
    CHECKSUM_SIZE, FRAME_MAX_SIZE, HEADER_V1_SIZE, HEADER_V2_SIZE, SIGNATURE_SIZE, STX_V1, STX_V2,
};
use crate::protocol::{
    decode_frame, ComponentId, CrcExtraLookup, Frame, FrameSigner, Header, MavLinkId,
    MavTimestamp, SequenceTracker, SignStrategy, SignedLinkId, SystemId,
};

/// Event produced by [`StreamParser`].
#[derive(Clone, Debug, PartialEq)]
pub enum ParserEvent {
    /// Verified frame of a known message.
    Frame(Frame),
    /// Dropped frame candidate.
    ///
    /// One of [`DecodeError::CrcMismatch`], [`DecodeError::BadSignature`],
    /// [`DecodeError::UnknownMessage`], [`DecodeError::IncompatibleFlags`], or
    /// [`DecodeError::InvalidPayloadLength`].
    Error(DecodeError),
    /// Gap in sequence numbers of a sender.
    PacketLoss {
        /// Sender address.
        peer: MavLinkId,
        /// Number of lost packets.
        lost: u8,
    },
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Counters of a [`StreamParser`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParserStats {
    /// Emitted frames.
    pub frames: u64,
    /// Candidates dropped because of checksum mismatch.
    pub crc_errors: u64,
    /// Candidates dropped because of invalid, missing, or replayed signature.
    pub signature_errors: u64,
    /// Well-formed frames of unknown messages.
    pub unknown_messages: u64,
    /// Candidates dropped because of invalid header.
    pub invalid_headers: u64,
    /// Bytes skipped while searching for a start marker.
    pub skipped_bytes: u64,
    /// Packets reported lost by sequence tracking.
    pub lost_packets: u64,
    /// Oldest events discarded because the event queue was full.
    pub dropped_events: u64,
}

/// Stateful MAVLink byte stream parser.
///
/// Accepts chunks of any size and produces [`ParserEvent`]s. The parser never blocks and never
/// fails: corrupted data is reported as [`ParserEvent::Error`] and parsing resumes one byte after
/// the start marker of the dropped candidate. Bytes already consumed are replayed, so a valid
/// frame hidden inside a corrupted one is still found.
///
/// # Usage
///
/// ```rust
/// use std::collections::HashMap;
/// use mavkit::protocol::{ParserEvent, StreamParser};
///
/// let mut parser = StreamParser::new(HashMap::from([(0, 50)]));
///
/// let bytes = [
///     0xFD, 9, 0, 0, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 6, 8, 0, 4, 3, 0x1A, 0x0E,
/// ];
/// // Feed the frame in two parts
/// assert_eq!(parser.feed(&bytes[..7]).count(), 0);
///
/// let events: Vec<_> = parser.feed(&bytes[7..]).collect();
/// assert!(matches!(&events[..], [ParserEvent::Frame(frame)] if frame.message_id() == 0));
/// ```
#[derive(Clone, Debug)]
pub struct StreamParser<L: CrcExtraLookup> {
    lookup: L,
    signer: Option<FrameSigner>,
    track_sequences: bool,
    event_capacity: usize,
    state: State,
    buf: Vec<u8>,
    replay: VecDeque<u8>,
    events: VecDeque<ParserEvent>,
    sequences: SequenceTracker,
    timestamps: HashMap<(SignedLinkId, SystemId, ComponentId), MavTimestamp>,
    stats: ParserStats,
}

/// Builder for [`StreamParser`].
#[derive(Clone, Debug)]
pub struct StreamParserBuilder<L: CrcExtraLookup> {
    lookup: L,
    signer: Option<FrameSigner>,
    track_sequences: bool,
    event_capacity: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    SeekMarker,
    ReadHeader { until: usize },
    ReadPayload { until: usize },
    ReadTrailer { until: usize },
    ReadSignature { until: usize },
}

impl<L: CrcExtraLookup> StreamParser<L> {
    /// Creates a parser with default settings.
    pub fn new(lookup: L) -> Self {
        Self::builder(lookup).build()
    }

    /// Instantiates [`StreamParserBuilder`] for a message lookup.
    pub fn builder(lookup: L) -> StreamParserBuilder<L> {
        StreamParserBuilder {
            lookup,
            signer: None,
            track_sequences: DEFAULT_TRACK_SEQUENCES,
            event_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }

    /// Message lookup.
    #[inline]
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Frame signer used to verify incoming frames.
    #[inline]
    pub fn signer(&self) -> Option<&FrameSigner> {
        self.signer.as_ref()
    }

    /// Parser counters.
    #[inline]
    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Sequence tracking state.
    #[inline]
    pub fn sequences(&self) -> &SequenceTracker {
        &self.sequences
    }

    /// Number of bytes held by the parser that do not form a complete frame yet.
    pub fn buffered(&self) -> usize {
        self.buf.len() + self.replay.len()
    }

    /// Accepts a chunk of bytes.
    ///
    /// Events are available through [`StreamParser::next_event`]. At most
    /// [`StreamParserBuilder::event_capacity`] events are kept, when the queue is full the oldest
    /// event is discarded and counted in [`ParserStats::dropped_events`].
    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.step(byte);
            while let Some(byte) = self.replay.pop_front() {
                self.step(byte);
            }
        }
    }

    /// Returns the next event or [`None`] if more input is required.
    pub fn next_event(&mut self) -> Option<ParserEvent> {
        self.events.pop_front()
    }

    /// Accepts a chunk of bytes and returns all available events.
    pub fn feed(&mut self, bytes: &[u8]) -> impl Iterator<Item = ParserEvent> + '_ {
        self.push(bytes);
        self.events.drain(..)
    }

    /// Drops partially received data and pending events.
    ///
    /// Sequence and signature timestamp state is kept.
    pub fn reset(&mut self) {
        self.state = State::SeekMarker;
        self.buf.clear();
        self.replay.clear();
        self.events.clear();
    }

    fn step(&mut self, byte: u8) {
        match self.state {
            State::SeekMarker => {
                let header_size = match byte {
                    STX_V1 => HEADER_V1_SIZE,
                    STX_V2 => HEADER_V2_SIZE,
                    _ => {
                        self.stats.skipped_bytes += 1;
                        return;
                    }
                };
                self.buf.clear();
                self.buf.push(byte);
                self.state = State::ReadHeader { until: header_size };
            }
            State::ReadHeader { until }
            | State::ReadPayload { until }
            | State::ReadTrailer { until }
            | State::ReadSignature { until } => {
                self.buf.push(byte);
                if self.buf.len() == until {
                    self.advance();
                }
            }
        }
    }

    fn advance(&mut self) {
        match self.state {
            State::SeekMarker => {}
            State::ReadHeader { until } => match Header::decode(&self.buf) {
                Ok(header) => {
                    let id = header.message_id();
                    let len = header.payload_length() as usize;
                    if let Some(max) = self.lookup.max_payload_len(id) {
                        if len > max && self.lookup.crc_extra(id).is_some() {
                            self.stats.invalid_headers += 1;
                            self.reject(DecodeError::InvalidPayloadLength { id, len, max });
                            return;
                        }
                    }
                    let payload_end = until + header.payload_length() as usize;
                    self.state = if payload_end > until {
                        State::ReadPayload { until: payload_end }
                    } else {
                        State::ReadTrailer {
                            until: payload_end + CHECKSUM_SIZE,
                        }
                    };
                }
                Err(err) => {
                    self.stats.invalid_headers += 1;
                    self.reject(err);
                }
            },
            State::ReadPayload { until } => {
                self.state = State::ReadTrailer {
                    until: until + CHECKSUM_SIZE,
                };
            }
            State::ReadTrailer { until } => {
                let signed = Header::decode(&self.buf)
                    .map(|h| h.is_signed())
                    .unwrap_or_default();
                if signed {
                    self.state = State::ReadSignature {
                        until: until + SIGNATURE_SIZE,
                    };
                } else {
                    self.complete();
                }
            }
            State::ReadSignature { .. } => self.complete(),
        }
    }

    fn complete(&mut self) {
        debug_assert!(self.buf.len() <= FRAME_MAX_SIZE);

        let frame = match decode_frame(self.buf.as_slice(), &self.lookup) {
            Ok(frame) => frame,
            Err(err) => {
                match err {
                    DecodeError::CrcMismatch { .. } => self.stats.crc_errors += 1,
                    DecodeError::UnknownMessage { .. } => self.stats.unknown_messages += 1,
                    _ => self.stats.invalid_headers += 1,
                }
                self.reject(err);
                return;
            }
        };

        if !self.verify_signature(&frame) {
            self.stats.signature_errors += 1;
            self.reject(DecodeError::BadSignature {
                id: frame.message_id(),
            });
            return;
        }

        self.buf.clear();
        self.state = State::SeekMarker;

        if self.track_sequences {
            if let Some(lost) = self.sequences.track(frame.sender(), frame.sequence()) {
                log::debug!(
                    "[{}] lost {lost} packets before seq={}",
                    frame.sender(),
                    frame.sequence()
                );
                self.stats.lost_packets += lost as u64;
                self.emit(ParserEvent::PacketLoss {
                    peer: frame.sender(),
                    lost,
                });
            }
        }

        self.stats.frames += 1;
        self.emit(ParserEvent::Frame(frame));
    }

    fn emit(&mut self, event: ParserEvent) {
        while self.events.len() >= self.event_capacity.max(1) {
            self.events.pop_front();
            self.stats.dropped_events += 1;
        }
        self.events.push_back(event);
    }

    fn verify_signature(&mut self, frame: &Frame) -> bool {
        let signer = match &self.signer {
            Some(signer) => signer,
            None => return true,
        };

        if !signer.check_incoming(frame) {
            return false;
        }

        let signature = match frame.signature() {
            Some(signature) if signer.incoming() != SignStrategy::Proxy => signature,
            _ => return true,
        };

        let key = (signature.link_id, frame.system_id(), frame.component_id());
        match self.timestamps.get(&key) {
            Some(last) if signature.timestamp <= *last => {
                log::trace!(
                    "[{}] replayed signature timestamp on link {}",
                    frame.sender(),
                    signature.link_id
                );
                false
            }
            _ => {
                self.timestamps.insert(key, signature.timestamp);
                true
            }
        }
    }

    /// Drops current candidate and schedules its bytes after the start marker for rescanning.
    fn reject(&mut self, err: DecodeError) {
        log::trace!(
            "dropping {} bytes candidate: {err}",
            self.buf.len()
        );

        for &byte in self.buf.iter().skip(1).rev() {
            self.replay.push_front(byte);
        }
        self.buf.clear();
        self.stats.skipped_bytes += 1;
        self.state = State::SeekMarker;

        self.emit(ParserEvent::Error(err));
    }
}

impl<L: CrcExtraLookup> StreamParserBuilder<L> {
    /// Set frame signer used to verify incoming frames.
    ///
    /// Verification follows [`FrameSigner::incoming`] strategy.
    pub fn signer(self, signer: FrameSigner) -> Self {
        Self {
            signer: Some(signer),
            ..self
        }
    }

    /// Enables or disables sequence tracking (enabled by default).
    pub fn track_sequences(self, track_sequences: bool) -> Self {
        Self {
            track_sequences,
            ..self
        }
    }

    /// Maximum number of undrained events kept by the parser.
    pub fn event_capacity(self, event_capacity: usize) -> Self {
        Self {
            event_capacity,
            ..self
        }
    }

    /// Builds [`StreamParser`].
    pub fn build(self) -> StreamParser<L> {
        StreamParser {
            lookup: self.lookup,
            signer: self.signer,
            track_sequences: self.track_sequences,
            event_capacity: self.event_capacity,
            state: State::SeekMarker,
            buf: Vec::with_capacity(FRAME_MAX_SIZE),
            replay: VecDeque::with_capacity(FRAME_MAX_SIZE),
            events: VecDeque::new(),
            sequences: SequenceTracker::new(),
            timestamps: HashMap::new(),
            stats: ParserStats::default(),
        }
    }
}
