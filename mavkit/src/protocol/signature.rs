//! MAVLink [message signing](https://mavlink.io/en/guide/message_signing.html) tools.

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::sync::atomic::AtomicU64;
use std::sync::{atomic, Arc};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::protocol::consts::{
    SIGNATURE_EPOCH_UNIX_SECS, SIGNATURE_SECRET_KEY_SIZE, SIGNATURE_SIZE,
    SIGNATURE_TIMESTAMP_SIZE, SIGNATURE_VALUE_SIZE,
};
use crate::protocol::{Frame, MavLinkVersion, MessageId, SignedLinkId};

pub use builder::FrameSignerBuilder;
use builder::{NoLinkId, NoSecretKey};

/// <sup>[`serde`](https://serde.rs)</sup>
/// MAVLink signature timestamp.
///
/// 48-bit number of 10 microsecond units since 2015-01-01T00:00:00Z.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MavTimestamp(u64);

/// MAVLink signing secret key.
///
/// Keys are 32 bytes long. Keys created from strings are padded with zeros or cut.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey([u8; SIGNATURE_SECRET_KEY_SIZE]);

/// <sup>[`serde`](https://serde.rs)</sup>
/// `MAVLink 2` frame signature.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    /// Link `ID` of the signing channel.
    pub link_id: SignedLinkId,
    /// Signature timestamp.
    pub timestamp: MavTimestamp,
    /// First 6 bytes of the SHA-256 digest.
    pub value: [u8; SIGNATURE_VALUE_SIZE],
}

/// MAVLink [message signing](https://mavlink.io/en/guide/message_signing.html) manager.
///
/// [`FrameSigner`] signs outgoing frames and verifies incoming frames. Verification and signing
/// are controlled by [`SignStrategy`] which can be set separately for
/// [`FrameSigner::incoming`] and [`FrameSigner::outgoing`] frames.
///
/// Each signer is configured with the main [`FrameSigner::link_id`] and the main
/// [`FrameSigner::key`] which are used to sign frames. Additional links are used only for
/// verification. Frames with links unknown to the signer are verified with the main key.
///
/// Timestamps produced by a signer (and all its clones) strictly increase.
///
/// # Examples
///
/// ```rust
/// use mavkit::protocol::{FrameSigner, SignStrategy};
///
/// let signer = FrameSigner::builder()
///     .link_id(1)                         // Set main link `ID`
///     .key("main key")                    // Set main key
///     .incoming(SignStrategy::Strict)     // Reject unsigned incoming frames
///     .outgoing(SignStrategy::Sign)       // Sign outgoing frames
///     .add_link(2, "key for the link #2") // Add extra link
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct FrameSigner {
    link_id: SignedLinkId,
    incoming: SignStrategy,
    outgoing: SignStrategy,
    links: HashMap<SignedLinkId, SecretKey>,
    last_timestamp: UniqueMavTimestamp,
    exclude: HashSet<MessageId>,
}

/// <sup>[`serde`](https://serde.rs)</sup>
/// Message signing strategy.
///
/// By default, the [`SignStrategy::Sign`] strategy will be applied.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SignStrategy {
    /// Pass frames as they are.
    ///
    /// Incoming signatures are not checked, outgoing frames are not signed.
    Proxy,
    /// Verify signed frames and accept unsigned ones. Sign outgoing `MAVLink 2` frames.
    #[default]
    Sign,
    /// Same as [`SignStrategy::Sign`] but unsigned incoming frames (including all `MAVLink 1`
    /// frames) are rejected.
    Strict,
}

/// MAVLink timestamp wrapper that preserves monotonicity of a timestamp sequence across clones.
///
/// Used internally by [`FrameSigner`].
#[derive(Clone)]
struct UniqueMavTimestamp(Arc<AtomicU64>);

impl MavTimestamp {
    /// Largest representable timestamp.
    pub const MAX: u64 = (1 << 48) - 1;

    /// Creates timestamp from a raw 48-bit value. Higher bits are discarded.
    #[inline]
    pub fn from_raw_u64(value: u64) -> Self {
        Self(value & Self::MAX)
    }

    /// Raw value in 10 microsecond units.
    #[inline]
    pub fn as_raw_u64(&self) -> u64 {
        self.0
    }

    /// Timestamp for the current moment.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Little-endian 6-byte representation.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_TIMESTAMP_SIZE] {
        let mut bytes = [0u8; SIGNATURE_TIMESTAMP_SIZE];
        bytes.copy_from_slice(&self.0.to_le_bytes()[..SIGNATURE_TIMESTAMP_SIZE]);
        bytes
    }

    /// Reads timestamp from the little-endian 6-byte representation.
    pub fn from_bytes(bytes: [u8; SIGNATURE_TIMESTAMP_SIZE]) -> Self {
        let mut raw = [0u8; 8];
        raw[..SIGNATURE_TIMESTAMP_SIZE].copy_from_slice(&bytes);
        Self(u64::from_le_bytes(raw))
    }
}

impl From<SystemTime> for MavTimestamp {
    /// Converts system time into MAVLink timestamp. Moments before 2015 are zero.
    fn from(value: SystemTime) -> Self {
        let epoch = UNIX_EPOCH + Duration::from_secs(SIGNATURE_EPOCH_UNIX_SECS);
        let since = value.duration_since(epoch).unwrap_or_default();
        Self::from_raw_u64((since.as_micros() / 10) as u64)
    }
}

impl From<MavTimestamp> for SystemTime {
    fn from(value: MavTimestamp) -> Self {
        UNIX_EPOCH
            + Duration::from_secs(SIGNATURE_EPOCH_UNIX_SECS)
            + Duration::from_micros(value.0 * 10)
    }
}

impl SecretKey {
    /// Raw key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SECRET_KEY_SIZE] {
        &self.0
    }
}

impl From<[u8; SIGNATURE_SECRET_KEY_SIZE]> for SecretKey {
    fn from(value: [u8; SIGNATURE_SECRET_KEY_SIZE]) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for SecretKey {
    fn from(value: &[u8]) -> Self {
        let mut key = [0u8; SIGNATURE_SECRET_KEY_SIZE];
        let len = value.len().min(SIGNATURE_SECRET_KEY_SIZE);
        key[..len].copy_from_slice(&value[..len]);
        Self(key)
    }
}

impl From<&str> for SecretKey {
    fn from(value: &str) -> Self {
        Self::from(value.as_bytes())
    }
}

impl From<String> for SecretKey {
    fn from(value: String) -> Self {
        Self::from(value.as_bytes())
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(***)")
    }
}

impl Signature {
    /// Calculates signature of a frame.
    ///
    /// `frame_bytes` contain everything from the start marker up to (and including) the checksum.
    pub fn calculate(
        key: &SecretKey,
        frame_bytes: &[u8],
        link_id: SignedLinkId,
        timestamp: MavTimestamp,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(frame_bytes);
        hasher.update([link_id]);
        hasher.update(timestamp.to_bytes());
        let digest = hasher.finalize();

        let mut value = [0u8; SIGNATURE_VALUE_SIZE];
        value.copy_from_slice(&digest[..SIGNATURE_VALUE_SIZE]);

        Self {
            link_id,
            timestamp,
            value,
        }
    }

    /// Wire representation.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[0] = self.link_id;
        bytes[1..7].copy_from_slice(&self.timestamp.to_bytes());
        bytes[7..].copy_from_slice(&self.value);
        bytes
    }

    /// Reads signature from its wire representation.
    pub fn from_bytes(bytes: &[u8; SIGNATURE_SIZE]) -> Self {
        let mut timestamp = [0u8; SIGNATURE_TIMESTAMP_SIZE];
        timestamp.copy_from_slice(&bytes[1..7]);
        let mut value = [0u8; SIGNATURE_VALUE_SIZE];
        value.copy_from_slice(&bytes[7..]);

        Self {
            link_id: bytes[0],
            timestamp: MavTimestamp::from_bytes(timestamp),
            value,
        }
    }
}

impl FrameSigner {
    /// Creates a [`FrameSigner`] with the main `link_id` / `key` and default strategies.
    ///
    /// # Usage
    ///
    /// ```rust
    /// use mavkit::protocol::FrameSigner;
    ///
    /// let signer = FrameSigner::new(17, "main secret key");
    /// ```
    pub fn new<K: Into<SecretKey>>(link_id: SignedLinkId, key: K) -> Self {
        Self::builder().link_id(link_id).key(key.into()).build()
    }

    /// Instantiates an empty [`FrameSignerBuilder`].
    pub fn builder() -> FrameSignerBuilder<NoLinkId, NoSecretKey> {
        FrameSignerBuilder::new()
    }

    /// Main link `ID`.
    #[inline]
    pub fn link_id(&self) -> SignedLinkId {
        self.link_id
    }

    /// Main secret key.
    pub fn key(&self) -> &SecretKey {
        // Main link is inserted by the builder and never removed
        &self.links[&self.link_id]
    }

    /// Signing strategy for incoming frames.
    #[inline]
    pub fn incoming(&self) -> SignStrategy {
        self.incoming
    }

    /// Signing strategy for outgoing frames.
    #[inline]
    pub fn outgoing(&self) -> SignStrategy {
        self.outgoing
    }

    /// Iterator over supported links, including the main one.
    pub fn links(&self) -> impl Iterator<Item = (SignedLinkId, &SecretKey)> {
        self.links.iter().map(|(&link_id, key)| (link_id, key))
    }

    /// Message `IDs` excluded from signing and verification.
    pub fn exclude(&self) -> impl Iterator<Item = MessageId> + '_ {
        self.exclude.iter().copied()
    }

    /// Returns the next MAVLink timestamp that can be used to sign a frame.
    pub fn next_timestamp(&self) -> MavTimestamp {
        self.last_timestamp.next()
    }

    /// Whether outgoing frame should be signed according to [`FrameSigner::outgoing`].
    ///
    /// Only `MAVLink 2` frames can be signed.
    pub fn should_sign(&self, version: MavLinkVersion, message_id: MessageId) -> bool {
        version == MavLinkVersion::V2
            && self.outgoing != SignStrategy::Proxy
            && !self.exclude.contains(&message_id)
    }

    /// Calculates signature for frame bytes with the main link and key.
    ///
    /// `frame_bytes` contain everything from the start marker up to (and including) the checksum.
    pub fn sign_bytes(&self, frame_bytes: &[u8]) -> Signature {
        Signature::calculate(
            self.key(),
            frame_bytes,
            self.link_id,
            self.next_timestamp(),
        )
    }

    /// Returns `true` if frame carries a valid signature.
    ///
    /// The key is chosen by signature link `ID`. Frames with unknown links are verified with the
    /// main key. Unsigned frames are never valid.
    pub fn has_valid_signature(&self, frame: &Frame) -> bool {
        let signature = match frame.signature() {
            Some(signature) => signature,
            None => return false,
        };

        let key = self
            .links
            .get(&signature.link_id)
            .unwrap_or_else(|| self.key());
        let expected = Signature::calculate(
            key,
            &frame.signed_bytes(),
            signature.link_id,
            signature.timestamp,
        );

        expected.value == signature.value
    }

    /// Checks incoming frame according to [`FrameSigner::incoming`] strategy.
    ///
    /// Frames with message `IDs` from [`FrameSigner::exclude`] are always accepted.
    pub fn check_incoming(&self, frame: &Frame) -> bool {
        if self.exclude.contains(&frame.message_id()) {
            return true;
        }

        match self.incoming {
            SignStrategy::Proxy => true,
            SignStrategy::Sign => !frame.is_signed() || self.has_valid_signature(frame),
            SignStrategy::Strict => frame.is_signed() && self.has_valid_signature(frame),
        }
    }
}

impl UniqueMavTimestamp {
    fn new() -> Self {
        Self(Arc::new(AtomicU64::new(
            MavTimestamp::now().as_raw_u64().saturating_sub(1),
        )))
    }

    fn last(&self) -> MavTimestamp {
        MavTimestamp::from_raw_u64(self.0.load(atomic::Ordering::Acquire))
    }

    fn next(&self) -> MavTimestamp {
        let now = MavTimestamp::now().as_raw_u64();
        let prev = self
            .0
            .fetch_update(atomic::Ordering::AcqRel, atomic::Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        MavTimestamp::from_raw_u64(now.max(prev + 1))
    }
}

impl Default for UniqueMavTimestamp {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for UniqueMavTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("UniqueMavTimestamp")
            .field(&self.last())
            .finish()
    }
}

/// Builder for [`FrameSigner`]
pub mod builder {
    use super::*;

    /// Marker for [`FrameSignerBuilder`] which defines whether [`FrameSignerBuilder::key`] was set.
    pub trait MaybeSecretKey: Clone + Debug {}

    /// Marks [`FrameSignerBuilder`] without secret key.
    #[derive(Clone, Debug)]
    pub struct NoSecretKey;
    impl MaybeSecretKey for NoSecretKey {}

    /// Marks [`FrameSignerBuilder`] with secret key being set.
    #[derive(Clone, Debug)]
    pub struct HasSecretKey(SecretKey);
    impl MaybeSecretKey for HasSecretKey {}

    /// Marker for [`FrameSignerBuilder`] which defines whether [`FrameSignerBuilder::link_id`] was set.
    pub trait MaybeLinkId: Copy + Clone + Debug {}

    /// Marks [`FrameSignerBuilder`] without link `ID`.
    #[derive(Copy, Clone, Debug)]
    pub struct NoLinkId;
    impl MaybeLinkId for NoLinkId {}

    /// Marks [`FrameSignerBuilder`] with link `ID` being set.
    #[derive(Copy, Clone, Debug)]
    pub struct HasLinkId(SignedLinkId);
    impl MaybeLinkId for HasLinkId {}

    /// Builder for [`FrameSigner`].
    #[derive(Clone, Debug)]
    pub struct FrameSignerBuilder<L: MaybeLinkId, K: MaybeSecretKey> {
        link_id: L,
        key: K,
        incoming: Option<SignStrategy>,
        outgoing: Option<SignStrategy>,
        links: HashMap<SignedLinkId, SecretKey>,
        exclude: HashSet<MessageId>,
    }

    impl FrameSignerBuilder<NoLinkId, NoSecretKey> {
        /// Creates a new instance of [`FrameSignerBuilder`].
        pub fn new() -> Self {
            Self {
                link_id: NoLinkId,
                key: NoSecretKey,
                incoming: None,
                outgoing: None,
                links: Default::default(),
                exclude: Default::default(),
            }
        }
    }

    impl<K: MaybeSecretKey> FrameSignerBuilder<NoLinkId, K> {
        /// Set [`FrameSigner::link_id`].
        pub fn link_id(self, link_id: SignedLinkId) -> FrameSignerBuilder<HasLinkId, K> {
            FrameSignerBuilder {
                link_id: HasLinkId(link_id),
                key: self.key,
                incoming: self.incoming,
                outgoing: self.outgoing,
                links: self.links,
                exclude: self.exclude,
            }
        }
    }

    impl<L: MaybeLinkId> FrameSignerBuilder<L, NoSecretKey> {
        /// Set [`FrameSigner::key`].
        pub fn key<K: Into<SecretKey>>(self, key: K) -> FrameSignerBuilder<L, HasSecretKey> {
            FrameSignerBuilder {
                link_id: self.link_id,
                key: HasSecretKey(key.into()),
                incoming: self.incoming,
                outgoing: self.outgoing,
                links: self.links,
                exclude: self.exclude,
            }
        }
    }

    impl<L: MaybeLinkId, K: MaybeSecretKey> FrameSignerBuilder<L, K> {
        /// Set [`FrameSigner::incoming`].
        pub fn incoming(self, strategy: SignStrategy) -> Self {
            Self {
                incoming: Some(strategy),
                ..self
            }
        }

        /// Set [`FrameSigner::outgoing`].
        pub fn outgoing(self, strategy: SignStrategy) -> Self {
            Self {
                outgoing: Some(strategy),
                ..self
            }
        }

        /// Set [`FrameSigner::exclude`].
        pub fn exclude(self, message_ids: &[MessageId]) -> Self {
            Self {
                exclude: HashSet::from_iter(message_ids.iter().copied()),
                ..self
            }
        }
    }

    impl FrameSignerBuilder<HasLinkId, HasSecretKey> {
        /// Adds a verification link to [`FrameSigner::links`].
        ///
        /// If `link_id` is the main [`FrameSignerBuilder::link_id`], then the main key is replaced.
        pub fn add_link<K: Into<SecretKey>>(mut self, link_id: SignedLinkId, key: K) -> Self {
            let key = key.into();
            if self.link_id.0 == link_id {
                self.key.0 = key.clone();
            }
            self.links.insert(link_id, key);
            self
        }

        /// Builds [`FrameSigner`].
        pub fn build(mut self) -> FrameSigner {
            self.links.insert(self.link_id.0, self.key.0.clone());

            FrameSigner {
                link_id: self.link_id.0,
                incoming: self.incoming.unwrap_or_default(),
                outgoing: self.outgoing.unwrap_or_default(),
                links: self.links,
                last_timestamp: Default::default(),
                exclude: self.exclude,
            }
        }
    }

    impl Default for FrameSignerBuilder<NoLinkId, NoSecretKey> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl From<FrameSignerBuilder<HasLinkId, HasSecretKey>> for FrameSigner {
        #[inline]
        fn from(value: FrameSignerBuilder<HasLinkId, HasSecretKey>) -> Self {
            value.build()
        }
    }
}
