use eyre::Result;
use futures::stream::BoxStream;
use indexmap::IndexMap;
use std::{fmt::Debug, hash::Hash, time::Duration};

/// The identifier of an input stream, e.g. `"left"`, `"right"` or
/// `"preview"`.
pub trait StreamId: Clone + PartialEq + Eq + Hash + Debug + Sync + Send {}

impl<S> StreamId for S where S: Clone + PartialEq + Eq + Hash + Debug + Sync + Send {}

/// The value used to group packets of different streams into one
/// tuple: a sequence number, a quantized timestamp bucket or a window
/// generation, depending on the active policy.
///
/// Wide enough to hold every `u64` sequence number and every bucket
/// index of a `Duration` without loss.
pub type JoinKey = i128;

/// One observation emitted by a single stream.
///
/// The payload is moved through the synchronizer untouched. Wrap it
/// in an `Arc` when the producer needs to keep a handle on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet<S, P> {
    pub stream: S,
    pub sequence: u64,
    pub timestamp: Duration,
    pub payload: P,
}

impl<S, P> Packet<S, P> {
    pub fn new(stream: S, sequence: u64, timestamp: Duration, payload: P) -> Self {
        Self {
            stream,
            sequence,
            timestamp,
            payload,
        }
    }
}

/// A set of packets, one per required stream, aligned under a join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedTuple<S, P>
where
    S: StreamId,
{
    key: JoinKey,
    packets: IndexMap<S, Packet<S, P>>,
}

impl<S, P> SyncedTuple<S, P>
where
    S: StreamId,
{
    pub(crate) fn new(key: JoinKey, packets: IndexMap<S, Packet<S, P>>) -> Self {
        Self { key, packets }
    }

    /// The join key that completed this tuple.
    pub fn key(&self) -> JoinKey {
        self.key
    }

    pub fn get(&self, stream: &S) -> Option<&Packet<S, P>> {
        self.packets.get(stream)
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn contains(&self, stream: &S) -> bool {
        self.packets.contains_key(stream)
    }

    pub fn streams(&self) -> impl Iterator<Item = &S> {
        self.packets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&S, &Packet<S, P>)> {
        self.packets.iter()
    }

    /// Gets the earliest packet timestamp in the tuple.
    pub fn min_timestamp(&self) -> Option<Duration> {
        self.packets.values().map(|packet| packet.timestamp).min()
    }

    /// Gets the latest packet timestamp in the tuple.
    pub fn max_timestamp(&self) -> Option<Duration> {
        self.packets.values().map(|packet| packet.timestamp).max()
    }

    /// The time span covered by the tuple's packets.
    pub fn span(&self) -> Duration {
        match (self.min_timestamp(), self.max_timestamp()) {
            (Some(min), Some(max)) => max - min,
            _ => Duration::ZERO,
        }
    }

    pub fn into_packets(self) -> IndexMap<S, Packet<S, P>> {
        self.packets
    }
}

impl<S, P> std::ops::Index<&S> for SyncedTuple<S, P>
where
    S: StreamId,
{
    type Output = Packet<S, P>;

    fn index(&self, stream: &S) -> &Self::Output {
        &self.packets[stream]
    }
}

/// Diagnostic counters maintained by the
/// [Synchronizer](crate::Synchronizer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Packets passed to `ingest`.
    pub ingested: u64,
    /// Tuples emitted.
    pub emitted: u64,
    /// Packets of streams that are not configured.
    pub ignored: u64,
    /// Pending packets superseded by a newer packet of the same stream.
    pub replaced: u64,
    /// Pending packets dropped because their key went stale.
    pub evicted: u64,
    /// Pending packets dropped when a new anchor opened a window.
    pub abandoned: u64,
    /// Packets dropped on arrival because they can no longer match.
    pub late: u64,
}

/// The stream returned by [sync](crate::sync()), emitting tuples in
/// completion order.
pub type OutputStream<'a, S, P> = BoxStream<'a, Result<SyncedTuple<S, P>>>;
