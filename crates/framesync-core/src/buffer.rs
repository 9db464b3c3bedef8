use crate::types::{JoinKey, Packet, StreamId};
use indexmap::IndexMap;
use std::{collections::BTreeMap, mem};

/// The partial tuple stored under one join key. Holds at most one
/// packet per stream.
pub type PendingEntry<S, P> = IndexMap<S, Packet<S, P>>;

/// The pending-match buffer, ordered by join key.
///
/// Besides the entries, the buffer keeps a reverse index from each
/// stream to the key its latest packet was filed under, so that a
/// stream's pending packet can be replaced without scanning.
#[derive(Debug)]
pub struct Buffer<S, P>
where
    S: StreamId,
{
    entries: BTreeMap<JoinKey, PendingEntry<S, P>>,
    latest: IndexMap<S, JoinKey>,
    packet_count: usize,
}

impl<S, P> Default for Buffer<S, P>
where
    S: StreamId,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P> Buffer<S, P>
where
    S: StreamId,
{
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            latest: IndexMap::new(),
            packet_count: 0,
        }
    }

    /// The number of join keys with pending packets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The number of pending packets across all keys.
    pub fn packet_count(&self) -> usize {
        self.packet_count
    }

    pub fn first_key(&self) -> Option<JoinKey> {
        self.entries.keys().next().copied()
    }

    pub fn last_key(&self) -> Option<JoinKey> {
        self.entries.keys().next_back().copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = JoinKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn get(&self, key: JoinKey) -> Option<&PendingEntry<S, P>> {
        self.entries.get(&key)
    }

    /// The key under which the latest pending packet of `stream` is
    /// filed.
    pub fn latest_key(&self, stream: &S) -> Option<JoinKey> {
        self.latest.get(stream).copied()
    }

    /// Checks if every stream in `required` has a packet under `key`.
    pub fn is_complete(&self, key: JoinKey, required: &[S]) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| required.iter().all(|stream| entry.contains_key(stream)))
    }

    /// Files a packet under `key`. If the same stream already has a
    /// packet under that key, the older packet is replaced and
    /// returned.
    pub fn insert(&mut self, key: JoinKey, packet: Packet<S, P>) -> Option<Packet<S, P>> {
        let stream = packet.stream.clone();
        let entry = self.entries.entry(key).or_default();
        let replaced = entry.insert(stream.clone(), packet);
        self.latest.insert(stream, key);

        if replaced.is_none() {
            self.packet_count += 1;
        }
        replaced
    }

    /// Removes the latest pending packet of `stream`, wherever it is
    /// filed.
    pub fn remove_stream(&mut self, stream: &S) -> Option<(JoinKey, Packet<S, P>)> {
        let key = self.latest.swap_remove(stream)?;
        let entry = self.entries.get_mut(&key)?;
        let packet = entry.shift_remove(stream)?;

        if entry.is_empty() {
            self.entries.remove(&key);
        }
        self.packet_count -= 1;

        Some((key, packet))
    }

    /// Removes and returns the entry under `key`.
    pub fn take(&mut self, key: JoinKey) -> Option<PendingEntry<S, P>> {
        let entry = self.entries.remove(&key)?;
        self.forget(key, &entry);
        Some(entry)
    }

    /// Drops every entry whose key is strictly below `key` and returns
    /// the number of dropped packets.
    pub fn drop_before(&mut self, key: JoinKey) -> usize {
        if self.first_key().is_none_or(|first| first >= key) {
            return 0;
        }

        let kept = self.entries.split_off(&key);
        let stale = mem::replace(&mut self.entries, kept);

        stale
            .into_iter()
            .map(|(stale_key, entry)| {
                self.forget(stale_key, &entry);
                entry.len()
            })
            .sum()
    }

    /// Drops every entry and returns the number of dropped packets.
    pub fn clear(&mut self) -> usize {
        let count = self.packet_count;
        self.entries.clear();
        self.latest.clear();
        self.packet_count = 0;
        count
    }

    /// Unlinks the packets of a removed entry from the stream index.
    fn forget(&mut self, key: JoinKey, entry: &PendingEntry<S, P>) {
        for stream in entry.keys() {
            if self.latest.get(stream) == Some(&key) {
                self.latest.swap_remove(stream);
            }
        }
        self.packet_count -= entry.len();
    }
}
