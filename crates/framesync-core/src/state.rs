use crate::{
    buffer::Buffer,
    config::SyncConfig,
    policy::JoinState,
    types::{Packet, StreamId, SyncStats, SyncedTuple},
};
use eyre::Result;
use tracing::{debug, trace};

/// Joins packets from several streams into tuples, one packet per
/// required stream, under a configurable [JoinPolicy](crate::JoinPolicy).
///
/// The synchronizer is single-writer: `ingest` takes `&mut self` and
/// never blocks. Feed it from one loop, guard it with a mutex, or use
/// [SyncTask](crate::SyncTask) to funnel several producers into it.
#[derive(Debug)]
pub struct Synchronizer<S, P>
where
    S: StreamId,
{
    config: SyncConfig<S>,

    /// Unmatched packets indexed by join key.
    buffer: Buffer<S, P>,

    /// Policy-specific bookkeeping.
    join: JoinState<S, P>,

    stats: SyncStats,
}

impl<S, P> Synchronizer<S, P>
where
    S: StreamId,
{
    /// Create a synchronizer. Fails if the configuration is
    /// inconsistent.
    pub fn new(config: SyncConfig<S>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            join: JoinState::new(config.policy.clone()),
            buffer: Buffer::new(),
            stats: SyncStats::default(),
            config,
        })
    }

    /// Feed one packet. Returns the tuple this packet completed, if
    /// any.
    ///
    /// Packets of streams outside `required_streams` are ignored.
    /// Late, duplicate and out-of-window packets are absorbed by the
    /// policy and show up in [stats](Self::stats).
    pub fn ingest(&mut self, packet: Packet<S, P>) -> Option<SyncedTuple<S, P>> {
        self.stats.ingested += 1;

        if !self.config.required_streams.contains(&packet.stream) {
            debug!(
                stream = ?packet.stream,
                sequence = packet.sequence,
                "ignore a packet from an unconfigured stream"
            );
            self.stats.ignored += 1;
            return None;
        }

        trace!(
            stream = ?packet.stream,
            sequence = packet.sequence,
            timestamp = ?packet.timestamp,
            "ingest"
        );

        let key = self.join.ingest(
            &mut self.buffer,
            &self.config.required_streams,
            &mut self.stats,
            packet,
        )?;
        let mut entry = self.buffer.take(key)?;

        // Order the tuple as the required streams are listed.
        let packets = self
            .config
            .required_streams
            .iter()
            .filter_map(|stream| {
                let packet = entry.swap_remove(stream)?;
                Some((stream.clone(), packet))
            })
            .collect();

        self.stats.emitted += 1;
        Some(SyncedTuple::new(key, packets))
    }

    /// Drop all pending packets. Counted as evictions.
    pub fn clear(&mut self) {
        self.stats.evicted += self.buffer.clear() as u64;
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn config(&self) -> &SyncConfig<S> {
        &self.config
    }

    pub fn required_streams(&self) -> &[S] {
        &self.config.required_streams
    }

    /// The number of join keys with pending packets.
    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// The number of pending packets, across all join keys.
    pub fn pending_packets(&self) -> usize {
        self.buffer.packet_count()
    }

    pub fn buffer(&self) -> &Buffer<S, P> {
        &self.buffer
    }
}
