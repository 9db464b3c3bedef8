//! A dedicated tokio task owning a [Synchronizer], fed by any number of
//! producers through a channel.

use crate::{
    config::SyncConfig,
    state::Synchronizer,
    types::{Packet, StreamId, SyncStats, SyncedTuple},
};
use eyre::{Result, WrapErr};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

/// The producer end of a [SyncTask]. Clone it once per producer.
pub type PacketSender<S, P> = flume::Sender<Packet<S, P>>;

/// Handle to a running synchronizer task.
///
/// The task ends once every [PacketSender] is dropped or the tuple
/// receiver goes away.
pub struct SyncTask<S, P>
where
    S: StreamId,
{
    tuples: flume::Receiver<SyncedTuple<S, P>>,
    stats: watch::Receiver<SyncStats>,
    handle: JoinHandle<Synchronizer<S, P>>,
}

impl<S, P> SyncTask<S, P>
where
    S: StreamId + 'static,
    P: Send + 'static,
{
    /// Spawn the task with an unbounded packet queue.
    pub fn spawn(config: SyncConfig<S>) -> Result<(PacketSender<S, P>, Self)> {
        let (packet_tx, packet_rx) = flume::unbounded();
        let (tuple_tx, tuple_rx) = flume::unbounded();
        let task = Self::start(config, packet_rx, tuple_tx, tuple_rx)?;
        Ok((packet_tx, task))
    }

    /// Spawn the task with bounded packet and tuple queues. Producers
    /// wait when the packet queue is full, and the task waits when
    /// `capacity` tuples are left unread.
    pub fn spawn_bounded(
        config: SyncConfig<S>,
        capacity: usize,
    ) -> Result<(PacketSender<S, P>, Self)> {
        let (packet_tx, packet_rx) = flume::bounded(capacity);
        let (tuple_tx, tuple_rx) = flume::bounded(capacity);
        let task = Self::start(config, packet_rx, tuple_tx, tuple_rx)?;
        Ok((packet_tx, task))
    }

    fn start(
        config: SyncConfig<S>,
        packet_rx: flume::Receiver<Packet<S, P>>,
        tuple_tx: flume::Sender<SyncedTuple<S, P>>,
        tuple_rx: flume::Receiver<SyncedTuple<S, P>>,
    ) -> Result<Self> {
        let synchronizer = Synchronizer::new(config)?;
        let (stats_tx, stats_rx) = watch::channel(SyncStats::default());

        let handle = tokio::spawn(run(synchronizer, packet_rx, tuple_tx, stats_tx));

        Ok(Self {
            tuples: tuple_rx,
            stats: stats_rx,
            handle,
        })
    }
}

impl<S, P> SyncTask<S, P>
where
    S: StreamId,
{
    /// Completed tuples, in completion order.
    pub fn tuples(&self) -> &flume::Receiver<SyncedTuple<S, P>> {
        &self.tuples
    }

    /// The statistics published after the latest ingestion.
    pub fn stats(&self) -> SyncStats {
        *self.stats.borrow()
    }

    pub fn stats_receiver(&self) -> watch::Receiver<SyncStats> {
        self.stats.clone()
    }

    /// Wait for the task to finish and take back the synchronizer.
    /// Tuples still queued in the receiver are dropped.
    pub async fn join(self) -> Result<Synchronizer<S, P>> {
        // Keep the receiver alive so the task is not cut short.
        let Self { tuples, handle, .. } = self;
        let synchronizer = handle
            .await
            .wrap_err("synchronizer task terminated abnormally")?;
        drop(tuples);
        Ok(synchronizer)
    }
}

async fn run<S, P>(
    mut synchronizer: Synchronizer<S, P>,
    packet_rx: flume::Receiver<Packet<S, P>>,
    tuple_tx: flume::Sender<SyncedTuple<S, P>>,
    stats_tx: watch::Sender<SyncStats>,
) -> Synchronizer<S, P>
where
    S: StreamId,
{
    while let Ok(packet) = packet_rx.recv_async().await {
        let tuple = synchronizer.ingest(packet);
        stats_tx.send_replace(synchronizer.stats());

        if let Some(tuple) = tuple
            && tuple_tx.send_async(tuple).await.is_err()
        {
            debug!("tuple receiver dropped, stop synchronizing");
            break;
        }
    }

    synchronizer
}
