//! Trace replay: a feeder task walks the trace in arrival order and
//! paces the packets into a synchronizer task.

use crate::config::{Config, FrameIndex, TraceRecord, load_trace};
use eyre::{Result, WrapErr, bail};
use framesync_core::{PacketSender, SyncStats, SyncTask, SyncedTuple};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of a finished replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplaySummary {
    pub tuples: usize,
    pub stats: SyncStats,
    /// Packets left in incomplete entries when the trace ran out.
    pub pending_packets: usize,
}

pub struct Replay {
    config: Config,
    records: Vec<TraceRecord>,
}

impl Replay {
    /// Load the trace named by the configuration.
    pub fn new(config: Config) -> Result<Self> {
        let records = load_trace(&config.replay.trace)?;
        info!(
            trace = %config.replay.trace.display(),
            num_records = records.len(),
            "Trace loaded"
        );
        Self::from_records(config, records)
    }

    pub fn from_records(config: Config, records: Vec<TraceRecord>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, records })
    }

    /// Replay the whole trace and wait for the synchronizer to drain.
    pub async fn run(self) -> Result<ReplaySummary> {
        let Self { config, records } = self;

        let timestamps = records
            .iter()
            .map(TraceRecord::timestamp)
            .collect::<Result<Vec<_>>>()?;
        let origin = timestamps.into_iter().min().unwrap_or_default();

        let (packet_tx, task) = match config.replay.channel_capacity {
            Some(capacity) => SyncTask::spawn_bounded(config.sync, capacity)?,
            None => SyncTask::spawn(config.sync)?,
        };

        let feeder = tokio::spawn(feed(
            records,
            packet_tx,
            Instant::now(),
            origin,
            config.replay.speed,
        ));

        let mut num_tuples = 0;
        while let Ok(tuple) = task.tuples().recv_async().await {
            num_tuples += 1;
            report_tuple(&tuple);
        }

        feeder
            .await
            .wrap_err("Trace feeder panicked")?
            .wrap_err("Trace feeder failed")?;

        let synchronizer = task.join().await?;
        let pending_packets = synchronizer.pending_packets();
        if pending_packets > 0 {
            warn!(pending_packets, "Trace ended with incomplete tuples");
        }

        Ok(ReplaySummary {
            tuples: num_tuples,
            stats: synchronizer.stats(),
            pending_packets,
        })
    }
}

/// Sends the records in trace order. With a non-zero `speed`, each
/// packet waits until its timestamp offset, scaled by `speed`, has
/// elapsed since `start`.
async fn feed(
    records: Vec<TraceRecord>,
    packet_tx: PacketSender<String, FrameIndex>,
    start: Instant,
    origin: Duration,
    speed: f64,
) -> Result<()> {
    for (index, record) in records.into_iter().enumerate() {
        let packet = record.to_packet(index)?;

        if speed > 0.0 {
            let offset = packet.timestamp.saturating_sub(origin).div_f64(speed);
            tokio::time::sleep_until(start + offset).await;
        }

        if packet_tx.send_async(packet).await.is_err() {
            bail!("synchronizer task stopped before the trace was fully replayed");
        }
    }

    Ok(())
}

fn report_tuple(tuple: &SyncedTuple<String, FrameIndex>) {
    info!(
        key = %tuple.key(),
        span = ?tuple.span(),
        streams = tuple.len(),
        "Synced tuple"
    );

    for (stream, packet) in tuple.iter() {
        debug!(
            stream = %stream,
            sequence = packet.sequence,
            timestamp = ?packet.timestamp,
            frame = packet.payload,
            "  member"
        );
    }
}
