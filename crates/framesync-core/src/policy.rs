//! Join strategies driving the shared [Buffer](crate::buffer::Buffer).

use crate::{
    buffer::Buffer,
    config::{BucketRounding, JoinPolicy},
    types::{JoinKey, Packet, StreamId, SyncStats},
};
use std::time::Duration;
use tracing::{debug, trace};

/// Maps timestamps onto bucket indices of a fixed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    resolution: Duration,
    rounding: BucketRounding,
}

impl Quantizer {
    pub fn new(resolution: Duration, rounding: BucketRounding) -> Self {
        Self {
            resolution,
            rounding,
        }
    }

    /// The bucket index of a timestamp.
    pub fn bucket(&self, timestamp: Duration) -> JoinKey {
        let t = timestamp.as_nanos();
        let r = self.resolution.as_nanos().max(1);

        let index = match self.rounding {
            BucketRounding::Nearest => (t + r / 2) / r,
            BucketRounding::Floor => t / r,
        };
        // A Duration holds fewer than 2^94 nanoseconds.
        index as JoinKey
    }
}

/// The policy-specific part of the synchronizer state.
#[derive(Debug)]
pub(crate) enum JoinState<S, P>
where
    S: StreamId,
{
    SequenceExact,
    TimestampBucket {
        quantizer: Quantizer,
        retention: JoinKey,
        newest: Option<JoinKey>,
    },
    ThresholdWindow {
        anchor: S,
        threshold: Duration,
        generation: JoinKey,
    },
    StereoPair {
        left: S,
        right: S,
        quantizer: Quantizer,
        retention: JoinKey,
        latest_left: Option<Packet<S, P>>,
        newest_pair: Option<JoinKey>,
    },
}

impl<S, P> JoinState<S, P>
where
    S: StreamId,
{
    pub fn new(policy: JoinPolicy<S>) -> Self {
        match policy {
            JoinPolicy::SequenceExact => Self::SequenceExact,
            JoinPolicy::TimestampBucket {
                resolution,
                rounding,
                retention,
            } => Self::TimestampBucket {
                quantizer: Quantizer::new(resolution, rounding),
                retention: retention.into(),
                newest: None,
            },
            JoinPolicy::ThresholdWindow { anchor, threshold } => Self::ThresholdWindow {
                anchor,
                threshold,
                generation: 0,
            },
            JoinPolicy::StereoPair {
                left,
                right,
                resolution,
                rounding,
                retention,
            } => Self::StereoPair {
                left,
                right,
                quantizer: Quantizer::new(resolution, rounding),
                retention: retention.into(),
                latest_left: None,
                newest_pair: None,
            },
        }
    }

    /// Files a packet of a required stream and returns the key of the
    /// entry it completed, if any. The caller takes the entry out of
    /// the buffer.
    pub fn ingest(
        &mut self,
        buffer: &mut Buffer<S, P>,
        required: &[S],
        stats: &mut SyncStats,
        packet: Packet<S, P>,
    ) -> Option<JoinKey> {
        match self {
            Self::SequenceExact => {
                let key = JoinKey::from(packet.sequence);

                // Last writer wins: a stream keeps one unmatched packet.
                if let Some((old_key, _)) = buffer.remove_stream(&packet.stream) {
                    trace!(stream = ?packet.stream, old_key, key, "replace pending packet");
                    stats.replaced += 1;
                }
                buffer.insert(key, packet);

                buffer.is_complete(key, required).then_some(key)
            }

            Self::TimestampBucket {
                quantizer,
                retention,
                newest,
            } => {
                let key = quantizer.bucket(packet.timestamp);

                if let Some(seen) = *newest
                    && key < seen - *retention
                {
                    debug!(
                        stream = ?packet.stream,
                        key,
                        newest = seen,
                        "drop a packet for an evicted bucket"
                    );
                    stats.late += 1;
                    return None;
                }

                let horizon = newest.map_or(key, |seen| seen.max(key));
                *newest = Some(horizon);
                stats.evicted += buffer.drop_before(horizon - *retention) as u64;

                if buffer.insert(key, packet).is_some() {
                    stats.replaced += 1;
                }

                buffer.is_complete(key, required).then_some(key)
            }

            Self::ThresholdWindow {
                anchor,
                threshold,
                generation,
            } => {
                if packet.stream == *anchor {
                    // Last anchor wins; the incomplete window is lost.
                    let abandoned = buffer.clear();
                    if abandoned > 0 {
                        debug!(abandoned, generation = *generation, "abandon incomplete window");
                        stats.abandoned += abandoned as u64;
                    }

                    *generation += 1;
                    buffer.insert(*generation, packet);
                } else {
                    let anchor_ts = buffer
                        .get(*generation)
                        .and_then(|window| window.get(&*anchor))
                        .map(|anchor_packet| anchor_packet.timestamp);

                    let Some(anchor_ts) = anchor_ts else {
                        trace!(stream = ?packet.stream, "no open window");
                        stats.late += 1;
                        return None;
                    };

                    if packet.timestamp.abs_diff(anchor_ts) >= *threshold {
                        trace!(
                            stream = ?packet.stream,
                            timestamp = ?packet.timestamp,
                            anchor = ?anchor_ts,
                            "packet outside of window"
                        );
                        stats.late += 1;
                        return None;
                    }

                    if buffer.insert(*generation, packet).is_some() {
                        stats.replaced += 1;
                    }
                }

                buffer.is_complete(*generation, required).then_some(*generation)
            }

            Self::StereoPair {
                left,
                right,
                quantizer,
                retention,
                latest_left,
                newest_pair,
            } => {
                if packet.stream == *left {
                    if latest_left.replace(packet).is_some() {
                        stats.replaced += 1;
                    }
                    return None;
                }

                if packet.stream == *right {
                    let sequence = packet.sequence;
                    let Some(left_packet) =
                        latest_left.take_if(|pending| pending.sequence == sequence)
                    else {
                        trace!(sequence, "right packet without a left partner");
                        stats.late += 1;
                        return None;
                    };

                    let key = quantizer.bucket(packet.timestamp);
                    if let Some(seen) = *newest_pair
                        && key < seen - *retention
                    {
                        debug!(key, newest = seen, "drop a stereo pair for an evicted bucket");
                        stats.late += 2;
                        return None;
                    }

                    let horizon = newest_pair.map_or(key, |seen| seen.max(key));
                    *newest_pair = Some(horizon);
                    stats.evicted += buffer.drop_before(horizon - *retention) as u64;

                    let replaced = [buffer.insert(key, left_packet), buffer.insert(key, packet)];
                    stats.replaced += replaced.iter().flatten().count() as u64;
                    return None;
                }

                // The probe completes a pair in its own bucket, or
                // flushes every pair older than it.
                let key = quantizer.bucket(packet.timestamp);
                let has_pair = buffer
                    .get(key)
                    .is_some_and(|entry| entry.contains_key(&*left) && entry.contains_key(&*right));

                if has_pair {
                    buffer.insert(key, packet);
                    return buffer.is_complete(key, required).then_some(key);
                }

                stats.evicted += buffer.drop_before(key) as u64;
                stats.late += 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn test_quantizer_nearest() {
        let quantizer = Quantizer::new(ms(100), BucketRounding::Nearest);

        assert_eq!(quantizer.bucket(ms(1040)), 10);
        assert_eq!(quantizer.bucket(ms(960)), 10);
        assert_eq!(quantizer.bucket(ms(1060)), 11);
        assert_eq!(quantizer.bucket(ms(1050)), 11);
        assert_eq!(quantizer.bucket(Duration::ZERO), 0);
    }

    #[test]
    fn test_quantizer_floor() {
        let quantizer = Quantizer::new(ms(100), BucketRounding::Floor);

        assert_eq!(quantizer.bucket(ms(1040)), 10);
        assert_eq!(quantizer.bucket(ms(1060)), 10);
        assert_eq!(quantizer.bucket(ms(1099)), 10);
        assert_eq!(quantizer.bucket(ms(1100)), 11);
        assert_eq!(quantizer.bucket(ms(1250)), 12);
    }

    #[test]
    fn test_quantizer_huge_timestamps_stay_distinct() {
        let quantizer = Quantizer::new(Duration::from_nanos(1), BucketRounding::Floor);

        let last = quantizer.bucket(Duration::MAX);
        let before = quantizer.bucket(Duration::MAX - Duration::from_secs(1));

        assert_eq!(last, JoinKey::try_from(Duration::MAX.as_nanos()).unwrap());
        assert_eq!(last - before, 1_000_000_000);
    }
}
