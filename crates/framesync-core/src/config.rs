use crate::types::StreamId;
use eyre::{Result, bail, ensure};
use itertools::Itertools;
use serde::Deserialize;
use std::time::Duration;

/// The number of buckets a stereo pair is kept behind the newest pair
/// when no probe packet claims it.
pub const DEFAULT_PAIR_RETENTION: u32 = 4;

/// How a timestamp is quantized into a bucket index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketRounding {
    /// `round(t / resolution)`, ties rounding up.
    #[default]
    Nearest,
    /// `floor(t / resolution)`.
    Floor,
}

/// The strategy deciding which packets belong to the same tuple.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinPolicy<S> {
    /// Join packets carrying equal sequence numbers. Each stream keeps
    /// only its latest unmatched packet.
    SequenceExact,

    /// Join packets whose timestamps quantize into the same bucket.
    TimestampBucket {
        #[serde(with = "humantime_serde")]
        resolution: Duration,
        #[serde(default)]
        rounding: BucketRounding,
        /// Number of buckets kept behind the newest bucket seen.
        #[serde(default)]
        retention: u32,
    },

    /// An anchor packet opens a window; other packets join it when they
    /// are strictly closer than `threshold` to the anchor.
    ThresholdWindow {
        anchor: S,
        #[serde(with = "humantime_serde")]
        threshold: Duration,
    },

    /// Pair `left` and `right` by sequence number, file the pair under
    /// the bucket of the right packet, then complete it with the one
    /// remaining stream landing in the same bucket.
    StereoPair {
        left: S,
        right: S,
        #[serde(with = "humantime_serde")]
        resolution: Duration,
        #[serde(default)]
        rounding: BucketRounding,
        #[serde(default = "default_pair_retention")]
        retention: u32,
    },
}

fn default_pair_retention() -> u32 {
    DEFAULT_PAIR_RETENTION
}

/// Configuration parameters passed to
/// [Synchronizer::new](crate::Synchronizer::new) and
/// [sync](crate::sync()).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig<S> {
    /// Streams that must all contribute a packet before a tuple is
    /// emitted. Packets of any other stream are ignored.
    pub required_streams: Vec<S>,

    /// The join policy.
    pub policy: JoinPolicy<S>,
}

impl<S> SyncConfig<S>
where
    S: StreamId,
{
    pub fn sequence_exact(required_streams: impl IntoIterator<Item = S>) -> Self {
        Self {
            required_streams: required_streams.into_iter().collect(),
            policy: JoinPolicy::SequenceExact,
        }
    }

    pub fn timestamp_bucket(
        required_streams: impl IntoIterator<Item = S>,
        resolution: Duration,
    ) -> Self {
        Self {
            required_streams: required_streams.into_iter().collect(),
            policy: JoinPolicy::TimestampBucket {
                resolution,
                rounding: BucketRounding::default(),
                retention: 0,
            },
        }
    }

    pub fn threshold_window(
        required_streams: impl IntoIterator<Item = S>,
        anchor: S,
        threshold: Duration,
    ) -> Self {
        Self {
            required_streams: required_streams.into_iter().collect(),
            policy: JoinPolicy::ThresholdWindow { anchor, threshold },
        }
    }

    /// Create a stereo pairing config. `probe` is the stream that
    /// completes a stereo pair, such as the color preview.
    pub fn stereo_pair(left: S, right: S, probe: S, resolution: Duration) -> Self {
        Self {
            required_streams: vec![left.clone(), right.clone(), probe],
            policy: JoinPolicy::StereoPair {
                left,
                right,
                resolution,
                rounding: BucketRounding::default(),
                retention: DEFAULT_PAIR_RETENTION,
            },
        }
    }

    /// Set the bucket rounding mode. No effect on policies that do not
    /// quantize timestamps.
    pub fn with_rounding(mut self, mode: BucketRounding) -> Self {
        match &mut self.policy {
            JoinPolicy::TimestampBucket { rounding, .. }
            | JoinPolicy::StereoPair { rounding, .. } => *rounding = mode,
            JoinPolicy::SequenceExact | JoinPolicy::ThresholdWindow { .. } => {}
        }
        self
    }

    /// Set the bucket retention. No effect on policies that do not
    /// quantize timestamps.
    pub fn with_retention(mut self, buckets: u32) -> Self {
        match &mut self.policy {
            JoinPolicy::TimestampBucket { retention, .. }
            | JoinPolicy::StereoPair { retention, .. } => *retention = buckets,
            JoinPolicy::SequenceExact | JoinPolicy::ThresholdWindow { .. } => {}
        }
        self
    }

    /// Check the configuration for contradictions.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.required_streams.is_empty(),
            "at least one required stream is needed"
        );

        if let Some(dup) = self.required_streams.iter().duplicates().next() {
            bail!("duplicate required stream {dup:?}");
        }

        match &self.policy {
            JoinPolicy::SequenceExact => {}
            JoinPolicy::TimestampBucket { resolution, .. } => {
                ensure!(
                    !resolution.is_zero(),
                    "bucket resolution must be greater than zero"
                );
            }
            JoinPolicy::ThresholdWindow { anchor, threshold } => {
                ensure!(
                    !threshold.is_zero(),
                    "window threshold must be greater than zero"
                );
                ensure!(
                    self.required_streams.contains(anchor),
                    "anchor stream {anchor:?} is not a required stream"
                );
            }
            JoinPolicy::StereoPair {
                left,
                right,
                resolution,
                ..
            } => {
                ensure!(
                    !resolution.is_zero(),
                    "bucket resolution must be greater than zero"
                );
                ensure!(left != right, "left and right must be distinct streams");
                ensure!(
                    self.required_streams.contains(left),
                    "left stream {left:?} is not a required stream"
                );
                ensure!(
                    self.required_streams.contains(right),
                    "right stream {right:?} is not a required stream"
                );
                ensure!(
                    self.required_streams.len() == 3,
                    "stereo pairing needs exactly left, right and one probe stream, got {} streams",
                    self.required_streams.len()
                );
            }
        }

        Ok(())
    }
}
