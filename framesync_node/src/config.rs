//! Configuration parsing and validation for the replay node.

use eyre::{Result, WrapErr, ensure};
use framesync_core::{Packet, SyncConfig};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Payload forwarded with every packet: the index of the record in the
/// trace file.
pub type FrameIndex = usize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Synchronization parameters.
    pub sync: SyncConfig<String>,

    /// Trace replay parameters.
    pub replay: ReplayConfig,
}

impl Config {
    /// Load configuration from a YAML file. A relative trace path is
    /// resolved against the directory of the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_yaml::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.replay.trace.is_relative()
            && let Some(dir) = path.parent()
        {
            config.replay.trace = dir.join(&config.replay.trace);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.sync
            .validate()
            .wrap_err("Invalid sync configuration")?;

        ensure!(
            self.replay.speed.is_finite() && self.replay.speed >= 0.0,
            "replay.speed must be a non-negative number, got {}",
            self.replay.speed
        );

        if let Some(capacity) = self.replay.channel_capacity {
            ensure!(capacity > 0, "replay.channel_capacity must be greater than zero");
        }

        Ok(())
    }
}

/// Trace replay parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayConfig {
    /// Path to the packet trace.
    pub trace: PathBuf,

    /// Playback speed relative to the recorded timestamps. Zero
    /// replays as fast as possible.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Bound on the packet queue feeding the synchronizer. Unbounded
    /// when absent.
    #[serde(default)]
    pub channel_capacity: Option<usize>,
}

fn default_speed() -> f64 {
    1.0
}

/// One packet recorded from the camera module.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraceRecord {
    pub stream: String,
    pub sequence: u64,
    /// Device timestamp in seconds.
    pub timestamp: f64,
}

impl TraceRecord {
    pub fn timestamp(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.timestamp).wrap_err_with(|| {
            format!(
                "Invalid timestamp {} for {} packet {}",
                self.timestamp, self.stream, self.sequence
            )
        })
    }

    pub fn to_packet(&self, index: FrameIndex) -> Result<Packet<String, FrameIndex>> {
        Ok(Packet::new(
            self.stream.clone(),
            self.sequence,
            self.timestamp()?,
            index,
        ))
    }
}

/// Load a packet trace: a YAML list of [TraceRecord]s in arrival order.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceRecord>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read trace file: {}", path.display()))?;

    let records: Vec<TraceRecord> = serde_yaml::from_str(&contents)
        .wrap_err_with(|| format!("Failed to parse trace file: {}", path.display()))?;

    for record in &records {
        record.timestamp()?;
    }

    Ok(records)
}
