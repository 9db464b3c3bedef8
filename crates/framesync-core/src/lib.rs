//! This library joins packets from several independently clocked
//! streams, such as the left and right mono cameras and the color
//! preview of a stereo camera module, into tuples holding one packet
//! per stream.
//!
//! Packets are grouped under a join key chosen by a [JoinPolicy]:
//!
//! - [JoinPolicy::SequenceExact] pairs packets with equal sequence numbers.
//! - [JoinPolicy::TimestampBucket] quantizes timestamps into buckets.
//! - [JoinPolicy::ThresholdWindow] collects packets close to an anchor packet.
//! - [JoinPolicy::StereoPair] pairs left and right by sequence number, then
//!   completes the pair with a probe stream landing in the same bucket.
//!
//! Unmatched packets wait in a bounded buffer and are evicted once the
//! policy decides they can no longer be completed.
//!
//! # Usage
//!
//! ```rust
//! use framesync_core::{Packet, SyncConfig, Synchronizer};
//! use std::time::Duration;
//!
//! # fn main() -> eyre::Result<()> {
//! let config = SyncConfig::threshold_window(
//!     ["left", "right", "preview"],
//!     "left",
//!     Duration::from_millis(30),
//! );
//! let mut synchronizer = Synchronizer::new(config)?;
//!
//! let ms = Duration::from_millis;
//! assert!(synchronizer.ingest(Packet::new("left", 1, ms(2000), "L")).is_none());
//! assert!(synchronizer.ingest(Packet::new("right", 1, ms(2010), "R")).is_none());
//! // Too far from the anchor.
//! assert!(synchronizer.ingest(Packet::new("preview", 7, ms(2050), "P0")).is_none());
//!
//! let tuple = synchronizer
//!     .ingest(Packet::new("preview", 8, ms(2020), "P1"))
//!     .expect("all streams present");
//! assert_eq!(tuple[&"preview"].payload, "P1");
//! # Ok(())
//! # }
//! ```
//!
//! The [sync()] function wraps a synchronizer around an async packet
//! stream, and [SyncTask] runs one in a dedicated tokio task fed by any
//! number of producers.

pub mod buffer;
mod config;
pub mod policy;
mod state;
mod sync;
#[cfg(feature = "tokio")]
mod task;
mod types;

pub use config::{BucketRounding, DEFAULT_PAIR_RETENTION, JoinPolicy, SyncConfig};
pub use state::Synchronizer;
pub use sync::sync;
#[cfg(feature = "tokio")]
pub use task::{PacketSender, SyncTask};
pub use types::*;
