//! framesync-node - replays recorded camera packet traces through the
//! frame synchronizer.
//!
//! The node loads a YAML configuration and feeds the trace, in arrival
//! order, into a [SyncTask](framesync_core::SyncTask). Every synced
//! tuple is logged.
//!
//! # Configuration
//!
//! The configuration file specifies:
//! - The required streams and the join policy
//! - The trace to replay, the playback speed and the queue capacity
//!
//! See the `config/example.yaml` file for a complete example.

pub mod config;
pub mod replay;

pub use config::{Config, ReplayConfig, TraceRecord};
pub use replay::{Replay, ReplaySummary};
