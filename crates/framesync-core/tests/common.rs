use framesync_core::{Packet, SyncConfig, SyncedTuple, Synchronizer, sync};
use futures::{
    Stream,
    stream::{self, TryStreamExt},
};
use std::{collections::HashSet, time::Duration};

pub type TestPacket = Packet<&'static str, String>;
pub type TestTuple = SyncedTuple<&'static str, String>;

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Creates a packet whose payload names its origin, e.g. `left#5@1000`.
pub fn create_packet(stream: &'static str, sequence: u64, timestamp_ms: u64) -> TestPacket {
    Packet::new(
        stream,
        sequence,
        ms(timestamp_ms),
        format!("{stream}#{sequence}@{timestamp_ms}"),
    )
}

/// PacketBuilder for creating interleaved packet sequences in arrival
/// order.
#[derive(Default)]
pub struct PacketBuilder {
    packets: Vec<TestPacket>,
}

impl PacketBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, stream: &'static str, sequence: u64, timestamp_ms: u64) -> Self {
        self.packets.push(create_packet(stream, sequence, timestamp_ms));
        self
    }

    /// Adds packets of one stream, numbering them from `first_sequence`.
    #[allow(dead_code)]
    pub fn add_stream(
        mut self,
        stream: &'static str,
        first_sequence: u64,
        timestamps_ms: &[u64],
    ) -> Self {
        for (offset, &ts) in timestamps_ms.iter().enumerate() {
            let sequence = first_sequence + offset as u64;
            self.packets.push(create_packet(stream, sequence, ts));
        }
        self
    }

    pub fn build(self) -> Vec<TestPacket> {
        self.packets
    }

    #[allow(dead_code)]
    pub fn build_stream(self) -> impl Stream<Item = eyre::Result<TestPacket>> {
        stream::iter(self.packets.into_iter().map(Ok))
    }
}

/// Feeds every packet and collects the emitted tuples.
#[allow(dead_code)]
pub fn run_ingest(
    synchronizer: &mut Synchronizer<&'static str, String>,
    packets: impl IntoIterator<Item = TestPacket>,
) -> Vec<TestTuple> {
    packets
        .into_iter()
        .filter_map(|packet| synchronizer.ingest(packet))
        .collect()
}

/// Helper function to run the stream adapter and collect all tuples.
#[allow(dead_code)]
pub async fn run_sync(
    input_stream: impl Stream<Item = eyre::Result<TestPacket>> + Unpin + Send,
    config: SyncConfig<&'static str>,
) -> eyre::Result<Vec<TestTuple>> {
    let output_stream = sync(input_stream, config)?;
    let tuples: Vec<TestTuple> = output_stream.try_collect().await?;
    Ok(tuples)
}

/// Asserts that no payload shows up in two tuples.
#[allow(dead_code)]
pub fn assert_no_double_emission(tuples: &[TestTuple]) {
    let mut seen = HashSet::new();

    for tuple in tuples {
        for (_, packet) in tuple.iter() {
            assert!(
                seen.insert(packet.payload.clone()),
                "payload {} emitted twice",
                packet.payload
            );
        }
    }
}

/// Asserts that every tuple holds exactly one packet of each required
/// stream and nothing else.
#[allow(dead_code)]
pub fn assert_complete(tuples: &[TestTuple], required: &[&'static str]) {
    for tuple in tuples {
        assert_eq!(tuple.len(), required.len(), "tuple {tuple:?} is not complete");

        for stream in required {
            let packet = tuple
                .get(stream)
                .unwrap_or_else(|| panic!("tuple {tuple:?} misses stream {stream}"));
            assert_eq!(packet.stream, *stream);
        }
    }
}

/// Payload labels of a tuple in required-stream order.
#[allow(dead_code)]
pub fn labels(tuple: &TestTuple) -> Vec<&str> {
    tuple.iter().map(|(_, packet)| packet.payload.as_str()).collect()
}
