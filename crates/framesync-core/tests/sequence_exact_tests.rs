mod common;

use common::*;
use framesync_core::{JoinKey, SyncConfig, Synchronizer};

fn stereo() -> Synchronizer<&'static str, String> {
    Synchronizer::new(SyncConfig::sequence_exact(["left", "right"])).unwrap()
}

#[test]
fn test_pair_on_equal_sequence() {
    // left{seq=5,t=1.00}, right{seq=5,t=1.02} -> pair
    // right{seq=6,t=1.05} alone -> nothing
    let mut sync = stereo();

    assert!(sync.ingest(create_packet("left", 5, 1000)).is_none());

    let tuple = sync.ingest(create_packet("right", 5, 1020)).unwrap();
    assert_eq!(tuple.len(), 2);
    assert_eq!(tuple.key(), 5);
    assert_eq!(tuple[&"left"].payload, "left#5@1000");
    assert_eq!(tuple[&"right"].payload, "right#5@1020");

    assert!(sync.ingest(create_packet("right", 6, 1050)).is_none());
    assert_eq!(sync.pending_packets(), 1);
    assert_eq!(sync.stats().emitted, 1);
}

#[test]
fn test_arrival_order_does_not_matter() {
    let mut sync = stereo();

    let packets = PacketBuilder::new()
        .add("right", 1, 1000)
        .add("left", 1, 1001)
        .add("left", 2, 1034)
        .add("right", 2, 1033)
        .build();

    let tuples = run_ingest(&mut sync, packets);
    assert_eq!(tuples.len(), 2);
    assert_eq!(labels(&tuples[0]), ["left#1@1001", "right#1@1000"]);
    assert_eq!(labels(&tuples[1]), ["left#2@1034", "right#2@1033"]);
    assert_complete(&tuples, &["left", "right"]);
}

#[test]
fn test_last_writer_wins() {
    // A newer unpaired left replaces the older one, so a late right
    // for the older sequence finds no partner.
    let mut sync = stereo();

    assert!(sync.ingest(create_packet("left", 1, 1000)).is_none());
    assert!(sync.ingest(create_packet("left", 2, 1033)).is_none());
    assert_eq!(sync.pending_packets(), 1);
    assert_eq!(sync.stats().replaced, 1);

    assert!(sync.ingest(create_packet("right", 1, 1001)).is_none());

    let tuple = sync.ingest(create_packet("right", 2, 1034)).unwrap();
    assert_eq!(labels(&tuple), ["left#2@1033", "right#2@1034"]);
}

#[test]
fn test_pending_bounded_by_stream_count() {
    let mut sync = stereo();

    // Streams never agree on a sequence number.
    for i in 0..1000 {
        sync.ingest(create_packet("left", 2 * i, i * 33));
        sync.ingest(create_packet("right", 2 * i + 1, i * 33));
        assert!(sync.pending_packets() <= 2);
    }

    assert_eq!(sync.stats().emitted, 0);
    assert_eq!(sync.stats().replaced, 1998);
}

#[test]
fn test_duplicate_sequence_replaces_candidate() {
    let mut sync = stereo();

    sync.ingest(create_packet("left", 7, 1000));
    sync.ingest(create_packet("left", 7, 1005));

    let tuple = sync.ingest(create_packet("right", 7, 1002)).unwrap();
    assert_eq!(tuple[&"left"].payload, "left#7@1005");
    assert_eq!(sync.stats().replaced, 1);
}

#[test]
fn test_sequence_restart_is_tolerated() {
    let mut sync = stereo();

    let packets = PacketBuilder::new()
        .add_stream("left", 100, &[1000, 1033])
        .add_stream("right", 100, &[1000, 1033])
        // Producers restart their counters.
        .add_stream("left", 0, &[5000])
        .add_stream("right", 0, &[5001])
        .build();

    let tuples = run_ingest(&mut sync, packets);

    // 100 is replaced by 101 on the left before right#100 arrives.
    assert_eq!(tuples.len(), 2);
    assert_eq!(tuples[0].key(), 101);
    assert_eq!(tuples[1].key(), 0);
    assert_no_double_emission(&tuples);
}

#[test]
fn test_three_streams_need_all() {
    let mut sync =
        Synchronizer::new(SyncConfig::sequence_exact(["left", "right", "preview"])).unwrap();

    assert!(sync.ingest(create_packet("left", 3, 1000)).is_none());
    assert!(sync.ingest(create_packet("right", 3, 1000)).is_none());
    assert_eq!(sync.pending_len(), 1);

    let tuple = sync.ingest(create_packet("preview", 3, 1010)).unwrap();
    assert_complete(&[tuple], &["left", "right", "preview"]);
    assert_eq!(sync.pending_packets(), 0);
}

#[test]
fn test_unknown_stream_is_ignored() {
    let mut sync = stereo();

    sync.ingest(create_packet("left", 1, 1000));
    assert!(sync.ingest(create_packet("disparity", 1, 1000)).is_none());
    assert_eq!(sync.stats().ignored, 1);

    assert!(sync.ingest(create_packet("right", 1, 1000)).is_some());
}

#[test]
fn test_large_sequence_numbers_keep_apart() {
    let mut sync = stereo();

    assert!(sync.ingest(create_packet("left", u64::MAX, 1000)).is_none());
    assert!(sync.ingest(create_packet("right", 1 << 63, 1000)).is_none());
    assert_eq!(sync.pending_len(), 2);

    let tuple = sync.ingest(create_packet("right", u64::MAX, 1001)).unwrap();
    assert_eq!(tuple.key(), JoinKey::from(u64::MAX));
    assert_eq!(tuple[&"left"].sequence, u64::MAX);
    assert_eq!(tuple[&"right"].sequence, u64::MAX);
}
