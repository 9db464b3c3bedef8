use framesync_core::{Packet, SyncConfig, sync};
use futures::{
    stream,
    stream::{StreamExt, TryStreamExt},
};
use std::time::Duration;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let left_ts = &[1001, 1034, 1067];
    let right_ts = &[1002, 1035, 1068];
    let preview_ts = &[998, 1040, 1090];

    macro_rules! make_stream {
        ($name:expr, $seq:expr) => {{
            stream::iter($seq.iter().enumerate().map(|(index, &ts)| {
                Packet::new($name, index as u64, Duration::from_millis(ts), ())
            }))
        }};
    }

    // Merge the three camera streams into one, where each packet is
    // identified by its stream name.
    let join_stream = stream::select(
        stream::select(make_stream!("left", left_ts), make_stream!("right", right_ts)),
        make_stream!("preview", preview_ts),
    )
    .map(eyre::Ok);

    // Collect triples whose packets lie within 20ms of the left frame.
    let config = SyncConfig::threshold_window(
        ["left", "right", "preview"],
        "left",
        Duration::from_millis(20),
    );
    let tuples: Vec<_> = sync(join_stream, config)?.try_collect().await?;

    for tuple in &tuples {
        println!("{} packets spanning {:?}", tuple.len(), tuple.span());
    }

    Ok(())
}
