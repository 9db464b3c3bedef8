use crate::{
    config::SyncConfig,
    state::Synchronizer,
    types::{OutputStream, Packet, StreamId, SyncedTuple},
};
use eyre::Result;
use futures::{
    StreamExt,
    stream::{self, Stream},
};
use std::task::{Context, Poll, Poll::*};
use tracing::warn;

/// Consume a stream of packets from several sources and emit the
/// synced tuples in the order they complete.
///
/// An error from the input stream is forwarded once and ends the
/// output stream. When the input is depleted, incomplete tuples are
/// discarded.
pub fn sync<'a, S, P, I>(stream: I, config: SyncConfig<S>) -> Result<OutputStream<'a, S, P>>
where
    S: StreamId + 'a,
    P: Send + 'a,
    I: Stream<Item = Result<Packet<S, P>>> + Unpin + Send + 'a,
{
    let mut synchronizer = Synchronizer::new(config)?;

    let output_stream = {
        let mut stream = Some(stream);
        stream::poll_fn(move |ctx| poll(&mut stream, &mut synchronizer, ctx))
    };

    Ok(output_stream.boxed())
}

/// Pulls packets until one completes a tuple, the input fails or the
/// input is depleted.
fn poll<S, P, I>(
    input_stream: &mut Option<I>,
    synchronizer: &mut Synchronizer<S, P>,
    ctx: &mut Context<'_>,
) -> Poll<Option<Result<SyncedTuple<S, P>>>>
where
    S: StreamId,
    I: Stream<Item = Result<Packet<S, P>>> + Unpin,
{
    loop {
        let Some(input) = input_stream.as_mut() else {
            return Ready(None);
        };

        match input.poll_next_unpin(ctx) {
            Ready(Some(Ok(packet))) => {
                if let Some(tuple) = synchronizer.ingest(packet) {
                    return Ready(Some(Ok(tuple)));
                }
            }
            Ready(Some(Err(err))) => {
                *input_stream = None;
                return Ready(Some(Err(err)));
            }
            Ready(None) => {
                *input_stream = None;

                let pending = synchronizer.pending_packets();
                if pending > 0 {
                    warn!(pending, "input stream depleted, discard incomplete tuples");
                }
                synchronizer.clear();
                return Ready(None);
            }
            Pending => return Pending,
        }
    }
}
