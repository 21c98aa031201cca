use futures_util::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

// --- Data Types ---

#[derive(Debug)]
pub struct HeavyPayload {
    pub _id: u64,
    pub _payload: [u8; 1024], // 1KB array
}
pub type ArcData = Arc<HeavyPayload>;

// --- Channel Fan-Out Baseline ---

// The usual hand-rolled alternative to a tee: a dedicated task copies the
// source into two buffered channels.
pub fn run_channel_fan_out<S>(mut source: S) -> (ReceiverStream<ArcData>, ReceiverStream<ArcData>)
where
    S: Stream<Item = ArcData> + Unpin + Send + 'static,
{
    let (tx_a, rx_a) = mpsc::channel(1024);
    let (tx_b, rx_b) = mpsc::channel(1024);

    tokio::spawn(async move {
        while let Some(item) = source.next().await {
            let _ = tx_a.send(item.clone()).await;
            let _ = tx_b.send(item).await;
        }
    });

    (ReceiverStream::new(rx_a), ReceiverStream::new(rx_b))
}

// --- Source Stream Generators ---

// Source A: In-Memory (Minimal Read Latency)
pub fn generate_in_memory_stream(
    count: u64,
) -> futures_util::stream::Iter<std::vec::IntoIter<ArcData>> {
    let data: Vec<ArcData> = (0..count)
        .map(|i| {
            Arc::new(HeavyPayload {
                _id: i,
                _payload: [0; 1024],
            })
        })
        .collect();
    futures_util::stream::iter(data)
}

// Source B: Simulated I/O (Introducing Context Switches)
pub struct SimulatedIoStream {
    data: Vec<ArcData>,
    index: usize,
}

impl Stream for SimulatedIoStream {
    type Item = ArcData;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.index >= self.data.len() {
            return Poll::Ready(None);
        }

        // Wake immediately but force a fresh poll loop per item, which
        // introduces context switching comparable to real I/O.
        cx.waker().wake_by_ref();

        let item = self.data[self.index].clone();
        self.index += 1;
        Poll::Ready(Some(item))
    }
}

pub fn generate_simulated_io_stream(count: u64) -> impl Stream<Item = ArcData> {
    let data: Vec<ArcData> = (0..count)
        .map(|i| {
            Arc::new(HeavyPayload {
                _id: i,
                _payload: [0; 1024],
            })
        })
        .collect();
    SimulatedIoStream { data, index: 0 }
}
