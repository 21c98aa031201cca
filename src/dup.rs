//! The duplication primitive: split one stream into exactly two outputs.
//!
//! [`duplicate`] is the layer below [`tee`](crate::tee). It hands out two
//! halves that each see every item of the source in order, pulls from the
//! source lazily (only when a half is polled), and buffers internally for
//! whichever half lags. It applies no coordination between the halves; that
//! is the job of [`TeeStream`](crate::TeeStream), and an unbounded tee
//! behaves exactly like the bare pair returned here.
//!
//! Internally, each pull of the source is wrapped in a [`Shared`] future.
//! Both halves poll the same shared pull; whichever is polled first drives
//! the source, and the resolved item is cloned out to the other. Resolving
//! one pull produces the shared pull for the item after it, forming a
//! chain. A lagging half keeps the earlier links of that chain alive, which
//! is where its buffering lives; once both halves have moved past a link it
//! is dropped, so memory is bounded by how far the halves drift apart.

use futures_util::future::{FutureExt, Shared};
use futures_util::stream::{FusedStream, Stream, StreamExt, StreamFuture};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

type SizeHint = (usize, Option<usize>);

/// One pull of the source, shareable between the two halves.
///
/// Resolves to the pulled item together with the shared pull for the item
/// after it, or to `None` once the source is exhausted.
#[cfg_attr(test, derive(Debug))]
struct NextItem<S>
where
    S: Stream + Unpin,
{
    pull: Option<StreamFuture<S>>,
}

impl<S> NextItem<S>
where
    S: Stream + Unpin,
{
    fn new(stream: S) -> Self {
        Self {
            pull: Some(stream.into_future()),
        }
    }
}

impl<S> Future for NextItem<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    type Output = Option<(S::Item, Shared<NextItem<S>>, SizeHint)>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let pull = match self.pull.as_mut() {
            Some(f) => Pin::new(f),
            None => return Poll::Ready(None),
        };

        match pull.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready((Some(item), stream)) => {
                // The source travels inside the resolved pull; wrap it into
                // the next link before handing the item out.
                let size_hint = stream.size_hint();
                let next = NextItem::new(stream).shared();
                self.pull.take();
                Poll::Ready(Some((item, next, size_hint)))
            }
            Poll::Ready((None, _stream)) => {
                self.pull.take();
                Poll::Ready(None)
            }
        }
    }
}

/// One of the two outputs produced by [`duplicate`].
///
/// Each half yields every item of the source in source order, no matter how
/// fast or slow the other half is consumed. Dropping a half releases its
/// view of the internal buffer and leaves the other half unaffected.
///
/// `DupStream` does not implement [`Clone`]: the pair returned by
/// [`duplicate`] is the complete set of outputs, and the source can no
/// longer be read any other way.
#[derive(Debug)]
pub struct DupStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    chain: Option<Shared<NextItem<S>>>,
    size_hint: SizeHint,
}

/// Splits `stream` into two independent halves that each yield every item.
///
/// The source is consumed by value; after this call the returned halves are
/// the only way to read it. The source is polled lazily, driven by
/// whichever half is polled first for a given item.
///
/// # Examples
///
/// ```
/// use stream_tee::duplicate;
/// use futures_util::stream;
/// use futures_util::StreamExt;
///
/// # tokio_test::block_on(async {
/// let (a, b) = duplicate(stream::iter(vec![1, 2, 3]));
///
/// // The halves are fully independent: one may be drained before the
/// // other is touched.
/// assert_eq!(a.collect::<Vec<_>>().await, vec![1, 2, 3]);
/// assert_eq!(b.collect::<Vec<_>>().await, vec![1, 2, 3]);
/// # });
/// ```
pub fn duplicate<S>(stream: S) -> (DupStream<S>, DupStream<S>)
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    let size_hint = stream.size_hint();
    let chain = NextItem::new(stream).shared();
    (
        DupStream {
            chain: Some(chain.clone()),
            size_hint,
        },
        DupStream {
            chain: Some(chain),
            size_hint,
        },
    )
}

impl<S> Stream for DupStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    type Item = S::Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = match &mut self.chain {
            Some(link) => Pin::new(link).poll(cx),
            None => return Poll::Ready(None),
        };

        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some((item, next, size_hint))) => {
                // Advance past the resolved link; the sibling half may
                // still hold it.
                self.chain = Some(next);
                self.size_hint = size_hint;
                Poll::Ready(Some(item))
            }
            Poll::Ready(None) => {
                self.chain.take();
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.size_hint
    }
}

impl<S> FusedStream for DupStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    fn is_terminated(&self) -> bool {
        self.chain.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn test_both_halves_receive_every_item() {
        let data = vec![1, 2, 3, 4, 5];
        let (a, b) = duplicate(stream::iter(data.clone()));

        let (left, right) = tokio::join!(a.collect::<Vec<i32>>(), b.collect::<Vec<i32>>());

        assert_eq!(left, data);
        assert_eq!(right, data);
    }

    #[tokio::test]
    async fn test_lagging_half_replays_buffered_items() {
        let data = vec![10, 20, 30];
        let (a, b) = duplicate(stream::iter(data.clone()));

        // Drain one half completely before the other is polled at all; the
        // chain must retain every item for the laggard.
        assert_eq!(a.collect::<Vec<i32>>().await, data);
        assert_eq!(b.collect::<Vec<i32>>().await, data);
    }

    #[tokio::test]
    async fn test_dropping_one_half_does_not_starve_the_other() {
        let data = vec![1, 2, 3];
        let (a, mut b) = duplicate(stream::iter(data.clone()));

        assert_eq!(b.next().await, Some(1));
        drop(a);

        assert_eq!(b.next().await, Some(2));
        assert_eq!(b.next().await, Some(3));
        assert_eq!(b.next().await, None);
    }

    #[tokio::test]
    async fn test_empty_source_ends_both_halves_immediately() {
        let (mut a, mut b) = duplicate(stream::iter(Vec::<i32>::new()));

        assert_eq!(a.size_hint(), (0, Some(0)));
        assert_eq!(b.size_hint(), (0, Some(0)));

        assert_eq!(a.next().await, None);
        assert_eq!(b.next().await, None);
        assert!(a.is_terminated());
        assert!(b.is_terminated());
    }

    #[tokio::test]
    async fn test_size_hint_tracks_consumption_per_half() {
        let (mut a, b) = duplicate(stream::iter(vec![1, 2, 3]));

        assert_eq!(a.size_hint(), (3, Some(3)));
        assert_eq!(a.next().await, Some(1));
        assert_eq!(a.size_hint(), (2, Some(2)));

        // The untouched half still advertises the full source.
        assert_eq!(b.size_hint(), (3, Some(3)));
    }

    #[tokio::test]
    async fn test_half_is_fused_after_exhaustion() {
        let (mut a, _b) = duplicate(stream::iter(vec![7]));

        assert!(!a.is_terminated());
        assert_eq!(a.next().await, Some(7));
        assert_eq!(a.next().await, None);
        assert!(a.is_terminated());
        assert_eq!(a.next().await, None);
    }

    #[tokio::test]
    async fn test_pending_source_propagates_through_both_halves() {
        use std::sync::{Arc, Mutex};

        // Returns Pending exactly once to exercise that code path.
        struct PendingOnce {
            items: Vec<i32>,
            index: usize,
            yielded_pending: Arc<Mutex<bool>>,
        }

        impl Stream for PendingOnce {
            type Item = i32;

            fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
                let this = self.get_mut();
                let mut yielded = this.yielded_pending.lock().unwrap();
                if !*yielded {
                    *yielded = true;
                    cx.waker().wake_by_ref();
                    return Poll::Pending;
                }
                if this.index < this.items.len() {
                    let item = this.items[this.index];
                    this.index += 1;
                    Poll::Ready(Some(item))
                } else {
                    Poll::Ready(None)
                }
            }
        }

        let yielded_pending = Arc::new(Mutex::new(false));
        let source = PendingOnce {
            items: vec![100, 200],
            index: 0,
            yielded_pending: Arc::clone(&yielded_pending),
        };

        let (a, b) = duplicate(Box::pin(source));
        let (left, right) = tokio::join!(a.collect::<Vec<i32>>(), b.collect::<Vec<i32>>());

        assert_eq!(left, vec![100, 200]);
        assert_eq!(right, vec![100, 200]);
        assert!(*yielded_pending.lock().unwrap());
    }

    #[test]
    fn test_send_sync_and_not_clone() {
        type Half = DupStream<futures_util::stream::Iter<std::vec::IntoIter<i32>>>;

        static_assertions::assert_impl_all!(Half: Send, Sync, Unpin);
        static_assertions::assert_not_impl_any!(Half: Clone);
    }
}
