//! Tee an async [`Stream`] into two outputs whose consumers advance together.
//!
//! [`tee`] splits one stream of cloneable items into two independently
//! consumable output streams ("legs") that both yield every item in source
//! order, while bounding how many items one leg may run ahead of the other.
//! When a leg reaches the bound, its next read stays pending until the
//! sibling leg forwards an item, reaches end of stream, or is dropped.
//!
//! The splitting itself is done by the [`duplicate`] primitive in this
//! crate: lazy pulling, buffering for the lagging leg, and independent
//! cancellation all live there. [`tee`] adds only a coordination layer on
//! top (two shared counters and a pair of single-slot wake handles), so an
//! unbounded tee behaves exactly like the bare [`duplicate`] pair.
//!
//! # Examples
//!
//! ```
//! use stream_tee::tee;
//! use futures_util::stream;
//! use futures_util::StreamExt;
//!
//! # tokio_test::block_on(async {
//! let (a, b) = tee(stream::iter(vec!["x", "y", "z"]));
//!
//! // Both legs receive the full sequence, in order.
//! let (left, right) = tokio::join!(a.collect::<Vec<_>>(), b.collect::<Vec<_>>());
//! assert_eq!(left, vec!["x", "y", "z"]);
//! assert_eq!(right, vec!["x", "y", "z"]);
//! # });
//! ```
//!
//! With the default bound of one, a leg that tries to run ahead is held
//! back until its sibling catches up:
//!
//! ```
//! use stream_tee::tee;
//! use futures_util::stream;
//! use futures_util::{FutureExt, StreamExt};
//!
//! # tokio_test::block_on(async {
//! let (mut a, mut b) = tee(stream::iter(vec![1, 2, 3]));
//!
//! assert_eq!(a.next().await, Some(1));
//! // Reading 2 on `a` must wait until `b` has read 1.
//! assert!(a.next().now_or_never().is_none());
//! assert_eq!(b.next().await, Some(1));
//! assert_eq!(a.next().await, Some(2));
//! # });
//! ```
//!
//! # The lead bound
//!
//! [`TeeOptions::max_chunk_difference`] controls how many items one leg may
//! forward beyond the other. The enforced lead is
//! `max(max_chunk_difference, 1)`: forwarding an item is not transactional
//! across legs, so a leg is always observable one whole item ahead of its
//! sibling, and `0` therefore behaves exactly like `1` (strict
//! alternation). `f64::INFINITY` disables coordination entirely.
//!
//! # Termination and cancellation
//!
//! A leg that reaches end of stream, or is dropped, releases a sibling
//! parked at the bound; from then on the survivor runs unbounded. One slow
//! or abandoned consumer can therefore never leave the other leg suspended
//! forever. There are no timeouts: while both legs are live, a parked read
//! waits indefinitely for the sibling to move.
//!
//! # Errors from the source
//!
//! Construction validates its options synchronously and is the only
//! fallible surface; see [`TeeError`]. A fallible source is expressed the
//! usual way, as `Stream<Item = Result<T, E>>` with `E: Clone`. Error
//! items flow through both legs like any other item and are never swallowed
//! or retried.
//!
//! # Thread safety
//!
//! The legs are `Send` and `Sync` whenever the source and its items are,
//! and may be consumed from different tasks or threads. All shared state is
//! guarded by a mutex taken only for short check-and-update sections;
//! wakers are invoked after the guard is released.

#![cfg_attr(docsrs, feature(doc_cfg))]

mod dup;
mod error;
mod ext;
#[cfg(feature = "stats")]
mod stats;

pub use dup::{duplicate, DupStream};
pub use error::TeeError;
pub use ext::TeeStreamExt;
#[cfg(feature = "stats")]
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
pub use stats::TeeStats;

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use futures_util::stream::{FusedStream, Stream};
use tracing::{debug, trace};

/// Configuration for [`tee_with_options`].
///
/// The single knob is [`max_chunk_difference`](Self::max_chunk_difference):
/// how many items one leg may forward beyond the other before its reads are
/// held back. The option mirrors a "finite-or-infinite, non-negative
/// number" surface: `f64::INFINITY` disables coordination, fractional
/// values are truncated, and NaN or negative values are rejected at
/// construction, before any item flows.
///
/// The enforced lead is `max(max_chunk_difference, 1)`; see the
/// [crate docs](crate#the-lead-bound) for why `0` coincides with `1`.
/// The default is `1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeeOptions {
    /// Maximum number of items one leg may forward beyond the other.
    pub max_chunk_difference: f64,
}

impl Default for TeeOptions {
    fn default() -> Self {
        Self {
            max_chunk_difference: 1.0,
        }
    }
}

impl TeeOptions {
    /// Options with the default bound of one item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the bound.
    ///
    /// ```
    /// use stream_tee::TeeOptions;
    ///
    /// let options = TeeOptions::new().max_chunk_difference(16.0);
    /// assert_eq!(options.max_chunk_difference, 16.0);
    /// ```
    pub fn max_chunk_difference(mut self, value: f64) -> Self {
        self.max_chunk_difference = value;
        self
    }

    /// Options that disable coordination, degenerating to [`duplicate`].
    pub fn unbounded() -> Self {
        Self {
            max_chunk_difference: f64::INFINITY,
        }
    }

    /// Validates the options into the lead enforced at runtime; `None`
    /// means unbounded.
    fn max_lead(self) -> Result<Option<u64>, TeeError> {
        let value = self.max_chunk_difference;
        if value.is_nan() || value < 0.0 {
            return Err(TeeError::InvalidMaxChunkDifference(value));
        }
        if value >= u64::MAX as f64 {
            return Ok(None);
        }
        Ok(Some((value as u64).max(1)))
    }
}

/// Shared coordination state for one tee call, jointly owned by both legs.
///
/// The counters and wake slots are the only synchronization between the
/// legs. Every read-modify-write (check-then-increment, check-then-park,
/// take-then-wake) happens under a single mutex acquisition, and wakers are
/// invoked only after the guard is released.
#[derive(Debug)]
struct Coordinator {
    /// Enforced lead, fixed at construction. `None` disables coordination.
    max_lead: Option<u64>,
    state: Mutex<CoordState>,
    #[cfg(feature = "stats")]
    stats: TeeStats,
}

#[derive(Debug, Default)]
struct CoordState {
    /// Items fully forwarded per leg. Monotonic, +1 per forwarded item.
    forwarded: [u64; 2],
    /// At most one parked read per leg; a leg is polled sequentially, so a
    /// single slot suffices. Taken out of the slot before waking.
    wakers: [Option<Waker>; 2],
    /// Leg reached end of stream or was dropped. Once set, the sibling is
    /// never parked on this leg's account again.
    done: [bool; 2],
}

impl Coordinator {
    fn new(max_lead: Option<u64>) -> Self {
        Self {
            max_lead,
            state: Mutex::new(CoordState::default()),
            #[cfg(feature = "stats")]
            stats: TeeStats::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempts to admit one item for forwarding on `leg`.
    ///
    /// On success the leg's forwarded count is bumped and a parked sibling
    /// is released; the caller must then emit the item. On refusal the
    /// leg's waker is parked (overwriting a stale registration from an
    /// earlier poll of the same read) and the caller must hold the item.
    fn admit(&self, leg: usize, cx: &Context<'_>) -> bool {
        let sibling = 1 - leg;
        let to_wake = {
            let mut state = self.lock();
            if let Some(max_lead) = self.max_lead {
                let own_count = state.forwarded[leg];
                let sibling_count = state.forwarded[sibling];
                if !state.done[sibling] && own_count >= sibling_count.saturating_add(max_lead) {
                    trace!(leg, own_count, sibling_count, max_lead, "leg parked at lead bound");
                    state.wakers[leg] = Some(cx.waker().clone());
                    return false;
                }
            }
            state.forwarded[leg] += 1;
            state.wakers[sibling].take()
        };
        #[cfg(feature = "stats")]
        self.stats.record_forward(leg);
        if let Some(waker) = to_wake {
            trace!(leg, "releasing parked sibling");
            waker.wake();
        }
        true
    }

    /// Marks `leg` terminated (end of stream, or its handle was dropped)
    /// and releases a parked sibling, so a leg is never left suspended on a
    /// sibling that will not advance again.
    fn finish(&self, leg: usize) {
        let to_wake = {
            let mut state = self.lock();
            state.done[leg] = true;
            state.wakers[1 - leg].take()
        };
        if let Some(waker) = to_wake {
            trace!(leg, "leg finished, releasing parked sibling");
            waker.wake();
        }
    }
}

/// One output leg of [`tee`].
///
/// Yields every item of the source in source order. When this leg is the
/// configured number of items ahead of its sibling, `poll_next` returns
/// `Pending` until the sibling forwards an item, reaches end of stream, or
/// is dropped.
///
/// Dropping a leg releases the sibling from the bound; the survivor then
/// behaves like a bare [`DupStream`] half.
#[derive(Debug)]
pub struct TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    half: DupStream<S>,
    coordinator: Arc<Coordinator>,
    /// This leg's index into the coordinator arrays; the sibling is `1 - leg`.
    leg: usize,
    /// An item already pulled from the duplication half but refused at the
    /// lead bound; re-offered on the next poll.
    held: Option<S::Item>,
}

// `held` stores an item by value, but nothing ever pins into it.
impl<S> Unpin for TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
}

/// Splits `stream` into two coordinated outputs with the default bound of
/// one item.
///
/// Both outputs yield the full source sequence; neither may run more than
/// one item ahead of the other. See [`tee_with_options`] for other bounds.
///
/// # Examples
///
/// ```
/// use stream_tee::tee;
/// use futures_util::stream;
/// use futures_util::StreamExt;
///
/// # tokio_test::block_on(async {
/// let (a, b) = tee(stream::iter(vec![1, 2, 3]));
/// let (left, right) = tokio::join!(a.collect::<Vec<_>>(), b.collect::<Vec<_>>());
/// assert_eq!(left, right);
/// # });
/// ```
pub fn tee<S>(stream: S) -> (TeeStream<S>, TeeStream<S>)
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    tee_bounded(stream, Some(1))
}

/// Splits `stream` into two coordinated outputs with an explicit bound.
///
/// The options are validated synchronously; no item is pulled from the
/// source before validation passes, and nothing fails afterwards.
///
/// # Errors
///
/// [`TeeError::InvalidMaxChunkDifference`] when `max_chunk_difference` is
/// NaN or negative.
///
/// # Examples
///
/// ```
/// use stream_tee::{tee_with_options, TeeOptions};
/// use futures_util::stream;
/// use futures_util::StreamExt;
///
/// # tokio_test::block_on(async {
/// // Unbounded: one leg may be drained before the other is touched.
/// let (a, b) = tee_with_options(stream::iter(0..100), TeeOptions::unbounded()).unwrap();
/// assert_eq!(a.collect::<Vec<_>>().await.len(), 100);
/// assert_eq!(b.collect::<Vec<_>>().await.len(), 100);
/// # });
/// ```
pub fn tee_with_options<S>(
    stream: S,
    options: TeeOptions,
) -> Result<(TeeStream<S>, TeeStream<S>), TeeError>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    Ok(tee_bounded(stream, options.max_lead()?))
}

fn tee_bounded<S>(stream: S, max_lead: Option<u64>) -> (TeeStream<S>, TeeStream<S>)
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    debug!(?max_lead, "splitting stream into a coordinated pair");
    let coordinator = Arc::new(Coordinator::new(max_lead));
    let (first, second) = duplicate(stream);
    (
        TeeStream {
            half: first,
            coordinator: Arc::clone(&coordinator),
            leg: 0,
            held: None,
        },
        TeeStream {
            half: second,
            coordinator,
            leg: 1,
            held: None,
        },
    )
}

#[cfg(feature = "stats")]
impl<S> TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    /// Returns the diagnostics handle shared by both legs of this tee.
    #[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
    pub fn stats(&self) -> TeeStats {
        self.coordinator.stats.clone()
    }
}

impl<S> Stream for TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        // An item refused at the bound earlier is re-offered before a new
        // one is pulled, keeping the leg strictly sequential.
        if this.held.is_some() {
            if !this.coordinator.admit(this.leg, cx) {
                return Poll::Pending;
            }
            return Poll::Ready(this.held.take());
        }

        match Pin::new(&mut this.half).poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                this.coordinator.finish(this.leg);
                Poll::Ready(None)
            }
            Poll::Ready(Some(item)) => {
                if this.coordinator.admit(this.leg, cx) {
                    Poll::Ready(Some(item))
                } else {
                    #[cfg(feature = "stats")]
                    this.coordinator.stats.record_suspension(this.leg);
                    this.held = Some(item);
                    Poll::Pending
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.half.size_hint();
        let held = usize::from(self.held.is_some());
        (
            lower.saturating_add(held),
            upper.map(|upper| upper.saturating_add(held)),
        )
    }
}

impl<S> FusedStream for TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    fn is_terminated(&self) -> bool {
        self.held.is_none() && self.half.is_terminated()
    }
}

impl<S> Drop for TeeStream<S>
where
    S: Stream + Unpin,
    S::Item: Clone,
{
    fn drop(&mut self) {
        // A sibling parked at the bound must not be left suspended on a leg
        // that will never advance again.
        self.coordinator.finish(self.leg);
    }
}
