use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Runtime metrics for one tee call.
///
/// A lightweight, read-only view over both legs of a tee. Obtain a handle
/// via `TeeStream::stats()`; both legs of the same tee return handles over
/// the same underlying counters. Values use relaxed atomics and are
/// intended for diagnostics.
#[cfg_attr(docsrs, doc(cfg(feature = "stats")))]
#[derive(Debug, Clone)]
pub struct TeeStats {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    forwarded: [AtomicU64; 2],
    suspensions: [AtomicU64; 2],
}

impl TeeStats {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(Inner::default()),
        }
    }

    pub(crate) fn record_forward(&self, leg: usize) {
        self.inner.forwarded[leg].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suspension(&self, leg: usize) {
        self.inner.suspensions[leg].fetch_add(1, Ordering::Relaxed);
    }

    /// Items forwarded so far on each leg, in construction order of the
    /// pair returned by `tee`.
    pub fn forwarded(&self) -> (u64, u64) {
        (
            self.inner.forwarded[0].load(Ordering::Relaxed),
            self.inner.forwarded[1].load(Ordering::Relaxed),
        )
    }

    /// Times each leg was parked at the lead bound.
    ///
    /// A suspension is counted once per held-back item, not once per poll,
    /// so re-polling a parked read does not inflate the count.
    pub fn suspensions(&self) -> (u64, u64) {
        (
            self.inner.suspensions[0].load(Ordering::Relaxed),
            self.inner.suspensions[1].load(Ordering::Relaxed),
        )
    }

    /// Current absolute difference between the two forwarded counts.
    pub fn difference(&self) -> u64 {
        let (first, second) = self.forwarded();
        first.abs_diff(second)
    }
}
