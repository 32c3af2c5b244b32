//! Frame scheduling primitives
//!
//! The animation-frame table and the futures the main loop is built from.
//! The loop itself lives on [`Runtime`](crate::runtime::Runtime).

use futures::future::{FutureExt, LocalBoxFuture, RemoteHandle};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Future returned by an animation-frame callback
pub type FrameFuture = LocalBoxFuture<'static, ()>;

/// One-shot callback receiving the frame timestamp in milliseconds
pub type FrameCallback = Box<dyn FnOnce(f64) -> FrameFuture>;

/// Handle of a pending animation frame request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(u64);

impl FrameRequestId {
    /// Numeric value; the first request is 1
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Pending animation-frame callbacks keyed by increasing id
#[derive(Default)]
pub struct AnimationFrames {
    last_id: u64,
    pending: BTreeMap<FrameRequestId, FrameCallback>,
}

impl AnimationFrames {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a callback for the next tick
    pub fn request(&mut self, callback: FrameCallback) -> FrameRequestId {
        self.last_id += 1;
        let id = FrameRequestId(self.last_id);
        self.pending.insert(id, callback);
        id
    }

    /// Drop a pending callback; false when it already ran or never existed
    pub fn cancel(&mut self, id: FrameRequestId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Remove every pending callback, in request order
    ///
    /// Requests made while the batch runs land in the emptied table and
    /// wait for the following tick.
    pub fn take_batch(&mut self) -> Vec<FrameCallback> {
        std::mem::take(&mut self.pending).into_values().collect()
    }

    /// Pending callbacks
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// No pending callbacks
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl fmt::Debug for AnimationFrames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationFrames")
            .field("last_id", &self.last_id)
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Suspend once, letting other tasks on the same executor run
pub fn yield_now() -> YieldNow {
    YieldNow::default()
}

/// Future returned by [`yield_now`]
#[derive(Debug, Default)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

/// Completion signal of a chained main loop
///
/// Resolves once the loop has stopped and torn down. Dropping the handle
/// cancels the loop; call [`MainloopHandle::detach`] to let it run on
/// unobserved.
#[must_use = "dropping the handle cancels the main loop"]
pub struct MainloopHandle {
    inner: RemoteHandle<()>,
}

impl MainloopHandle {
    pub(crate) const fn new(inner: RemoteHandle<()>) -> Self {
        Self { inner }
    }

    /// Keep the loop running without waiting for it
    pub fn detach(self) {
        self.inner.forget();
    }
}

impl Future for MainloopHandle {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for MainloopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainloopHandle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<u32>>>, n: u32) -> FrameCallback {
        let log = Rc::clone(log);
        Box::new(move |_| {
            async move { log.borrow_mut().push(n) }.boxed_local()
        })
    }

    #[test]
    fn test_ids_increase_from_one() {
        let mut frames = AnimationFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let first = frames.request(recorder(&log, 1));
        let second = frames.request(recorder(&log, 2));

        assert_eq!(first.get(), 1);
        assert_eq!(second.get(), 2);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn test_batch_runs_in_request_order() {
        let mut frames = AnimationFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for n in 0..4 {
            frames.request(recorder(&log, n));
        }

        let batch = frames.take_batch();
        assert!(frames.is_empty());

        pollster::block_on(async {
            for callback in batch {
                callback(0.0).await;
            }
        });
        assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_cancel() {
        let mut frames = AnimationFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let id = frames.request(recorder(&log, 1));

        assert!(frames.cancel(id));
        assert!(!frames.cancel(id));
        assert!(frames.take_batch().is_empty());
    }

    #[test]
    fn test_ids_are_not_reused_after_drain() {
        let mut frames = AnimationFrames::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        frames.request(recorder(&log, 1));
        let _ = frames.take_batch();

        assert_eq!(frames.request(recorder(&log, 2)).get(), 2);
    }

    #[test]
    fn test_yield_now_completes_after_one_poll() {
        pollster::block_on(yield_now());
    }
}
