//! Debounced recomputation of suggestions.
//!
//! Rapid edits (renaming a variable, toggling a demographic flag) would
//! otherwise trigger one suggestion run per keystroke. A [`Debouncer`]
//! collapses a burst of triggers into one call with the last arguments.
//!
//! Each fire carries a [`SequenceToken`]. A computation that finishes after
//! a newer trigger can check [`StalenessGuard::is_current`] and drop its
//! result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

/// Default quiet period before a debounced call fires.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Monotonically increasing id of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceToken(u64);

impl SequenceToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Answers whether a token still belongs to the latest trigger.
#[derive(Debug, Clone)]
pub struct StalenessGuard {
    latest: Arc<AtomicU64>,
}

impl StalenessGuard {
    pub fn is_current(&self, token: SequenceToken) -> bool {
        self.latest.load(Ordering::Acquire) == token.0
    }
}

type Callback<T> = Arc<dyn Fn(T, SequenceToken) + Send + Sync>;

/// Trailing-edge debouncer backed by tokio timers.
///
/// `trigger` must be called from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    latest: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    callback: Callback<T>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(
        delay: Duration,
        callback: impl Fn(T, SequenceToken) + Send + Sync + 'static,
    ) -> Self {
        Self::guarded(delay, |_| callback)
    }

    /// Build the callback around this debouncer's [`StalenessGuard`], for
    /// callers that check a fire against newer triggers before publishing.
    pub fn guarded<F>(delay: Duration, build: impl FnOnce(StalenessGuard) -> F) -> Self
    where
        F: Fn(T, SequenceToken) + Send + Sync + 'static,
    {
        let latest = Arc::new(AtomicU64::new(0));
        let callback = build(StalenessGuard {
            latest: Arc::clone(&latest),
        });
        Self {
            delay,
            latest,
            pending: Mutex::new(None),
            callback: Arc::new(callback),
        }
    }

    pub fn with_default_delay(
        callback: impl Fn(T, SequenceToken) + Send + Sync + 'static,
    ) -> Self {
        Self::new(DEFAULT_DEBOUNCE, callback)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a call with `args`, replacing any pending one.
    pub fn trigger(&self, args: T) -> SequenceToken {
        let token = SequenceToken(self.latest.fetch_add(1, Ordering::AcqRel) + 1);
        let callback = Arc::clone(&self.callback);
        let delay = self.delay;

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(token = token.0, "debounced call fired");
            callback(args, token);
        }));
        token
    }

    /// Drop the pending call, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn guard(&self) -> StalenessGuard {
        StalenessGuard {
            latest: Arc::clone(&self.latest),
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("latest", &self.latest.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let debouncer = Debouncer::with_default_delay(move |_: (), _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        debouncer.trigger(());
        assert!(debouncer.is_pending());
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_callback_sees_latest() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = Debouncer::guarded(Duration::from_millis(10), move |guard| {
            move |value: u32, token: SequenceToken| {
                sink.lock().unwrap().push((value, guard.is_current(token)));
            }
        });
        debouncer.trigger(1);
        debouncer.trigger(2);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(*seen.lock().unwrap(), [(2, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_tracks_latest() {
        let debouncer = Debouncer::new(Duration::from_millis(10), |_: u32, _| {});
        let guard = debouncer.guard();
        let first = debouncer.trigger(1);
        assert!(guard.is_current(first));
        let second = debouncer.trigger(2);
        assert!(second > first);
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
    }
}
