//! Debounce Coalescer
//!
//! Rapid toggles on the same entity collapse into one pending action: every
//! toggle cancels the entity's running timer and arms a new one, so only the
//! last intent inside the window reaches the queue.

use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;

use super::queue::QueuedAction;

/// Spawns debounce timers.
#[derive(Debug, Clone, Copy)]
pub struct Coalescer {
    window: Duration,
}

impl Coalescer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Run `on_elapsed` once the window has passed. Aborting the returned
    /// handle before then cancels it.
    pub fn start<Fut>(&self, on_elapsed: Fut) -> AbortHandle
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            on_elapsed.await;
        })
        .abort_handle()
    }
}

/// An armed timer holding the intent it will release.
#[derive(Debug)]
struct DebounceTimer {
    generation: u64,
    handle: AbortHandle,
    action: QueuedAction,
}

/// Per-entity timer bookkeeping.
///
/// Each timer carries a generation so that one which lost the race with its
/// own cancellation recognises that it is stale. Generations must be unique
/// across the slot's owner, not just within the slot.
#[derive(Debug, Default)]
pub(crate) struct DebounceSlot {
    current: Option<DebounceTimer>,
}

impl DebounceSlot {
    /// Cancel any armed timer and arm a new one created by `spawn`.
    pub fn rearm(&mut self, generation: u64, action: QueuedAction, spawn: impl FnOnce(u64) -> AbortHandle) {
        self.cancel();
        let handle = spawn(generation);
        self.current = Some(DebounceTimer {
            generation,
            handle,
            action,
        });
    }

    /// Release the action if `generation` is still the armed timer.
    pub fn elapse(&mut self, generation: u64) -> Option<QueuedAction> {
        let is_current = self
            .current
            .as_ref()
            .is_some_and(|timer| timer.generation == generation);
        if is_current {
            self.current.take().map(|timer| timer.action)
        } else {
            None
        }
    }

    /// Abort the armed timer, if any. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.current.is_some()
    }
}
