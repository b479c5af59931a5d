// SPDX-License-Identifier: GPL-3.0-only

//! Producer-to-consumer wake delivery
//!
//! The capture callback thread must never run consumer work inline. Each
//! subscription is a single-slot channel written with `try_send`: a wake
//! that finds one already pending coalesces with it, and the pending wake
//! resolves to the newest frame when the consumer pulls. Delivery is
//! at-most-once informative, but a notify that finds no wake pending always
//! lands, so the consumer never permanently misses the latest publish.

use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tracing::debug;

/// Identifies one consumer subscription; at most one live wake target per id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(i64);

impl ConsumerId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ConsumerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routes "frame ready" wakes from the producer thread into each consumer's
/// own scheduling context
pub struct NotificationBridge {
    targets: Mutex<HashMap<ConsumerId, mpsc::Sender<ConsumerId>>>,
}

impl NotificationBridge {
    pub fn new() -> Self {
        Self {
            targets: Mutex::new(HashMap::new()),
        }
    }

    /// Register the wake target for `id`, replacing any prior one
    ///
    /// The prior target's stream terminates once its sender is dropped here.
    pub fn register(&self, id: ConsumerId) -> FrameReady {
        // Zero buffer: capacity is exactly one pending wake per sender.
        let (tx, rx) = mpsc::channel(0);
        if self.targets.lock().unwrap().insert(id, tx).is_some() {
            debug!(consumer = %id, "Replaced existing wake target");
        }
        FrameReady { id, rx }
    }

    /// Producer-side wake; O(1) and never blocks
    ///
    /// A wake already pending for `id` coalesces: the consumer's next pull
    /// observes the newest frame either way. Unknown ids are a no-op.
    pub fn notify(&self, id: ConsumerId) {
        if let Some(tx) = self.targets.lock().unwrap().get_mut(&id) {
            // Full means a wake is already pending; disconnected means the
            // consumer end is gone. Both are fine to drop.
            let _ = tx.try_send(id);
        }
    }

    /// Stop delivery for `id`; unknown ids are a no-op
    pub fn unregister(&self, id: ConsumerId) {
        if self.targets.lock().unwrap().remove(&id).is_some() {
            debug!(consumer = %id, "Unregistered wake target");
        }
    }

    /// Whether a wake target is currently registered for `id`
    pub fn is_registered(&self, id: ConsumerId) -> bool {
        self.targets.lock().unwrap().contains_key(&id)
    }
}

impl Default for NotificationBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer end of a wake subscription
///
/// Yields the consumer id once per (possibly coalesced) wake. Poll it from
/// the consumer's own executor; the producer side only ever does a
/// non-blocking send. After `unregister` or a replacing `register` the
/// stream terminates, so a wake consumed in flight resolves to nothing.
pub struct FrameReady {
    id: ConsumerId,
    rx: mpsc::Receiver<ConsumerId>,
}

impl FrameReady {
    pub fn consumer_id(&self) -> ConsumerId {
        self.id
    }

    /// Non-blocking check for a pending wake
    ///
    /// Returns false both when no wake is pending and when the subscription
    /// has been replaced or unregistered.
    pub fn try_ready(&mut self) -> bool {
        matches!(self.rx.try_next(), Ok(Some(_)))
    }
}

impl Stream for FrameReady {
    type Item = ConsumerId;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ConsumerId>> {
        self.rx.poll_next_unpin(cx)
    }
}
