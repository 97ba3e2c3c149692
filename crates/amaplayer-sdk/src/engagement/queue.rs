//! Action Queue
//!
//! Holds at most one live action per entity and tracks each entity's phase:
//!
//! ```text
//! Idle -> Debouncing -> Pending -> InFlight -> Settled
//!                          ^          |
//!                          +-- retry -+-> Failed
//! ```
//!
//! Debounce timers live in the same slot as the pending action so that the
//! hand-off from timer to queue is atomic with respect to reconciliation.
//! A slot is dropped once its worker retires with nothing armed, pending or
//! failed, so untracked entities report [`ActionPhase::Idle`].

use amaplayer_core::{Actor, LikeIntent, LikeMutation};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use super::coalescer::DebounceSlot;
use crate::utils::{format_datetime, idempotency_key, now_utc};

/// A like/unlike waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedAction {
    pub entity_id: String,
    pub desired: LikeIntent,
    pub enqueued_at: DateTime<Utc>,
    pub attempt: u32,
    pub actor: Actor,
}

impl QueuedAction {
    pub fn new(entity_id: impl Into<String>, desired: LikeIntent, actor: Actor) -> Self {
        Self {
            entity_id: entity_id.into(),
            desired,
            enqueued_at: now_utc(),
            attempt: 0,
            actor,
        }
    }

    /// The same action, one attempt later.
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..self.clone()
        }
    }

    /// A fresh copy of the action for an explicit user retry.
    pub fn restart(self, actor: Actor) -> Self {
        Self::new(self.entity_id, self.desired, actor)
    }

    pub fn idempotency_key(&self) -> String {
        idempotency_key(
            &self.entity_id,
            &self.actor.id,
            &self.desired.to_string(),
            &format_datetime(&self.enqueued_at),
        )
    }

    pub fn to_mutation(&self) -> LikeMutation {
        LikeMutation {
            entity_id: self.entity_id.clone(),
            actor: self.actor.clone(),
            desired: self.desired,
            idempotency_key: self.idempotency_key(),
        }
    }
}

/// Where an entity is in the persistence cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPhase {
    #[default]
    Idle,
    /// Toggled; waiting for the debounce window to close.
    Debouncing,
    /// Queued for the worker (first attempt or retry backoff).
    Pending,
    InFlight,
    /// Last result applied; lasts until the worker retires.
    Settled,
    /// Retries exhausted; waiting for an explicit retry or dismissal.
    Failed,
}

/// Whether a settled remote result should be written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    Apply,
    /// A newer intent is queued and the result does not match it.
    Superseded,
}

#[derive(Debug, Default)]
struct EntitySlot {
    debounce: DebounceSlot,
    pending: Option<QueuedAction>,
    failed: Option<QueuedAction>,
    worker: Option<AbortHandle>,
    phase: ActionPhase,
}

impl EntitySlot {
    fn is_busy(&self) -> bool {
        self.debounce.is_armed() || self.pending.is_some() || self.worker.is_some()
    }

    /// Nothing left worth remembering.
    fn is_disposable(&self) -> bool {
        !self.is_busy() && self.failed.is_none()
    }

    fn push(&mut self, action: QueuedAction, spawn_worker: impl FnOnce() -> AbortHandle) {
        // Last write wins
        self.pending = Some(action);
        if self.worker.is_none() {
            self.worker = Some(spawn_worker());
            self.phase = ActionPhase::Pending;
        } else if self.phase != ActionPhase::InFlight {
            self.phase = ActionPhase::Pending;
        }
    }
}

/// Per-entity action slots.
#[derive(Debug, Default)]
pub struct ActionQueue {
    slots: Mutex<HashMap<String, EntitySlot>>,
    /// Timer generations, unique for the queue's lifetime
    generations: AtomicU64,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the debounce timer for the action's entity.
    ///
    /// Any queued action, including a retry waiting out its backoff, is
    /// dropped: the new intent replaces it. `spawn_timer` runs under the
    /// queue lock, so the timer cannot fire before it is registered.
    pub async fn arm(&self, action: QueuedAction, spawn_timer: impl FnOnce(u64) -> AbortHandle) -> u64 {
        let mut slots = self.slots.lock().await;
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let slot = slots.entry(action.entity_id.clone()).or_default();
        slot.pending = None;
        slot.failed = None;
        slot.phase = ActionPhase::Debouncing;
        slot.debounce.rearm(generation, action, spawn_timer);
        generation
    }

    /// Move a debounced action into the queue if its timer is still current.
    ///
    /// Starts a worker through `spawn_worker` when none is draining the entity.
    pub async fn release(
        &self,
        entity_id: &str,
        generation: u64,
        spawn_worker: impl FnOnce() -> AbortHandle,
    ) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(entity_id) else {
            return false;
        };
        let Some(action) = slot.debounce.elapse(generation) else {
            return false;
        };
        slot.push(action, spawn_worker);
        true
    }

    /// Queue an action directly, bypassing the debounce window.
    pub async fn enqueue(&self, action: QueuedAction, spawn_worker: impl FnOnce() -> AbortHandle) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(action.entity_id.clone()).or_default();
        slot.failed = None;
        slot.push(action, spawn_worker);
    }

    /// Next action for the entity's worker. `None` retires the worker.
    pub async fn next(&self, entity_id: &str) -> Option<QueuedAction> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(entity_id)?;
        if let Some(action) = slot.pending.take() {
            slot.phase = ActionPhase::InFlight;
            return Some(action);
        }
        slot.worker = None;
        if slot.is_disposable() {
            slots.remove(entity_id);
        }
        None
    }

    /// Put a failed action back for another attempt.
    ///
    /// Returns `false` (and drops the action) if a newer intent exists.
    pub async fn requeue(&self, action: QueuedAction) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(&action.entity_id) else {
            return false;
        };
        if slot.pending.is_some() || slot.debounce.is_armed() {
            return false;
        }
        slot.pending = Some(action);
        slot.phase = ActionPhase::Pending;
        true
    }

    /// Decide whether a successful remote result should be applied.
    ///
    /// A queued intent that the server already satisfies is dropped.
    pub async fn reconcile(&self, entity_id: &str, server_liked: bool) -> Reconcile {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(entity_id) else {
            return Reconcile::Superseded;
        };
        if slot.debounce.is_armed() {
            return Reconcile::Superseded;
        }
        match &slot.pending {
            Some(next) if next.desired.is_liked() != server_liked => Reconcile::Superseded,
            _ => {
                slot.pending = None;
                slot.phase = ActionPhase::Settled;
                Reconcile::Apply
            }
        }
    }

    /// Park an action whose retries are exhausted.
    ///
    /// Returns `false` if a newer intent makes the failure moot.
    pub async fn fail(&self, action: QueuedAction) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(&action.entity_id) else {
            return false;
        };
        if slot.pending.is_some() || slot.debounce.is_armed() {
            return false;
        }
        slot.failed = Some(action);
        slot.phase = ActionPhase::Failed;
        true
    }

    /// Remove and return every parked failure.
    pub async fn take_failed(&self) -> Vec<QueuedAction> {
        let mut slots = self.slots.lock().await;
        slots
            .values_mut()
            .filter_map(|slot| slot.failed.take())
            .collect()
    }

    /// Forget the entity's parked failure.
    pub async fn discard_failed(&self, entity_id: &str) -> bool {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(entity_id) else {
            return false;
        };
        if slot.phase == ActionPhase::Failed {
            slot.phase = ActionPhase::Idle;
        }
        let discarded = slot.failed.take().is_some();
        if slot.is_disposable() {
            slots.remove(entity_id);
        }
        discarded
    }

    /// Untracked entities are `Idle`.
    pub async fn phase(&self, entity_id: &str) -> ActionPhase {
        self.slots
            .lock()
            .await
            .get(entity_id)
            .map(|slot| slot.phase)
            .unwrap_or_default()
    }

    pub async fn is_busy(&self, entity_id: &str) -> bool {
        self.slots
            .lock()
            .await
            .get(entity_id)
            .is_some_and(EntitySlot::is_busy)
    }

    /// No timers armed, nothing pending, no worker running.
    pub async fn is_quiescent(&self) -> bool {
        !self.slots.lock().await.values().any(EntitySlot::is_busy)
    }

    /// Abort every timer and worker and drop all slots.
    pub async fn clear(&self) -> usize {
        let mut slots = self.slots.lock().await;
        let count = slots.len();
        for (_, mut slot) in slots.drain() {
            slot.debounce.cancel();
            if let Some(worker) = slot.worker.take() {
                worker.abort();
            }
        }
        count
    }
}
