//! Engagement Engine
//!
//! Ties the store, coalescer, queue and retry policy together. A toggle is
//! applied to the store immediately, debounced per entity, then persisted by
//! a per-entity worker that runs at most one remote call at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use amaplayer_sdk::engagement::EngagementEngine;
//! use amaplayer_sdk::config::EngagementConfig;
//! use amaplayer_core::{Actor, LikeMutationClient, StaticIdentity};
//!
//! async fn example(remote: Arc<dyn LikeMutationClient>) -> amaplayer_sdk::SDKResult<()> {
//!     let identity = Arc::new(StaticIdentity::new(Actor::new("user-1", "Sam")));
//!     let engine = EngagementEngine::new(&EngagementConfig::default(), remote, identity);
//!
//!     let record = engine.toggle("post-1", false, 10).await?;
//!     assert!(record.liked && record.loading);
//!
//!     engine.wait_idle().await;
//!     Ok(())
//! }
//! ```

use amaplayer_core::{IdentityProvider, LikeIntent, LikeMutationClient, LikeOutcome};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use super::coalescer::Coalescer;
use super::queue::{ActionPhase, ActionQueue, QueuedAction, Reconcile};
use super::retry::RetryPolicy;
use super::store::{EngagementRecord, EngagementStore, RecordPatch};
use crate::config::EngagementConfig;
use crate::utils::validate_entity_id;
use crate::{SDKError, SDKResult};

/// Message stored on a record when a like could not be persisted.
fn failure_message(err: &SDKError) -> String {
    format!("Failed to update like: {}", err.cause())
}

struct Shared {
    store: EngagementStore,
    queue: ActionQueue,
    coalescer: Coalescer,
    retry: RetryPolicy,
    remote: Arc<dyn LikeMutationClient>,
    identity: Arc<dyn IdentityProvider>,
    /// Serializes state transitions (toggle, settle, fail, retry, dispose)
    operation_lock: Mutex<()>,
    idle: Notify,
}

impl Shared {
    async fn debounce_elapsed(self: Arc<Self>, entity_id: String, generation: u64) {
        let worker = Arc::clone(&self);
        let worker_entity = entity_id.clone();
        let released = self
            .queue
            .release(&entity_id, generation, move || Self::spawn_worker(worker, worker_entity))
            .await;
        if released {
            debug!(entity_id = %entity_id, "Debounce window closed, action queued");
        }
    }

    fn spawn_worker(shared: Arc<Self>, entity_id: String) -> AbortHandle {
        tokio::spawn(async move { shared.drain(entity_id).await }).abort_handle()
    }

    /// Process the entity's queue until it is empty.
    async fn drain(&self, entity_id: String) {
        while let Some(action) = self.queue.next(&entity_id).await {
            self.process(action).await;
        }
        self.idle.notify_waiters();
    }

    async fn process(&self, action: QueuedAction) {
        let mutation = action.to_mutation();
        debug!(
            entity_id = %action.entity_id,
            desired = %action.desired,
            attempt = action.attempt + 1,
            "Sending like mutation"
        );

        let failure = match self.remote.toggle_like(&mutation).await {
            Ok(outcome) => return self.settle(&action, outcome).await,
            Err(err) => SDKError::from_remote(err),
        };

        if !failure.is_transient() {
            return self.fail(action, failure).await;
        }

        let Some(delay) = self.retry.next_delay(action.attempt) else {
            let exhausted = SDKError::exhausted(action.attempt + 1, failure.cause());
            return self.fail(action, exhausted).await;
        };

        warn!(
            entity_id = %action.entity_id,
            attempt = action.attempt + 1,
            max_attempts = self.retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Like mutation failed, retrying"
        );
        let entity_id = action.entity_id.clone();
        if self.queue.requeue(action.next_attempt()).await {
            tokio::time::sleep(delay).await;
        } else {
            debug!(entity_id = %entity_id, "Retry dropped for newer toggle");
        }
    }

    async fn settle(&self, action: &QueuedAction, outcome: LikeOutcome) {
        let _op = self.operation_lock.lock().await;
        match self.queue.reconcile(&action.entity_id, outcome.liked).await {
            Reconcile::Apply => {
                let record = self
                    .store
                    .update(&action.entity_id, RecordPatch::settled(outcome.liked, outcome.count()))
                    .await;
                if action.attempt > 0 {
                    info!(
                        entity_id = %record.entity_id,
                        attempt = action.attempt + 1,
                        "Like mutation succeeded after retry"
                    );
                }
                debug!(
                    entity_id = %record.entity_id,
                    liked = record.liked,
                    count = record.count,
                    "Like settled"
                );
            }
            Reconcile::Superseded => {
                debug!(entity_id = %action.entity_id, "Remote result superseded by newer toggle");
            }
        }
    }

    async fn fail(&self, action: QueuedAction, failure: SDKError) {
        let _op = self.operation_lock.lock().await;
        let entity_id = action.entity_id.clone();
        if self.queue.fail(action).await {
            self.store
                .update(&entity_id, RecordPatch::failed(failure_message(&failure)))
                .await;
            error!(entity_id = %entity_id, error = %failure, "Like mutation failed");
        } else {
            debug!(entity_id = %entity_id, error = %failure, "Failure superseded by newer toggle");
        }
    }
}

/// Optimistic like engine for one application context.
///
/// Cloning shares the same state; construct a new engine for an isolated one.
#[derive(Clone)]
pub struct EngagementEngine {
    shared: Arc<Shared>,
}

impl EngagementEngine {
    pub fn new(
        config: &EngagementConfig,
        remote: Arc<dyn LikeMutationClient>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: EngagementStore::new(),
                queue: ActionQueue::new(),
                coalescer: Coalescer::new(config.debounce_window()),
                retry: RetryPolicy::from_config(config),
                remote,
                identity,
                operation_lock: Mutex::new(()),
                idle: Notify::new(),
            }),
        }
    }

    /// Flip the like state for an entity and schedule persistence.
    ///
    /// `current_liked` and `current_count` seed the record only if the entity
    /// is not tracked yet. Returns the optimistic record.
    pub async fn toggle(
        &self,
        entity_id: &str,
        current_liked: bool,
        current_count: u64,
    ) -> SDKResult<EngagementRecord> {
        validate_entity_id(entity_id)?;
        let _op = self.shared.operation_lock.lock().await;
        self.shared.store.init(entity_id, current_liked, current_count).await;

        let Some(actor) = self.shared.identity.current_actor() else {
            let err = SDKError::NotAuthenticated;
            warn!(entity_id = %entity_id, "Like rejected: no signed-in user");
            self.shared
                .store
                .update(entity_id, RecordPatch::failed(failure_message(&err)))
                .await;
            return Err(err);
        };

        let record = self.shared.store.apply_optimistic(entity_id).await;
        let action = QueuedAction::new(entity_id, LikeIntent::from_liked(record.liked), actor);

        let shared = Arc::clone(&self.shared);
        let timer_entity = entity_id.to_string();
        let coalescer = self.shared.coalescer;
        self.shared
            .queue
            .arm(action, move |generation| {
                coalescer.start(shared.debounce_elapsed(timer_entity, generation))
            })
            .await;

        debug!(
            entity_id = %entity_id,
            liked = record.liked,
            count = record.count,
            "Optimistic like applied"
        );
        Ok(record)
    }

    /// Seed an entity's state. Existing state is never overwritten.
    pub async fn init_state(&self, entity_id: &str, liked: bool, count: u64) -> bool {
        self.shared.store.init(entity_id, liked, count).await
    }

    /// Current record, or a zero record for an untracked entity.
    pub async fn get_state(&self, entity_id: &str) -> EngagementRecord {
        self.shared.store.get(entity_id).await
    }

    pub async fn is_loading(&self, entity_id: &str) -> bool {
        self.shared.store.get(entity_id).await.loading
    }

    pub async fn get_error(&self, entity_id: &str) -> Option<String> {
        self.shared.store.get(entity_id).await.error
    }

    /// Records currently carrying an error.
    pub async fn errors(&self) -> Vec<EngagementRecord> {
        self.shared.store.entries_with_errors().await
    }

    /// Dismiss an entity's error. A parked failed action is dropped with it.
    pub async fn clear_error(&self, entity_id: &str) {
        let _op = self.shared.operation_lock.lock().await;
        self.shared.store.update(entity_id, RecordPatch::clear_error()).await;
        self.shared.queue.discard_failed(entity_id).await;
    }

    /// Re-enqueue every failed action with a fresh retry budget.
    ///
    /// Returns the number of actions re-enqueued.
    pub async fn retry_failed(&self) -> SDKResult<usize> {
        let _op = self.shared.operation_lock.lock().await;
        let actor = self
            .shared
            .identity
            .current_actor()
            .ok_or(SDKError::NotAuthenticated)?;

        let failed = self.shared.queue.take_failed().await;
        let count = failed.len();
        for action in failed {
            let action = action.restart(actor.clone());
            self.shared.store.update(&action.entity_id, RecordPatch::retrying()).await;

            let shared = Arc::clone(&self.shared);
            let worker_entity = action.entity_id.clone();
            self.shared
                .queue
                .enqueue(action, move || Shared::spawn_worker(shared, worker_entity))
                .await;
        }

        if count > 0 {
            info!(count, "Retrying failed like mutations");
        }
        Ok(count)
    }

    pub async fn phase(&self, entity_id: &str) -> ActionPhase {
        self.shared.queue.phase(entity_id).await
    }

    /// All tracked records, sorted by entity id.
    pub async fn snapshot(&self) -> Vec<EngagementRecord> {
        self.shared.store.snapshot().await
    }

    /// Resolve once no timer is armed, nothing is queued and no worker runs.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.shared.queue.is_quiescent().await {
                return;
            }
            notified.await;
        }
    }

    /// Cancel all timers and workers and forget every record.
    pub async fn dispose(&self) {
        let _op = self.shared.operation_lock.lock().await;
        let entities = self.shared.queue.clear().await;
        self.shared.store.clear().await;
        self.shared.idle.notify_waiters();
        info!(entities, "Engagement engine disposed");
    }
}
