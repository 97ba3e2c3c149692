//! Optimistic engagement (likes)
//!
//! - **store**: per-entity like state read by the UI
//! - **coalescer**: per-entity debounce timers
//! - **queue**: one live action per entity, worker hand-off and phases
//! - **retry**: exponential backoff schedule
//! - **engine**: the public toggle/observe API over all of the above

mod coalescer;
mod engine;
mod queue;
mod retry;
mod store;

pub use coalescer::Coalescer;
pub use engine::EngagementEngine;
pub use queue::{ActionPhase, ActionQueue, QueuedAction, Reconcile};
pub use retry::RetryPolicy;
pub use store::{EngagementRecord, EngagementStore, RecordPatch};
