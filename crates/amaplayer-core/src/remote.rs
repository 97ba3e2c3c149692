//! Backend traits consumed by the engagement engine.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::error::Result;
use crate::types::{Actor, LikeMutation, LikeOutcome};

/// Persists a like/unlike and reports the authoritative state.
///
/// Implementations must treat a repeated mutation with the same
/// `idempotency_key` and `desired` state as a no-op that still returns the
/// current count.
#[async_trait]
pub trait LikeMutationClient: Send + Sync {
    async fn toggle_like(&self, mutation: &LikeMutation) -> Result<LikeOutcome>;
}

/// Supplies the currently signed-in user, if any.
pub trait IdentityProvider: Send + Sync {
    fn current_actor(&self) -> Option<Actor>;
}

/// Identity provider backed by a value the caller sets on sign-in/sign-out.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    actor: RwLock<Option<Actor>>,
}

impl StaticIdentity {
    pub fn new(actor: Actor) -> Self {
        Self {
            actor: RwLock::new(Some(actor)),
        }
    }

    /// An identity with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, actor: Actor) {
        if let Ok(mut guard) = self.actor.write() {
            *guard = Some(actor);
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.actor.write() {
            *guard = None;
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.read().ok().and_then(|guard| guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity_sign_in_out() {
        let identity = StaticIdentity::anonymous();
        assert!(identity.current_actor().is_none());

        identity.sign_in(Actor::new("user-1", "Sam").with_avatar("https://cdn/a.png"));
        let actor = identity.current_actor().unwrap();
        assert_eq!(actor.id, "user-1");
        assert_eq!(actor.avatar_url.as_deref(), Some("https://cdn/a.png"));

        identity.sign_out();
        assert!(identity.current_actor().is_none());
    }
}
