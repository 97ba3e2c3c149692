//! Friend request lifecycle.
//!
//! Every request row carries both the sender and the receiver, so the
//! viewer's role is always derived from ids rather than guessed. Destructive
//! actions (cancel, reject, unfriend) go through a caller-supplied
//! [`Confirmation`] so UI dialogs stay outside this module.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use amaplayer_core::connections::{AutoConfirm, ConnectionRepository, ConnectionService};
//!
//! async fn example(repo: Arc<dyn ConnectionRepository>) -> amaplayer_core::Result<()> {
//!     let service = ConnectionService::new(repo, Arc::new(AutoConfirm));
//!     let request = service.send_request("alice", "bob").await?;
//!     service.accept("bob", &request.id).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{ensure_valid_id, FriendRequest, FriendRequestStatus, NewFriendRequest, RequestDirection};

// ─────────────────────────────────────────────────────────────────────────────
// Collaborators
// ─────────────────────────────────────────────────────────────────────────────

/// Persistence for friend requests.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn create_request(&self, request: &NewFriendRequest) -> Result<FriendRequest>;

    async fn get_request(&self, request_id: &str) -> Result<Option<FriendRequest>>;

    async fn update_status(&self, request_id: &str, status: FriendRequestStatus) -> Result<FriendRequest>;

    async fn delete_request(&self, request_id: &str) -> Result<()>;

    /// All requests where the user is either sender or receiver.
    async fn requests_for(&self, user_id: &str) -> Result<Vec<FriendRequest>>;
}

/// A destructive action that needs the user's go-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmPrompt {
    CancelRequest,
    RejectRequest,
    RemoveFriend,
}

impl ConfirmPrompt {
    pub fn message(&self) -> &'static str {
        match self {
            Self::CancelRequest => "Cancel this friend request?",
            Self::RejectRequest => "Reject this friend request?",
            Self::RemoveFriend => "Remove this friend?",
        }
    }
}

/// Caller-supplied confirmation capability (dialog, CLI prompt, policy...).
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, prompt: ConfirmPrompt) -> bool;
}

/// Confirms everything. For non-interactive callers such as admin tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

#[async_trait]
impl Confirmation for AutoConfirm {
    async fn confirm(&self, _prompt: ConfirmPrompt) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

/// Friend request workflow with role checks.
pub struct ConnectionService {
    repo: Arc<dyn ConnectionRepository>,
    confirmation: Arc<dyn Confirmation>,
}

impl ConnectionService {
    pub fn new(repo: Arc<dyn ConnectionRepository>, confirmation: Arc<dyn Confirmation>) -> Self {
        Self { repo, confirmation }
    }

    /// Send a friend request from `viewer_id` to `target_id`.
    pub async fn send_request(&self, viewer_id: &str, target_id: &str) -> Result<FriendRequest> {
        ensure_valid_id(viewer_id)?;
        ensure_valid_id(target_id)?;
        if viewer_id == target_id {
            return Err(Error::invalid_operation("cannot send a friend request to yourself"));
        }

        let existing = self.repo.requests_for(viewer_id).await?;
        let open = existing.iter().find(|r| {
            r.involves(viewer_id, target_id)
                && matches!(r.status, FriendRequestStatus::Pending | FriendRequestStatus::Accepted)
        });
        if let Some(open) = open {
            return Err(Error::invalid_operation(format!(
                "a {} request already exists between these users ({})",
                open.status, open.id
            )));
        }

        let request = self
            .repo
            .create_request(&NewFriendRequest {
                sender_id: viewer_id.to_string(),
                receiver_id: target_id.to_string(),
            })
            .await?;

        info!(request_id = %request.id, sender = %viewer_id, receiver = %target_id, "Friend request sent");
        Ok(request)
    }

    /// Accept an incoming request.
    pub async fn accept(&self, viewer_id: &str, request_id: &str) -> Result<FriendRequest> {
        let request = self.load(viewer_id, request_id).await?;
        Self::require_pending(&request)?;
        Self::require_direction(&request, viewer_id, RequestDirection::Incoming)?;

        let updated = self.repo.update_status(request_id, FriendRequestStatus::Accepted).await?;
        info!(request_id = %request_id, viewer = %viewer_id, "Friend request accepted");
        Ok(updated)
    }

    /// Reject an incoming request. Returns `Ok(false)` when the user declines.
    pub async fn reject(&self, viewer_id: &str, request_id: &str) -> Result<bool> {
        let request = self.load(viewer_id, request_id).await?;
        Self::require_pending(&request)?;
        Self::require_direction(&request, viewer_id, RequestDirection::Incoming)?;

        if !self.confirmation.confirm(ConfirmPrompt::RejectRequest).await {
            debug!(request_id = %request_id, "Reject declined by user");
            return Ok(false);
        }

        self.repo.update_status(request_id, FriendRequestStatus::Rejected).await?;
        info!(request_id = %request_id, viewer = %viewer_id, "Friend request rejected");
        Ok(true)
    }

    /// Cancel an outgoing request. Returns `Ok(false)` when the user declines.
    pub async fn cancel(&self, viewer_id: &str, request_id: &str) -> Result<bool> {
        let request = self.load(viewer_id, request_id).await?;
        Self::require_pending(&request)?;
        Self::require_direction(&request, viewer_id, RequestDirection::Outgoing)?;

        if !self.confirmation.confirm(ConfirmPrompt::CancelRequest).await {
            debug!(request_id = %request_id, "Cancel declined by user");
            return Ok(false);
        }

        self.repo.update_status(request_id, FriendRequestStatus::Cancelled).await?;
        info!(request_id = %request_id, viewer = %viewer_id, "Friend request cancelled");
        Ok(true)
    }

    /// Remove an accepted friendship. Either party may do this.
    pub async fn remove_friend(&self, viewer_id: &str, request_id: &str) -> Result<bool> {
        let request = self.load(viewer_id, request_id).await?;
        if request.status != FriendRequestStatus::Accepted {
            return Err(Error::invalid_operation(format!(
                "request {} is {}, not accepted",
                request_id, request.status
            )));
        }
        let Some(friend) = request.counterpart(viewer_id) else {
            return Err(Error::PermissionDenied(format!(
                "{} is not part of friendship {}",
                viewer_id, request_id
            )));
        };

        if !self.confirmation.confirm(ConfirmPrompt::RemoveFriend).await {
            return Ok(false);
        }

        self.repo.delete_request(request_id).await?;
        info!(request_id = %request_id, viewer = %viewer_id, friend = %friend, "Friendship removed");
        Ok(true)
    }

    /// Pending requests the viewer has received.
    pub async fn incoming(&self, viewer_id: &str) -> Result<Vec<FriendRequest>> {
        self.pending_in_direction(viewer_id, RequestDirection::Incoming).await
    }

    /// Pending requests the viewer has sent.
    pub async fn outgoing(&self, viewer_id: &str) -> Result<Vec<FriendRequest>> {
        self.pending_in_direction(viewer_id, RequestDirection::Outgoing).await
    }

    async fn pending_in_direction(&self, viewer_id: &str, direction: RequestDirection) -> Result<Vec<FriendRequest>> {
        ensure_valid_id(viewer_id)?;
        let mut requests: Vec<FriendRequest> = self
            .repo
            .requests_for(viewer_id)
            .await?
            .into_iter()
            .filter(|r| r.is_pending() && r.direction_for(viewer_id) == direction)
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Fetch a request on behalf of `viewer_id`.
    async fn load(&self, viewer_id: &str, request_id: &str) -> Result<FriendRequest> {
        ensure_valid_id(viewer_id)?;
        ensure_valid_id(request_id)?;
        self.repo
            .get_request(request_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("friend request {}", request_id)))
    }

    fn require_pending(request: &FriendRequest) -> Result<()> {
        if request.is_pending() {
            Ok(())
        } else {
            Err(Error::invalid_operation(format!(
                "request {} is already {}",
                request.id, request.status
            )))
        }
    }

    fn require_direction(request: &FriendRequest, viewer_id: &str, expected: RequestDirection) -> Result<()> {
        let actual = request.direction_for(viewer_id);
        if actual == expected {
            return Ok(());
        }
        let role = match expected {
            RequestDirection::Incoming => "receiver",
            _ => "sender",
        };
        Err(Error::PermissionDenied(format!(
            "only the {} of request {} can do this",
            role, request.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct InMemoryRepo {
        rows: Mutex<HashMap<String, FriendRequest>>,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl ConnectionRepository for InMemoryRepo {
        async fn create_request(&self, request: &NewFriendRequest) -> Result<FriendRequest> {
            let mut rows = self.rows.lock().await;
            let row = FriendRequest {
                id: uuid::Uuid::new_v4().to_string(),
                sender_id: request.sender_id.clone(),
                receiver_id: request.receiver_id.clone(),
                status: FriendRequestStatus::Pending,
                created_at: Utc::now() + Duration::seconds(rows.len() as i64),
                updated_at: None,
            };
            rows.insert(row.id.clone(), row.clone());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(row)
        }

        async fn get_request(&self, request_id: &str) -> Result<Option<FriendRequest>> {
            Ok(self.rows.lock().await.get(request_id).cloned())
        }

        async fn update_status(&self, request_id: &str, status: FriendRequestStatus) -> Result<FriendRequest> {
            let mut rows = self.rows.lock().await;
            let row = rows
                .get_mut(request_id)
                .ok_or_else(|| Error::NotFound(request_id.to_string()))?;
            row.status = status;
            row.updated_at = Some(Utc::now());
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(row.clone())
        }

        async fn delete_request(&self, request_id: &str) -> Result<()> {
            self.rows.lock().await.remove(request_id);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn requests_for(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
            Ok(self
                .rows
                .lock()
                .await
                .values()
                .filter(|r| r.sender_id == user_id || r.receiver_id == user_id)
                .cloned()
                .collect())
        }
    }

    struct Decline;

    #[async_trait]
    impl Confirmation for Decline {
        async fn confirm(&self, _prompt: ConfirmPrompt) -> bool {
            false
        }
    }

    fn service(confirm: Arc<dyn Confirmation>) -> (ConnectionService, Arc<InMemoryRepo>) {
        let repo = Arc::new(InMemoryRepo::default());
        (ConnectionService::new(repo.clone(), confirm), repo)
    }

    #[tokio::test]
    async fn test_send_and_accept() {
        let (svc, _repo) = service(Arc::new(AutoConfirm));
        let req = svc.send_request("alice", "bob").await.unwrap();
        assert_eq!(req.sender_id, "alice");
        assert_eq!(req.receiver_id, "bob");

        assert_eq!(svc.incoming("bob").await.unwrap().len(), 1);
        assert_eq!(svc.outgoing("alice").await.unwrap().len(), 1);
        assert!(svc.incoming("alice").await.unwrap().is_empty());

        let accepted = svc.accept("bob", &req.id).await.unwrap();
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
        assert!(svc.incoming("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sender_cannot_accept_own_request() {
        let (svc, _repo) = service(Arc::new(AutoConfirm));
        let req = svc.send_request("alice", "bob").await.unwrap();

        let err = svc.accept("alice", &req.id).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = svc.cancel("bob", &req.id).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_duplicate_and_self_requests_rejected() {
        let (svc, _repo) = service(Arc::new(AutoConfirm));
        tokio_test::assert_err!(svc.send_request("alice", "alice").await);

        svc.send_request("alice", "bob").await.unwrap();
        // Reverse direction counts as a duplicate too
        tokio_test::assert_err!(svc.send_request("bob", "alice").await);
    }

    #[tokio::test]
    async fn test_declined_confirmation_leaves_request_untouched() {
        let (svc, repo) = service(Arc::new(Decline));
        let req = svc.send_request("alice", "bob").await.unwrap();
        let writes_before = repo.writes.load(Ordering::SeqCst);

        assert!(!svc.cancel("alice", &req.id).await.unwrap());
        assert!(!svc.reject("bob", &req.id).await.unwrap());

        assert_eq!(repo.writes.load(Ordering::SeqCst), writes_before);
        let row = repo.get_request(&req.id).await.unwrap().unwrap();
        assert!(row.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_then_resend() {
        let (svc, _repo) = service(Arc::new(AutoConfirm));
        let req = svc.send_request("alice", "bob").await.unwrap();
        assert!(svc.cancel("alice", &req.id).await.unwrap());

        // Cancelled requests can't be acted on again
        tokio_test::assert_err!(svc.accept("bob", &req.id).await);

        // ...but a fresh request is allowed
        tokio_test::assert_ok!(svc.send_request("alice", "bob").await);
    }

    #[tokio::test]
    async fn test_remove_friend() {
        let (svc, repo) = service(Arc::new(AutoConfirm));
        let req = svc.send_request("alice", "bob").await.unwrap();

        // Only accepted friendships can be removed
        tokio_test::assert_err!(svc.remove_friend("alice", &req.id).await);

        svc.accept("bob", &req.id).await.unwrap();
        let err = svc.remove_friend("carol", &req.id).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        assert!(svc.remove_friend("alice", &req.id).await.unwrap());
        assert!(repo.get_request(&req.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_ids_never_reach_repository() {
        let (svc, repo) = service(Arc::new(AutoConfirm));

        let err = svc.send_request("x,id.not.is.null", "bob").await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        tokio_test::assert_err!(svc.incoming("bob),or=(id.not.is.null").await);
        tokio_test::assert_err!(svc.accept("bob", "f-1&select=*").await);
        tokio_test::assert_err!(svc.remove_friend("", "f-1").await);

        assert_eq!(repo.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let (svc, _repo) = service(Arc::new(AutoConfirm));
        let err = svc.accept("bob", "missing").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
