//! Shared types for amaplayer-core.
//!
//! These types are used by the engagement engine, the connections workflow
//! and the REST client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// The authenticated user performing an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }

    /// Set the avatar URL
    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Likes
// ─────────────────────────────────────────────────────────────────────────────

/// Desired like state for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeIntent {
    Liked,
    Unliked,
}

impl LikeIntent {
    pub fn from_liked(liked: bool) -> Self {
        if liked { Self::Liked } else { Self::Unliked }
    }

    pub fn is_liked(self) -> bool {
        matches!(self, Self::Liked)
    }
}

impl fmt::Display for LikeIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Liked => write!(f, "liked"),
            Self::Unliked => write!(f, "unliked"),
        }
    }
}

/// A single like/unlike request sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeMutation {
    pub entity_id: String,
    pub actor: Actor,
    pub desired: LikeIntent,
    /// Stable across retries of the same queued action.
    pub idempotency_key: String,
}

/// Authoritative like state returned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

impl LikeOutcome {
    pub fn new(liked: bool, likes_count: i64) -> Self {
        Self { liked, likes_count }
    }

    /// Server count clamped to zero.
    pub fn count(&self) -> u64 {
        self.likes_count.max(0) as u64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connections
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Which side of a request a viewer is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDirection {
    /// The viewer sent the request.
    Outgoing,
    /// The viewer received the request.
    Incoming,
    /// The viewer is not a party to the request.
    Unrelated,
}

/// A persisted friend request. Both parties are always stored explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: String,
    #[serde(rename = "requester_id")]
    pub sender_id: String,
    #[serde(rename = "recipient_id")]
    pub receiver_id: String,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    pub fn direction_for(&self, viewer_id: &str) -> RequestDirection {
        if self.sender_id == viewer_id {
            RequestDirection::Outgoing
        } else if self.receiver_id == viewer_id {
            RequestDirection::Incoming
        } else {
            RequestDirection::Unrelated
        }
    }

    /// The other party from the viewer's point of view.
    pub fn counterpart(&self, viewer_id: &str) -> Option<&str> {
        match self.direction_for(viewer_id) {
            RequestDirection::Outgoing => Some(&self.receiver_id),
            RequestDirection::Incoming => Some(&self.sender_id),
            RequestDirection::Unrelated => None,
        }
    }

    pub fn involves(&self, a: &str, b: &str) -> bool {
        (self.sender_id == a && self.receiver_id == b) || (self.sender_id == b && self.receiver_id == a)
    }

    pub fn is_pending(&self) -> bool {
        self.status == FriendRequestStatus::Pending
    }
}

/// Longest user, post or request id the backend accepts.
pub const MAX_ID_LEN: usize = 128;

/// Reject ids that are empty, too long, or contain anything but ASCII
/// alphanumerics, `-` and `_`. Ids end up inside PostgREST filters.
pub fn ensure_valid_id(id: &str) -> Result<()> {
    let well_formed = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(Error::invalid_operation(format!("invalid id: {:?}", id)))
    }
}

/// Input for creating a friend request.
#[derive(Debug, Clone, Serialize)]
pub struct NewFriendRequest {
    #[serde(rename = "requester_id")]
    pub sender_id: String,
    #[serde(rename = "recipient_id")]
    pub receiver_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FriendRequest {
        FriendRequest {
            id: "f-1".into(),
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            status: FriendRequestStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_direction_uses_explicit_parties() {
        let req = request();
        assert_eq!(req.direction_for("alice"), RequestDirection::Outgoing);
        assert_eq!(req.direction_for("bob"), RequestDirection::Incoming);
        assert_eq!(req.direction_for("carol"), RequestDirection::Unrelated);

        assert_eq!(req.counterpart("alice"), Some("bob"));
        assert_eq!(req.counterpart("bob"), Some("alice"));
        assert_eq!(req.counterpart("carol"), None);
    }

    #[test]
    fn test_ensure_valid_id() {
        assert!(ensure_valid_id("3f2b1c9e-8d4a-4e0b-9a51-0c6f1e2d7a44").is_ok());
        assert!(ensure_valid_id("user_1").is_ok());

        assert!(ensure_valid_id("").is_err());
        assert!(ensure_valid_id(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        // Filter syntax must never pass through
        assert!(ensure_valid_id("x,id.not.is.null").is_err());
        assert!(ensure_valid_id("x)&select=*").is_err());
    }

    #[test]
    fn test_involves_is_symmetric() {
        let req = request();
        assert!(req.involves("alice", "bob"));
        assert!(req.involves("bob", "alice"));
        assert!(!req.involves("alice", "carol"));
    }

    #[test]
    fn test_friend_request_column_names() {
        let json = serde_json::to_value(request()).unwrap();
        assert_eq!(json["requester_id"], "alice");
        assert_eq!(json["recipient_id"], "bob");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_like_outcome_from_rpc_payload() {
        let outcome: LikeOutcome =
            serde_json::from_str(r#"{"liked": true, "likes_count": 11}"#).unwrap();
        assert_eq!(outcome, LikeOutcome::new(true, 11));
        assert_eq!(LikeOutcome::new(false, -2).count(), 0);
    }

    #[test]
    fn test_like_intent() {
        assert_eq!(LikeIntent::from_liked(true), LikeIntent::Liked);
        assert!(!LikeIntent::Unliked.is_liked());
        assert_eq!(LikeIntent::Liked.to_string(), "liked");
    }
}
