//! REST client for the hosted AmaPlayer backend.
//!
//! Talks to the PostgREST-style surface of the backend: table endpoints under
//! `/rest/v1/<table>` and RPC functions under `/rest/v1/rpc/<name>`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use amaplayer_core::client::RestClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = RestClient::new("https://project.example.co", "anon-key")?
//!         .with_access_token("user-jwt");
//!     let requests = client.list_friend_requests("user-123").await?;
//!     println!("{} requests", requests.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connections::ConnectionRepository;
use crate::error::{Error, Result};
use crate::remote::LikeMutationClient;
use crate::types::*;

/// RPC that applies a like/unlike and returns the resulting count.
const TOGGLE_LIKE_RPC: &str = "toggle_post_like";

/// Table holding friend requests.
const FRIENDSHIPS_TABLE: &str = "friendships";

/// REST client for the hosted backend
#[derive(Clone)]
pub struct RestClient {
    /// Project base URL, without trailing slash
    base_url: String,
    /// Public (anon) API key sent with every request
    api_key: String,
    /// Signed-in user's access token; falls back to the API key
    access_token: Option<String>,
    /// HTTP client
    client: reqwest::Client,
}

impl RestClient {
    /// Create a new client for the given project URL and API key
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            client,
        })
    }

    /// Set the user access token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Like Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a like mutation through the toggle RPC
    pub async fn toggle_post_like(&self, mutation: &LikeMutation) -> Result<LikeOutcome> {
        let body = ToggleLikeRequest::from(mutation);
        let path = format!("/rest/v1/rpc/{}", TOGGLE_LIKE_RPC);
        self.request(
            reqwest::Method::POST,
            &path,
            &[],
            Some(&body),
            &[("Idempotency-Key", mutation.idempotency_key.as_str())],
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Friend Request Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// List every request where the user is sender or receiver
    pub async fn list_friend_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        ensure_valid_id(user_id)?;
        let path = format!("/rest/v1/{}", FRIENDSHIPS_TABLE);
        let query = [
            ("or", format!("(requester_id.eq.{0},recipient_id.eq.{0})", user_id)),
            ("order", "created_at.desc".to_string()),
        ];
        self.get(&path, &query).await
    }

    /// Get a single request by ID
    pub async fn get_friend_request(&self, request_id: &str) -> Result<Option<FriendRequest>> {
        let path = format!("/rest/v1/{}", FRIENDSHIPS_TABLE);
        let mut query = Self::row_filter(request_id)?.to_vec();
        query.push(("limit", "1".to_string()));
        let rows: Vec<FriendRequest> = self.get(&path, &query).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a pending request
    pub async fn create_friend_request(&self, req: &NewFriendRequest) -> Result<FriendRequest> {
        let row = InsertFriendRequest {
            id: uuid::Uuid::new_v4().to_string(),
            requester_id: &req.sender_id,
            recipient_id: &req.receiver_id,
            status: FriendRequestStatus::Pending,
            created_at: Utc::now().to_rfc3339(),
        };
        let path = format!("/rest/v1/{}", FRIENDSHIPS_TABLE);
        let rows: Vec<FriendRequest> = self
            .request(
                reqwest::Method::POST,
                &path,
                &[],
                Some(&row),
                &[("Prefer", "return=representation")],
            )
            .await?;
        Self::single_row(rows, &row.id)
    }

    /// Update request status
    pub async fn update_friend_request_status(
        &self,
        request_id: &str,
        status: FriendRequestStatus,
    ) -> Result<FriendRequest> {
        let req = UpdateStatusRequest {
            status,
            updated_at: Utc::now().to_rfc3339(),
        };
        let path = format!("/rest/v1/{}", FRIENDSHIPS_TABLE);
        let query = Self::row_filter(request_id)?;
        let rows: Vec<FriendRequest> = self
            .request(
                reqwest::Method::PATCH,
                &path,
                &query,
                Some(&req),
                &[("Prefer", "return=representation")],
            )
            .await?;
        Self::single_row(rows, request_id)
    }

    /// Delete a request row
    pub async fn delete_friend_request(&self, request_id: &str) -> Result<()> {
        let path = format!("/rest/v1/{}", FRIENDSHIPS_TABLE);
        let query = Self::row_filter(request_id)?;
        let _: serde_json::Value = self
            .request(reqwest::Method::DELETE, &path, &query, Option::<&()>::None, &[])
            .await?;
        Ok(())
    }

    /// `id=eq.<id>`, encoded by reqwest
    fn row_filter(id: &str) -> Result<[(&'static str, String); 1]> {
        ensure_valid_id(id)?;
        Ok([("id", format!("eq.{}", id))])
    }

    fn single_row(rows: Vec<FriendRequest>, id: &str) -> Result<FriendRequest> {
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("friend request {}", id)))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // HTTP Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.request(reqwest::Method::GET, path, query, Option::<&()>::None, &[])
            .await
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    async fn request<T: DeserializeOwned, B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        headers: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("API request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.bearer()))
            .query(query);

        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Request(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            // DELETE and minimal-return writes come back empty
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| Error::Request(format!("Failed to read response: {}", e)))?;
            let slice: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            Ok(serde_json::from_slice(slice)?)
        } else {
            let error_text = resp.text().await.unwrap_or_default();
            Err(Self::status_error(status.as_u16(), path, error_text))
        }
    }

    fn status_error(status: u16, path: &str, body: String) -> Error {
        match status {
            401 => Error::NotAuthenticated,
            403 => Error::PermissionDenied(body),
            404 => Error::NotFound(path.to_string()),
            _ => {
                warn!(status, path, "Backend request failed");
                Error::http(status, body)
            }
        }
    }
}

#[async_trait]
impl LikeMutationClient for RestClient {
    async fn toggle_like(&self, mutation: &LikeMutation) -> Result<LikeOutcome> {
        self.toggle_post_like(mutation).await
    }
}

#[async_trait]
impl ConnectionRepository for RestClient {
    async fn create_request(&self, request: &NewFriendRequest) -> Result<FriendRequest> {
        self.create_friend_request(request).await
    }

    async fn get_request(&self, request_id: &str) -> Result<Option<FriendRequest>> {
        self.get_friend_request(request_id).await
    }

    async fn update_status(&self, request_id: &str, status: FriendRequestStatus) -> Result<FriendRequest> {
        self.update_friend_request_status(request_id, status).await
    }

    async fn delete_request(&self, request_id: &str) -> Result<()> {
        self.delete_friend_request(request_id).await
    }

    async fn requests_for(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        self.list_friend_requests(user_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

/// Toggle-like RPC arguments
#[derive(Debug, Serialize)]
pub struct ToggleLikeRequest {
    pub p_post_id: String,
    pub p_user_id: String,
    pub p_user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_user_photo_url: Option<String>,
    pub p_liked: bool,
}

impl From<&LikeMutation> for ToggleLikeRequest {
    fn from(mutation: &LikeMutation) -> Self {
        Self {
            p_post_id: mutation.entity_id.clone(),
            p_user_id: mutation.actor.id.clone(),
            p_user_name: mutation.actor.display_name.clone(),
            p_user_photo_url: mutation.actor.avatar_url.clone(),
            p_liked: mutation.desired.is_liked(),
        }
    }
}

/// Friend request insert row
#[derive(Debug, Serialize)]
struct InsertFriendRequest<'a> {
    id: String,
    requester_id: &'a str,
    recipient_id: &'a str,
    status: FriendRequestStatus,
    created_at: String,
}

/// Status update body
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: FriendRequestStatus,
    pub updated_at: String,
}
