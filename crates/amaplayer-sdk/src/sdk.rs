//! Main SDK Entry Point
//!
//! Provides the main SDK struct that wires configuration, identity and the
//! backend into the engagement engine and the connections service.

use std::sync::Arc;
use tracing::info;

use amaplayer_core::connections::{Confirmation, ConnectionRepository, ConnectionService};
use amaplayer_core::{IdentityProvider, LikeMutationClient};

use crate::engagement::EngagementEngine;
use crate::{SDKConfig, SDKResult};

/// AmaPlayer SDK - Main entry point
///
/// The SDK provides access to:
/// - Optimistic like engine (one per application context)
/// - Friend request workflow
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use amaplayer_sdk::{SDK, SDKConfig};
/// use amaplayer_core::{Actor, StaticIdentity};
///
/// async fn example() -> anyhow::Result<()> {
///     let identity = Arc::new(StaticIdentity::new(Actor::new("user-123", "Sam")));
///     let sdk = SDK::new(SDKConfig::load()?, identity)?;
///
///     let likes = sdk.engagement();
///     likes.toggle("post-1", false, 10).await?;
///     likes.wait_idle().await;
///
///     Ok(())
/// }
/// ```
pub struct SDK {
    /// SDK configuration
    config: SDKConfig,

    /// Who is signed in
    identity: Arc<dyn IdentityProvider>,

    /// Backend for like mutations
    likes: Arc<dyn LikeMutationClient>,

    /// Backend for friend requests
    connections: Arc<dyn ConnectionRepository>,
}

impl SDK {
    /// Create a new SDK instance backed by the hosted REST API
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `api_url` or `api_key` is missing, or the configuration is invalid
    /// - The HTTP client cannot be created
    #[cfg(feature = "client")]
    pub fn new(config: SDKConfig, identity: Arc<dyn IdentityProvider>) -> SDKResult<Self> {
        config.validate_remote()?;

        let mut client = amaplayer_core::client::RestClient::new(&config.api_url, &config.api_key)?;
        if let Some(token) = &config.access_token {
            client = client.with_access_token(token.clone());
        }
        let client = Arc::new(client);

        info!(api_url = %config.api_url, "AmaPlayer SDK initialized");
        Ok(Self {
            config,
            identity,
            likes: client.clone(),
            connections: client,
        })
    }

    /// Create an SDK instance over caller-supplied backends
    pub fn with_backend(
        config: SDKConfig,
        identity: Arc<dyn IdentityProvider>,
        likes: Arc<dyn LikeMutationClient>,
        connections: Arc<dyn ConnectionRepository>,
    ) -> SDKResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            identity,
            likes,
            connections,
        })
    }

    /// Get the SDK configuration
    pub fn config(&self) -> &SDKConfig {
        &self.config
    }

    /// Get the identity provider
    pub fn identity(&self) -> Arc<dyn IdentityProvider> {
        self.identity.clone()
    }

    /// Create a new engagement engine.
    ///
    /// Each call returns an isolated engine with its own state; share one per
    /// application context by cloning it.
    pub fn engagement(&self) -> EngagementEngine {
        EngagementEngine::new(&self.config.engagement, self.likes.clone(), self.identity.clone())
    }

    /// Get the friend request service with the given confirmation capability
    pub fn connections(&self, confirmation: Arc<dyn Confirmation>) -> ConnectionService {
        ConnectionService::new(self.connections.clone(), confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngagementConfig;
    use crate::SDKError;
    use amaplayer_core::connections::AutoConfirm;
    use amaplayer_core::types::{FriendRequest, FriendRequestStatus, NewFriendRequest};
    use amaplayer_core::{Actor, LikeMutation, LikeOutcome, StaticIdentity};
    use async_trait::async_trait;

    /// Backend that accepts every like and has no friend requests.
    struct Accepting;

    #[async_trait]
    impl LikeMutationClient for Accepting {
        async fn toggle_like(&self, mutation: &LikeMutation) -> amaplayer_core::Result<LikeOutcome> {
            let liked = mutation.desired.is_liked();
            Ok(LikeOutcome::new(liked, if liked { 1 } else { 0 }))
        }
    }

    #[async_trait]
    impl ConnectionRepository for Accepting {
        async fn create_request(&self, _request: &NewFriendRequest) -> amaplayer_core::Result<FriendRequest> {
            Err(amaplayer_core::Error::invalid_operation("read-only backend"))
        }

        async fn get_request(&self, _request_id: &str) -> amaplayer_core::Result<Option<FriendRequest>> {
            Ok(None)
        }

        async fn update_status(
            &self,
            request_id: &str,
            _status: FriendRequestStatus,
        ) -> amaplayer_core::Result<FriendRequest> {
            Err(amaplayer_core::Error::NotFound(request_id.to_string()))
        }

        async fn delete_request(&self, request_id: &str) -> amaplayer_core::Result<()> {
            Err(amaplayer_core::Error::NotFound(request_id.to_string()))
        }

        async fn requests_for(&self, _user_id: &str) -> amaplayer_core::Result<Vec<FriendRequest>> {
            Ok(Vec::new())
        }
    }

    fn sdk() -> SDK {
        let config = SDKConfig::default().with_engagement(EngagementConfig {
            debounce_ms: 10,
            ..Default::default()
        });
        let identity = Arc::new(StaticIdentity::new(Actor::new("user-1", "Sam")));
        let backend = Arc::new(Accepting);
        SDK::with_backend(config, identity, backend.clone(), backend).unwrap()
    }

    #[test]
    fn test_with_backend_validates_config() {
        let config = SDKConfig::default().with_engagement(EngagementConfig {
            max_attempts: 0,
            ..Default::default()
        });
        let backend = Arc::new(Accepting);
        let result = SDK::with_backend(
            config,
            Arc::new(StaticIdentity::anonymous()),
            backend.clone(),
            backend,
        );
        assert!(matches!(result, Err(SDKError::Config(_))));
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_new_requires_remote_settings() {
        let identity = Arc::new(StaticIdentity::anonymous());
        let result = SDK::new(SDKConfig::default(), identity.clone());
        assert!(matches!(result, Err(SDKError::Config(_))));

        let sdk = SDK::new(
            SDKConfig::new("https://project.example.co/", "anon").with_access_token("jwt"),
            identity,
        )
        .unwrap();
        assert_eq!(sdk.config().api_url, "https://project.example.co/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_engagement_end_to_end() {
        let sdk = sdk();
        let likes = sdk.engagement();

        tokio_test::assert_ok!(likes.toggle("post-1", false, 0).await);
        likes.wait_idle().await;

        let record = likes.get_state("post-1").await;
        assert!(record.liked);
        assert_eq!(record.count, 1);
        assert!(!record.loading);

        // A second engine does not see the first one's state
        assert!(!sdk.engagement().get_state("post-1").await.liked);
    }

    #[tokio::test]
    async fn test_connections_service() {
        let sdk = sdk();
        let service = sdk.connections(Arc::new(AutoConfirm));
        assert!(tokio_test::assert_ok!(service.incoming("user-1").await).is_empty());
        tokio_test::assert_err!(service.send_request("user-1", "user-1").await);
        assert!(sdk.identity().current_actor().is_some());
    }
}
