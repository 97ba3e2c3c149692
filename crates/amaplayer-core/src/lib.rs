//! amaplayer-core - Core library for AmaPlayer
//!
//! This crate provides the pieces shared by every AmaPlayer client surface:
//!
//! - **types**: Actors, like mutations/outcomes and friend request records
//! - **remote**: Traits for the hosted backend and the identity provider
//! - **connections**: Friend request lifecycle with explicit sender/receiver identity
//! - **client**: REST/RPC client for the hosted backend (feature `client`)

#[cfg(feature = "client")]
pub mod client;
pub mod connections;
pub mod error;
pub mod remote;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use remote::{IdentityProvider, LikeMutationClient, StaticIdentity};
pub use types::{Actor, LikeIntent, LikeMutation, LikeOutcome};
