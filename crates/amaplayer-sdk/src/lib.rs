//! AmaPlayer SDK - Client-side engagement and social features
//!
//! This crate provides the unified SDK for AmaPlayer clients:
//!
//! # Core Modules (from amaplayer-core)
//!
//! - **types** - Actors, like mutations, friend requests
//! - **remote** - Backend and identity traits
//! - **connections** - Friend request workflow
//! - **client** - REST client for the hosted backend (feature `client`)
//!
//! # SDK Modules
//!
//! - **engagement** - Optimistic likes with debounce, per-entity ordering and retry
//! - **config** - File and environment configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use amaplayer_sdk::{SDK, SDKConfig};
//! use amaplayer_sdk::remote::StaticIdentity;
//! use amaplayer_sdk::types::Actor;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let identity = Arc::new(StaticIdentity::new(Actor::new("user-123", "Sam")));
//!     let sdk = SDK::new(SDKConfig::load()?, identity)?;
//!
//!     // Toggle a like; the returned record is already updated
//!     let likes = sdk.engagement();
//!     let record = likes.toggle("post-1", false, 10).await?;
//!     assert!(record.liked);
//!
//!     Ok(())
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Re-export core modules from amaplayer-core
// ─────────────────────────────────────────────────────────────────────────────

/// Actors, like mutations, friend requests
pub use amaplayer_core::types;

/// Backend and identity traits
pub use amaplayer_core::remote;

/// Friend request workflow
pub use amaplayer_core::connections;

/// Error types from core
pub use amaplayer_core::error as core_error;

/// REST client for the hosted backend
#[cfg(feature = "client")]
pub use amaplayer_core::client;

// ─────────────────────────────────────────────────────────────────────────────
// SDK-specific modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod config;
pub mod engagement;
pub mod utils;

mod error;
mod sdk;

// Re-export main SDK types
pub use config::{EngagementConfig, SDKConfig};
pub use engagement::{ActionPhase, EngagementEngine, EngagementRecord};
pub use error::{SDKError, SDKResult};
pub use sdk::SDK;
