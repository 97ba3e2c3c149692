//! SDK Utilities
//!
//! Common utilities for the SDK.

mod hashing;
mod time;
mod validation;

pub use hashing::idempotency_key;
pub use time::{format_datetime, now_utc};
pub use validation::{validate_entity_id, ValidationError};
