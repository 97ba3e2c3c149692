//! Validation Utilities

use thiserror::Error;

/// Maximum entity id length accepted by the backend
const MAX_ENTITY_ID_LEN: usize = 128;

/// Validation error types
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid ID format: {0}")]
    InvalidId(String),

    #[error("Field required: {0}")]
    Required(String),
}

/// Validate an entity (post, video, moment) ID
///
/// Valid IDs are:
/// - 1-128 characters
/// - ASCII alphanumeric with hyphens and underscores (UUIDs and
///   document-store keys both qualify)
pub fn validate_entity_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::Required("entity ID cannot be empty".into()));
    }

    if id.len() > MAX_ENTITY_ID_LEN {
        return Err(ValidationError::InvalidId(format!(
            "ID must be {} characters or less",
            MAX_ENTITY_ID_LEN
        )));
    }

    for (i, c) in id.chars().enumerate() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err(ValidationError::InvalidId(format!(
                "Invalid character '{}' at position {}",
                c, i
            )));
        }
    }

    Ok(())
}
