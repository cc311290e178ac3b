use crate::serialization::DecodeError;
use crate::types::DbId;

/// Domain-level failures shared across the core crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
