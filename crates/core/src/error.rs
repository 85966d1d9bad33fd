use std::fmt;

/// Identifier carried by [`CoreError::NotFound`].
///
/// Boards mix UUID keys (retros) with BIGSERIAL keys (columns, cards,
/// comments), so the error keeps whichever form the caller had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKey {
    Id(crate::types::DbId),
    Uuid(uuid::Uuid),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Id(id) => write!(f, "{id}"),
            EntityKey::Uuid(id) => write!(f, "{id}"),
        }
    }
}

impl From<crate::types::DbId> for EntityKey {
    fn from(id: crate::types::DbId) -> Self {
        EntityKey::Id(id)
    }
}

impl From<uuid::Uuid> for EntityKey {
    fn from(id: uuid::Uuid) -> Self {
        EntityKey::Uuid(id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: EntityKey },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with any supported key type.
    pub fn not_found(entity: &'static str, id: impl Into<EntityKey>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
