/// Column, card and comment primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Retro sessions are identified by UUID.
pub type RetroId = uuid::Uuid;

/// Users are opaque, pre-authenticated identifiers.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
