//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async queries that
//! accept `&PgPool` as the first argument. Operations spanning more than one
//! table open their own transaction.

pub mod card_repo;
pub mod column_repo;
pub mod comment_repo;
pub mod retro_repo;

pub use card_repo::CardRepo;
pub use column_repo::ColumnRepo;
pub use comment_repo::CommentRepo;
pub use retro_repo::RetroRepo;
