//! Row structs for the board tables.
//!
//! Cards and comments are always read joined with `user_profiles`, so their
//! structs carry the author's display name alongside the stored columns.

pub mod card;
pub mod column;
pub mod comment;
pub mod retro;
