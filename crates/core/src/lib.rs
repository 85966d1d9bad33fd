//! Domain vocabulary shared by the store and the realtime server.
//!
//! This crate performs no I/O. It holds identifier aliases, the error
//! taxonomy, and the board-level constants and validation rules so that the
//! repository layer and the WebSocket gateway agree on them.

pub mod board;
pub mod error;
pub mod types;
