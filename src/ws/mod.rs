//! WebSocket transport: wire types, frame codec, and per-connection tasks

pub mod connection;
pub mod frame;
pub mod handler;
pub mod protocol;
