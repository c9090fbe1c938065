//! World Server - authoritative tick-driven world simulation
//!
//! Players connect over WebSocket, send spawn and movement commands, and receive a
//! binary position update every tick containing only the players near them.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
