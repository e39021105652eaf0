//! Arena Server - Authoritative multiplayer platform-destruction arena
//!
//! Players connect over a WebSocket, move around a 4x4 grid of platforms
//! and are eliminated as the server destroys platforms one per tick. The
//! whole world (players, grid, round counters) is owned by a single task
//! and mutated only through its command queue.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod util;
pub mod ws;
