//! WebSocket protocol and connection sessions

pub mod handler;
pub mod protocol;
