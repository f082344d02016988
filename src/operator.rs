//! Operator interface: JSON commands over a local WebSocket.

pub mod commands;
pub mod server;

pub use server::serve;
