//! IPC module for status queries from the pause overlay and other clients

mod protocol;
mod server;

pub use protocol::AvatarStatus;
pub use server::Server;
