//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::SessionEvent;
use crate::locomotion::Vec3;

/// Requests from a client (e.g. the pause overlay) to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current avatar status
    GetStatus,

    /// Dispatch a command label as if it had been spoken
    Command { label: String },

    /// Ping to check connectivity
    Ping,

    /// Turn this connection into a session event stream
    Subscribe,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current avatar status
    Status(AvatarStatus),

    /// Command label queued for dispatch
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed; only notifications follow
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

/// Push notification for subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Notification {
    SessionEvent(SessionEvent),
}

/// Snapshot of the avatar and session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarStatus {
    /// Daemon version
    pub version: String,

    /// Session paused; the overlay should be shown
    pub paused: bool,

    pub flying: bool,

    pub running: bool,

    /// Coarse motion state name
    pub motion: String,

    pub position: Vec3,

    /// Heading in degrees
    pub yaw: f32,

    /// Look angle in degrees, negative looks up
    pub pitch: f32,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for AvatarStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            paused: false,
            flying: false,
            running: false,
            motion: "GroundedIdle".to_string(),
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            uptime_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::Command {
            label: "continua".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""type":"command""#));
        assert!(json.contains("continua"));
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"get_status"}"#).unwrap();
        assert!(matches!(req, Request::GetStatus));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status(AvatarStatus::default());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("status"));
        assert!(json.contains("paused"));
    }

    #[test]
    fn test_notification_wraps_event() {
        let note = Notification::SessionEvent(SessionEvent::Paused);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"session_event","payload":{"type":"paused"}}"#
        );
    }
}
