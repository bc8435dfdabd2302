//! Events delivered to session subscribers

use athena_core::ServerRole;
use athena_game::ClientEvent;
use serde::Serialize;

use crate::state::SessionState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Something a handler decoded from a server message
    Decoded(ClientEvent),
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    /// A connection failed or was lost; nothing is retried
    NetworkError { role: ServerRole, error: String },
    /// A server stopped answering pings
    PingTimeout { role: ServerRole, silent_ms: u64 },
    /// One message could not be decoded; the connection carries on
    MessageDropped {
        role: ServerRole,
        opcode: u16,
        error: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_event_json_keeps_inner_tag() {
        let event = SessionEvent::Decoded(ClientEvent::OnlineUsers { count: 3 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "decoded");
        assert_eq!(json["event"], "online_users");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn test_state_change_json() {
        let event = SessionEvent::StateChanged {
            from: SessionState::LoginOk,
            to: SessionState::ConnectingChar,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["from"], "login_ok");
        assert_eq!(json["to"], "connecting_char");
    }
}
