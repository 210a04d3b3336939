//! Core protocol types for the Gridspace wire format.
//!
//! Every type here gets serialized to JSON, sent over a WebSocket, and
//! parsed by a browser (or by the server, for client commands).
//!
//! The shape is fixed by existing clients: the `type` tag is kebab-case
//! (`"space-joined"`), the body lives under `payload`, and payload field
//! names are camelCase (`"spaceId"`, `"userId"`).

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The identity of an authenticated user, as issued by the auth subsystem.
///
/// A newtype over `String` so a `UserId` can never be passed where a
/// `SpaceId` is expected. `#[serde(transparent)]` keeps it a plain JSON
/// string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The identifier of a persisted space record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(pub String);

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpaceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SpaceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// Grid geometry
// ---------------------------------------------------------------------------

/// A cell on a space's grid. `(0, 0)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: u32,
    pub y: u32,
}

impl Position {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One entry of the `users` list in `space-joined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantView {
    pub user_id: UserId,
    pub x: u32,
    pub y: u32,
}

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

/// HTTP-style status code carried by the `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    /// Malformed frame, unknown type, or a command not valid in the
    /// connection's current state.
    pub const BAD_REQUEST: Self = Self(400);
    /// The join token failed verification.
    pub const UNAUTHORIZED: Self = Self(401);
    /// The requested space does not exist.
    pub const NOT_FOUND: Self = Self(404);
    /// The space cannot take the occupant right now.
    pub const UNAVAILABLE: Self = Self(503);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Client → Server
// ---------------------------------------------------------------------------

/// Commands a client can send.
///
/// `#[serde(tag = "type", content = "payload")]` produces adjacently
/// tagged JSON:
///   `{ "type": "join", "payload": { "spaceId": "...", "token": "..." } }`
///
/// Extra payload fields are ignored. Coordinates are signed so that a
/// negative target parses and is then rejected as out of bounds, rather
/// than failing as a malformed frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Enter a space. Only valid once per connection.
    Join { space_id: SpaceId, token: String },

    /// Request to step to the absolute cell `(x, y)`.
    Move { x: i64, y: i64 },
}

// ---------------------------------------------------------------------------
// Server → Client
// ---------------------------------------------------------------------------

/// Events the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// To the joiner: its spawn cell and everyone already present.
    SpaceJoined {
        spawn: Position,
        users: Vec<OccupantView>,
    },

    /// To existing occupants: a newcomer and where it spawned.
    UserJoined { user_id: UserId, x: u32, y: u32 },

    /// To every occupant (mover included): an accepted step.
    Movement { user_id: UserId, x: u32, y: u32 },

    /// To the mover only: the step was refused; here is where you still are.
    MovementRejected { x: u32, y: u32 },

    /// To remaining occupants: someone left or dropped.
    UserLeft { user_id: UserId },

    /// To the sender of a bad or refused command. The connection stays open.
    Error { code: ErrorCode, message: String },
}

impl ServerMessage {
    /// Builds an `error` event.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! These pin the exact JSON shapes existing clients depend on.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::from("u-42")).unwrap();
        assert_eq!(json, "\"u-42\"");
    }

    #[test]
    fn test_space_id_display_is_raw_value() {
        assert_eq!(SpaceId::from("abc").to_string(), "abc");
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_join_parses_camel_case_space_id() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "join",
            "payload": { "spaceId": "space-1", "token": "tok" }
        }))
        .unwrap();

        assert_eq!(
            msg,
            ClientMessage::Join {
                space_id: SpaceId::from("space-1"),
                token: "tok".into(),
            }
        );
    }

    #[test]
    fn test_move_ignores_extra_payload_fields() {
        // Some clients echo their own userId in move payloads.
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "move",
            "payload": { "x": 3, "y": 4, "userId": "me" }
        }))
        .unwrap();
        assert_eq!(msg, ClientMessage::Move { x: 3, y: 4 });
    }

    #[test]
    fn test_move_accepts_negative_coordinates() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "move",
            "payload": { "x": -1, "y": 0 }
        }))
        .unwrap();
        assert_eq!(msg, ClientMessage::Move { x: -1, y: 0 });
    }

    #[test]
    fn test_move_rejects_fractional_coordinates() {
        let result: Result<ClientMessage, _> = serde_json::from_value(json!({
            "type": "move",
            "payload": { "x": 1.5, "y": 0 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_value(json!({
            "type": "teleport",
            "payload": { "x": 1, "y": 1 }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_join_missing_token_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_value(json!({
            "type": "join",
            "payload": { "spaceId": "s" }
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_garbage_is_rejected() {
        let result: Result<ClientMessage, _> = serde_json::from_slice(b"not json at all");
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_space_joined_json_format() {
        let msg = ServerMessage::SpaceJoined {
            spawn: Position::new(50, 100),
            users: vec![OccupantView {
                user_id: UserId::from("a"),
                x: 49,
                y: 100,
            }],
        };
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "space-joined",
                "payload": {
                    "spawn": { "x": 50, "y": 100 },
                    "users": [{ "userId": "a", "x": 49, "y": 100 }]
                }
            })
        );
    }

    #[test]
    fn test_user_joined_json_format() {
        let msg = ServerMessage::UserJoined {
            user_id: UserId::from("b"),
            x: 1,
            y: 2,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "user-joined");
        assert_eq!(value["payload"], json!({ "userId": "b", "x": 1, "y": 2 }));
    }

    #[test]
    fn test_movement_json_format() {
        let msg = ServerMessage::Movement {
            user_id: UserId::from("b"),
            x: 7,
            y: 8,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "movement");
        assert_eq!(value["payload"]["userId"], "b");
        assert_eq!(value["payload"]["x"], 7);
    }

    #[test]
    fn test_movement_rejected_json_format() {
        let value = serde_json::to_value(ServerMessage::MovementRejected { x: 99, y: 3 }).unwrap();
        assert_eq!(
            value,
            json!({ "type": "movement-rejected", "payload": { "x": 99, "y": 3 } })
        );
    }

    #[test]
    fn test_user_left_json_format() {
        let value = serde_json::to_value(ServerMessage::UserLeft {
            user_id: UserId::from("gone"),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "type": "user-left", "payload": { "userId": "gone" } })
        );
    }

    #[test]
    fn test_error_json_format() {
        let value = serde_json::to_value(ServerMessage::error(
            ErrorCode::UNAUTHORIZED,
            "invalid token",
        ))
        .unwrap();
        assert_eq!(
            value,
            json!({
                "type": "error",
                "payload": { "code": 401, "message": "invalid token" }
            })
        );
    }

    #[test]
    fn test_server_message_parses_back_for_clients() {
        // Test clients decode server events with the same type.
        let msg: ServerMessage = serde_json::from_str(
            r#"{"type":"user-joined","payload":{"userId":"x","x":0,"y":9}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::UserJoined {
                user_id: UserId::from("x"),
                x: 0,
                y: 9,
            }
        );
    }
}
