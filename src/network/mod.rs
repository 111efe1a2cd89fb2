//! Network Layer
//!
//! WebSocket server for real-time multiplayer communication.
//! This layer is **non-deterministic** - all game decisions run through
//! the rules engine in `game/`, driven by each room's coordinator.

pub mod auth;
pub mod protocol;
pub mod room;
pub mod server;

pub use auth::{validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{
    ClientCommand, ErrorCode, ErrorReply, RoomListing, RoomSnapshot, ServerEvent,
};
pub use room::{RoomCommand, RoomHandle, RoomRegistry};
pub use server::{GameServer, GameServerError, ServerConfig};
