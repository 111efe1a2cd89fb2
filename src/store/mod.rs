//! Persistence Seam
//!
//! The engine persists room documents and player stats through these
//! traits and treats every call as an atomic single-document operation.
//! Durability itself is an external concern: the in-memory implementation
//! in [`memory`] is the reference used by the server and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::state::{PlayerId, RoomState};

pub mod memory;

pub use memory::MemoryStore;

/// Persistence failures.
///
/// Any of these aborts the issuing command before broadcast; the room
/// stays at its last committed state.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// No document with that id or code.
    #[error("document not found")]
    NotFound,

    /// Unique key collision (room code already live).
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Backend unreachable or refusing writes.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A stored room document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomDoc {
    /// Document id.
    pub id: Uuid,
    /// The room state as last committed.
    pub state: RoomState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last commit time.
    pub updated_at: DateTime<Utc>,
}

/// Room document operations.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a new room document. Fails on a room-code collision.
    async fn create_room(&self, state: RoomState) -> Result<RoomDoc, StoreError>;

    /// Look a room up by its code.
    async fn get_room_by_code(&self, code: &str) -> Result<Option<RoomDoc>, StoreError>;

    /// Replace a room's state. The whole document is the patch unit.
    async fn update_room(&self, id: Uuid, state: RoomState) -> Result<(), StoreError>;

    /// Delete a room document.
    async fn delete_room(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Per-player aggregate stats.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Stable player id.
    pub player: PlayerId,
    /// Display name as of the last update.
    pub username: String,
    /// Games finished.
    pub games_played: u32,
    /// Games won.
    pub wins: u32,
}

/// Increments applied atomically by [`StatsStore::update_stats`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StatDeltas {
    /// Games finished to add.
    pub games_played: u32,
    /// Wins to add.
    pub wins: u32,
}

/// Player stats operations.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Fetch a player's stats row, creating an empty one if missing.
    async fn get_or_create_stats(
        &self,
        player: PlayerId,
        username: &str,
    ) -> Result<PlayerStats, StoreError>;

    /// Apply increments to a player's stats row.
    async fn update_stats(
        &self,
        player: PlayerId,
        username: &str,
        deltas: StatDeltas,
    ) -> Result<(), StoreError>;

    /// Top players by wins.
    async fn get_leaderboard(&self, limit: usize) -> Result<Vec<PlayerStats>, StoreError>;
}
