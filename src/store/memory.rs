//! In-Memory Store
//!
//! Reference implementation of the persistence traits. Good enough for a
//! single-process server and for tests; a real deployment would put a
//! document database behind the same traits.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::game::state::{PlayerId, RoomState};
use crate::store::{PlayerStats, RoomDoc, RoomStore, StatDeltas, StatsStore, StoreError};

/// In-memory room and stats storage.
#[derive(Default)]
pub struct MemoryStore {
    rooms: RwLock<BTreeMap<Uuid, RoomDoc>>,
    codes: RwLock<BTreeMap<String, Uuid>>,
    stats: RwLock<BTreeMap<PlayerId, PlayerStats>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms (for tests and metrics logging).
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl RoomStore for MemoryStore {
    async fn create_room(&self, state: RoomState) -> Result<RoomDoc, StoreError> {
        let mut codes = self.codes.write().await;
        if codes.contains_key(&state.code) {
            return Err(StoreError::Duplicate(state.code));
        }

        let now = Utc::now();
        let doc = RoomDoc {
            id: Uuid::new_v4(),
            state,
            created_at: now,
            updated_at: now,
        };

        codes.insert(doc.state.code.clone(), doc.id);
        self.rooms.write().await.insert(doc.id, doc.clone());
        Ok(doc)
    }

    async fn get_room_by_code(&self, code: &str) -> Result<Option<RoomDoc>, StoreError> {
        let codes = self.codes.read().await;
        let id = match codes.get(code) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.rooms.read().await.get(&id).cloned())
    }

    async fn update_room(&self, id: Uuid, state: RoomState) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.get_mut(&id) {
            Some(doc) => {
                doc.state = state;
                doc.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_room(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        match rooms.remove(&id) {
            Some(doc) => {
                self.codes.write().await.remove(&doc.state.code);
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn get_or_create_stats(
        &self,
        player: PlayerId,
        username: &str,
    ) -> Result<PlayerStats, StoreError> {
        let mut stats = self.stats.write().await;
        let row = stats.entry(player).or_insert_with(|| PlayerStats {
            player,
            username: username.to_string(),
            games_played: 0,
            wins: 0,
        });
        Ok(row.clone())
    }

    async fn update_stats(
        &self,
        player: PlayerId,
        username: &str,
        deltas: StatDeltas,
    ) -> Result<(), StoreError> {
        let mut stats = self.stats.write().await;
        let row = stats.entry(player).or_insert_with(|| PlayerStats {
            player,
            username: username.to_string(),
            games_played: 0,
            wins: 0,
        });
        row.username = username.to_string();
        row.games_played += deltas.games_played;
        row.wins += deltas.wins;
        Ok(())
    }

    async fn get_leaderboard(&self, limit: usize) -> Result<Vec<PlayerStats>, StoreError> {
        let stats = self.stats.read().await;
        let mut rows: Vec<PlayerStats> = stats.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(a.games_played.cmp(&b.games_played))
                .then(a.username.cmp(&b.username))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
