//! # Code Heist Game Server
//!
//! Authoritative server for Code Heist, a social-deduction elimination
//! card game played over WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CODE HEIST SERVER                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/           - Rules engine (no I/O)                     │
//! │  ├── card.rs     - Card catalogue, weights, deck operations  │
//! │  ├── state.rs    - Room and per-player state                 │
//! │  ├── turn.rs     - Lobby + turn state machine, win checks    │
//! │  ├── effect.rs   - Card-effect resolution                    │
//! │  ├── challenge.rs- Bluff-challenge adjudication              │
//! │  └── events.rs   - Internal event log                        │
//! │                                                              │
//! │  network/        - Transport and coordination                │
//! │  ├── server.rs   - WebSocket server                          │
//! │  ├── protocol.rs - Wire messages                             │
//! │  ├── room.rs     - Per-room coordinator actors + registry    │
//! │  └── auth.rs     - JWT validation                            │
//! │                                                              │
//! │  store/          - Persistence seam                          │
//! │  ├── mod.rs      - RoomStore / StatsStore traits             │
//! │  └── memory.rs   - In-memory reference implementation        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! Every room is owned by exactly one coordinator task. Commands for a
//! room go through its mailbox and are processed strictly one at a time:
//! mutate a working copy, persist, then swap in and broadcast. Commands
//! for different rooms share nothing and run fully in parallel.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod game;
pub mod network;
pub mod store;

// Re-export commonly used types
pub use game::card::{Card, CardKind, DECK_SIZE};
pub use game::state::{GamePhase, PlayerId, RoomState, Seat};
pub use game::RulesError;
pub use network::protocol::{ClientCommand, ServerEvent};
pub use network::server::{GameServer, ServerConfig};
pub use store::memory::MemoryStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
