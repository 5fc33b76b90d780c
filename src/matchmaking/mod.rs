//! Lobby - forming rounds, bot backfill and round launch

pub mod pool;
pub mod service;

pub use pool::{validate_name, JoinError, JoinReceipt, PendingPlayer};
pub use service::{LobbyService, LobbyStats};
