//! Round engine - entities, collisions, control loops and rendering

pub mod bot;
pub mod combat;
pub mod constants;
pub mod control;
pub mod frame;
pub mod geometry;
pub mod physics;
pub mod player;
pub mod round;
pub mod sprites;

pub use player::{Car, Player};
pub use round::{GameOver, Round, RoundRegistry, RoundRunner, RoundState};

use std::time::Duration;

use constants::SEAT_COUNT;

/// Lobby and round limits, adjustable through the environment
#[derive(Debug, Clone)]
pub struct RoundSettings {
    /// Humans needed before the waiting countdown starts
    pub min_players: usize,
    /// Seats per round, filled with bots on start
    pub max_players: usize,
    /// How long a round waits for more players
    pub max_wait: Duration,
    /// Running time before the round is called off
    pub time_limit: Duration,
    /// Bound on rounds forming in the lobby at once
    pub max_open_rounds: usize,
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: SEAT_COUNT,
            max_wait: Duration::from_secs(5),
            time_limit: Duration::from_secs(600),
            max_open_rounds: 100,
        }
    }
}
