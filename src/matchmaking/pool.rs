//! Rounds forming in the lobby

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::game::constants::{BOT_NAME_POOL, MAX_NAME_LENGTH, SEATED_HOLD_MS};
use crate::game::{Player, Round, RoundSettings, RoundState};
use crate::net::connection::{Connection, InputStream};
use crate::util::time::unix_millis;

/// A named human waiting for a seat
pub struct PendingPlayer {
    pub name: String,
    pub connection: Connection,
    pub input: InputStream,
}

/// Why a player could not join
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Please enter a name")]
    EmptyName,

    #[error("Name must be at most {max} characters")]
    NameTooLong { max: usize },

    #[error("All arenas are busy, please try again later")]
    LobbyFull,

    #[error("The lobby is not accepting players")]
    Unavailable,
}

/// Trim and check a requested name
pub fn validate_name(raw: &str) -> Result<String, JoinError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(JoinError::EmptyName);
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(JoinError::NameTooLong {
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(name.to_string())
}

/// Where a player ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinReceipt {
    pub round_id: Uuid,
    pub seat: usize,
}

/// A round still collecting players
pub struct FormingRound {
    pub id: Uuid,
    state: RoundState,
    state_changed_at: Instant,
    players: Vec<Arc<Player>>,
}

impl FormingRound {
    fn new(now: Instant) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: RoundState::Compiling,
            state_changed_at: now,
            players: Vec::new(),
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    fn set_state(&mut self, state: RoundState, now: Instant) {
        self.state = state;
        self.state_changed_at = now;
    }

    fn has_name(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    /// Every player hung up. Drains pending input, which is how a hang-up
    /// shows before the first frame is sent.
    fn abandoned(&self) -> bool {
        let gone = self
            .players
            .iter()
            .filter(|p| p.discard_pending_input())
            .count();
        gone == self.players.len()
    }

    /// Fill the free seats with bots and build the playable round
    pub fn into_round(self, settings: &RoundSettings, seed: u64) -> Round {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut players = self.players;
        while players.len() < settings.max_players {
            let name = loop {
                let candidate = format!("Bot {}", rng.gen_range(1..=BOT_NAME_POOL));
                if !players.iter().any(|p| p.name == candidate) {
                    break candidate;
                }
            };
            let seat = players.len();
            players.push(Arc::new(Player::bot(name, seat)));
        }

        let hold_until = unix_millis() + SEATED_HOLD_MS;
        for player in &players {
            player.stamp_crash(hold_until);
        }
        Round::new(self.id, players, settings.clone(), seed)
    }
}

/// Reminder for players of a round that is still waiting
pub struct Reminder {
    pub round_id: Uuid,
    pub players: Vec<Arc<Player>>,
    pub seconds_left: u64,
}

/// What one scheduler tick decided
#[derive(Default)]
pub struct TickReport {
    pub promoted: Vec<FormingRound>,
    pub reminders: Vec<Reminder>,
    pub abandoned: Vec<Uuid>,
}

/// Bounded set of forming rounds, oldest first
pub struct LobbyPool {
    rounds: Vec<FormingRound>,
    settings: RoundSettings,
}

impl LobbyPool {
    pub fn new(settings: RoundSettings) -> Self {
        Self {
            rounds: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    /// Open rounds
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn waiting_players(&self) -> usize {
        self.rounds.iter().map(|r| r.players.len()).sum()
    }

    pub fn rounds(&self) -> &[FormingRound] {
        &self.rounds
    }

    /// Seat a player in the oldest round with room and no namesake.
    ///
    /// A round filled by this join leaves the pool in `Starting` and is
    /// returned alongside the receipt.
    pub fn join(
        &mut self,
        player: PendingPlayer,
        now: Instant,
    ) -> Result<(JoinReceipt, Option<FormingRound>), JoinError> {
        let capacity = self.settings.max_players;
        let index = match self
            .rounds
            .iter()
            .position(|r| r.players.len() < capacity && !r.has_name(&player.name))
        {
            Some(index) => index,
            None if self.rounds.len() >= self.settings.max_open_rounds => {
                return Err(JoinError::LobbyFull)
            }
            None => {
                self.rounds.push(FormingRound::new(now));
                self.rounds.len() - 1
            }
        };

        let round = &mut self.rounds[index];
        let seat = round.players.len();
        round.players.push(Arc::new(Player::human(
            player.name,
            seat,
            player.connection,
            player.input,
        )));
        let receipt = JoinReceipt {
            round_id: round.id,
            seat,
        };

        let promoted = (round.players.len() >= capacity).then(|| {
            let mut round = self.rounds.remove(index);
            round.set_state(RoundState::Starting, now);
            round
        });
        Ok((receipt, promoted))
    }

    /// Advance forming rounds: start waiting, time out, drop abandoned ones
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        let settings = &self.settings;

        let mut index = 0;
        while index < self.rounds.len() {
            let round = &mut self.rounds[index];

            if round.abandoned() {
                report.abandoned.push(round.id);
                self.rounds.remove(index);
                continue;
            }

            if round.state == RoundState::Compiling && round.players.len() >= settings.min_players {
                round.set_state(RoundState::Waiting, now);
            }

            if round.state == RoundState::Waiting {
                let waited = now.saturating_duration_since(round.state_changed_at);
                if waited >= settings.max_wait || round.players.len() >= settings.max_players {
                    let mut round = self.rounds.remove(index);
                    round.set_state(RoundState::Starting, now);
                    report.promoted.push(round);
                    continue;
                }
                let left = settings.max_wait - waited;
                report.reminders.push(Reminder {
                    round_id: round.id,
                    players: round.players.clone(),
                    seconds_left: left.as_secs() + u64::from(left.subsec_nanos() > 0),
                });
            }
            index += 1;
        }
        report
    }
}
