//! Round state and the render/broadcast loop

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use super::constants::{
    color, DIVIDER_COLUMN, FRAME_PERIOD, GET_READY_FRAMES, LOW_FACTOR, MAP_HEIGHT,
    WINNER_BANNER_HOLD,
};
use super::control;
use super::frame::{get_ready_text, FrameBuilder};
use super::geometry::{Point, Rectangle};
use super::player::{Car, Player};
use super::sprites::SpriteSet;
use super::RoundSettings;

/// Lifecycle of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundState {
    /// Forming in the lobby, below the minimum player count
    Compiling,
    /// Enough players, waiting for more until the timeout
    Waiting,
    /// Seats filled, showing the countdown
    Starting,
    Running,
    Finished,
}

impl RoundState {
    pub fn is_finished(self) -> bool {
        self == RoundState::Finished
    }
}

/// Why a round ended
#[derive(Debug, Clone)]
pub enum GameOver {
    /// One car left
    Winner(Arc<Player>),
    AllHumansDown,
    TimeUp,
}

/// Shared state of one running round
pub struct Round {
    pub id: Uuid,
    players: Vec<Arc<Player>>,
    settings: RoundSettings,
    state: watch::Sender<RoundState>,
    state_changed_at: Mutex<Instant>,
    bonus: Mutex<Option<Point>>,
    bombs: Mutex<HashSet<Point>>,
    rng: Mutex<ChaCha8Rng>,
}

impl Round {
    /// A round with its seats filled, in `Starting`
    pub fn new(id: Uuid, players: Vec<Arc<Player>>, settings: RoundSettings, seed: u64) -> Self {
        let (state, _) = watch::channel(RoundState::Starting);
        Self {
            id,
            players,
            settings,
            state,
            state_changed_at: Mutex::new(Instant::now()),
            bonus: Mutex::new(None),
            bombs: Mutex::new(HashSet::new()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    pub fn humans(&self) -> impl Iterator<Item = &Arc<Player>> {
        self.players.iter().filter(|p| !p.is_bot())
    }

    pub fn state(&self) -> RoundState {
        *self.state.borrow()
    }

    /// Watch for state changes, used by loops to stop promptly
    pub fn subscribe(&self) -> watch::Receiver<RoundState> {
        self.state.subscribe()
    }

    pub fn set_state(&self, state: RoundState) {
        *self.state_changed_at.lock() = Instant::now();
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(round_id = %self.id, from = ?previous, to = ?state, "Round changed state");
        }
    }

    /// Time spent in the current state
    pub fn state_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.state_changed_at.lock())
    }

    pub fn bonus(&self) -> Option<Point> {
        *self.bonus.lock()
    }

    pub fn place_bonus(&self, point: Point) {
        *self.bonus.lock() = Some(point);
    }

    /// Take the heart if it lies under `hitbox`; only one car can win it
    pub fn claim_bonus(&self, hitbox: &Rectangle) -> bool {
        let mut bonus = self.bonus.lock();
        match *bonus {
            Some(point) if Rectangle::cell(point).intersects(hitbox) => {
                *bonus = None;
                true
            }
            _ => false,
        }
    }

    /// Occasionally place a heart somewhere in the arena
    pub fn maybe_spawn_bonus(&self) {
        let mut bonus = self.bonus.lock();
        if bonus.is_some() {
            return;
        }
        let mut rng = self.rng.lock();
        if rng.gen_range(0..LOW_FACTOR) == 0 {
            let point = Point::new(
                rng.gen_range(1..DIVIDER_COLUMN - 1),
                rng.gen_range(1..MAP_HEIGHT - 1),
            );
            *bonus = Some(point);
        }
    }

    /// Active bombs, locked
    pub fn bombs(&self) -> MutexGuard<'_, HashSet<Point>> {
        self.bombs.lock()
    }

    /// True with probability `1 / odds`
    pub fn roll(&self, odds: u32) -> bool {
        self.rng.lock().gen_range(0..odds.max(1)) == 0
    }

    /// Cars of every other living player, in seat order
    pub fn opponents_of(&self, seat: usize) -> Vec<(usize, Car)> {
        self.players
            .iter()
            .filter(|p| p.seat != seat && p.is_alive())
            .map(|p| (p.seat, p.car()))
            .collect()
    }

    /// Check the end conditions and finish the round if one holds
    pub fn check_game_over(&self, now: Instant) -> Option<GameOver> {
        let state = self.state();
        if state.is_finished() {
            return None;
        }

        let mut alive = self.players.iter().filter(|p| p.is_alive());
        let survivor = alive.next();
        let outcome = match (survivor, alive.next()) {
            (Some(last), None) if self.players.len() > 1 => Some(GameOver::Winner(Arc::clone(last))),
            _ if self.humans().all(|p| !p.is_alive()) => Some(GameOver::AllHumansDown),
            _ if state == RoundState::Running && self.state_age(now) > self.settings.time_limit => {
                Some(GameOver::TimeUp)
            }
            _ => None,
        };

        if outcome.is_some() {
            self.set_state(RoundState::Finished);
        }
        outcome
    }

    /// Send a frame to every human; broken connections kill their car
    pub fn broadcast_frame(&self, frame: Bytes) {
        for player in self.humans() {
            if let Some(connection) = player.connection() {
                if connection.send_frame(frame.clone()).is_err() {
                    debug!(round_id = %self.id, player = %player.name, "Frame dropped, connection gone");
                    player.kill();
                }
            }
        }
    }
}

/// Registry of running rounds
pub struct RoundRegistry {
    rounds: DashMap<Uuid, Arc<Round>>,
}

impl RoundRegistry {
    pub fn new() -> Self {
        Self {
            rounds: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Round>> {
        self.rounds.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn insert(&self, round: Arc<Round>) {
        self.rounds.insert(round.id, round);
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<Round>> {
        self.rounds.remove(id).map(|(_, r)| r)
    }

    pub fn active_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Humans still driving across all rounds
    pub fn active_players(&self) -> usize {
        self.rounds
            .iter()
            .map(|r| r.value().humans().filter(|p| p.is_alive()).count())
            .sum()
    }

    pub fn snapshot(&self) -> Vec<Arc<Round>> {
        self.rounds.iter().map(|r| Arc::clone(r.value())).collect()
    }
}

impl Default for RoundRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one round from the countdown to teardown
pub struct RoundRunner {
    round: Arc<Round>,
    frames: FrameBuilder,
    registry: Arc<RoundRegistry>,
    tasks: JoinSet<()>,
}

impl RoundRunner {
    pub fn new(round: Arc<Round>, sprites: Arc<SpriteSet>, registry: Arc<RoundRegistry>) -> Self {
        let frames = FrameBuilder::new(round.players(), sprites);
        Self {
            round,
            frames,
            registry,
            tasks: JoinSet::new(),
        }
    }

    fn spawn_controls(&mut self) {
        for player in self.round.players() {
            let (round, player) = (Arc::clone(&self.round), Arc::clone(player));
            if player.is_bot() {
                self.tasks
                    .spawn(control::drive_bot(Arc::clone(&round), Arc::clone(&player)));
            } else {
                self.tasks
                    .spawn(control::read_input(Arc::clone(&round), Arc::clone(&player)));
            }
            self.tasks
                .spawn(control::track_position(Arc::clone(&round), Arc::clone(&player)));
            self.tasks
                .spawn(control::track_speed(Arc::clone(&round), Arc::clone(&player)));
            self.tasks
                .spawn(control::track_health(Arc::clone(&round), Arc::clone(&player)));
            self.tasks.spawn(control::track_bombs(round, player));
        }
    }

    /// Run the render loop until the round ends, then tear down
    pub async fn run(mut self) {
        let round = Arc::clone(&self.round);
        info!(
            round_id = %round.id,
            players = round.players().len(),
            humans = round.humans().count(),
            "Round launched"
        );
        self.spawn_controls();

        let mut countdown = GET_READY_FRAMES;
        let mut ticker = interval(FRAME_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let state = round.state();
            let banner = match state {
                RoundState::Starting => Some(get_ready_text(countdown)),
                _ => {
                    round.maybe_spawn_bonus();
                    None
                }
            };
            let frame = self.frames.compose(&round, banner.as_deref());
            round.broadcast_frame(frame.to_bytes());

            if state == RoundState::Starting {
                countdown = countdown.saturating_sub(1);
                if countdown == 0 {
                    round.set_state(RoundState::Running);
                }
            }

            if let Some(outcome) = round.check_game_over(Instant::now()) {
                match &outcome {
                    GameOver::Winner(winner) => {
                        info!(round_id = %round.id, winner = %winner.name, "Round won");
                        let mut frame = self.frames.compose(&round, None);
                        let text = format!("THE WINNER IS {}!!!", winner.name);
                        FrameBuilder::overlay_banner(&mut frame, &text, color::GREEN);
                        round.broadcast_frame(frame.to_bytes());
                        sleep(WINNER_BANNER_HOLD).await;
                    }
                    other => info!(round_id = %round.id, reason = ?other, "Round over"),
                }
                break;
            }
        }

        self.teardown().await;
    }

    async fn teardown(mut self) {
        let closing = futures::future::join_all(
            self.round
                .humans()
                .filter_map(|p| p.connection())
                .map(|c| c.close_with(Bytes::from_static(b"Round is over, thanks for playing!\r\n"))),
        );
        closing.await;

        self.tasks.shutdown().await;
        self.registry.remove(&self.round.id);
        info!(round_id = %self.round.id, "Round removed from registry");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::connection::Connection;
    use std::thread;

    fn bots(count: usize) -> Vec<Arc<Player>> {
        (0..count)
            .map(|seat| Arc::new(Player::bot(format!("Bot {}", seat + 1), seat)))
            .collect()
    }

    fn round_with(players: Vec<Arc<Player>>) -> Round {
        Round::new(Uuid::new_v4(), players, RoundSettings::default(), 42)
    }

    #[test]
    fn last_car_standing_wins() {
        let round = round_with(bots(5));
        round.set_state(RoundState::Running);
        for player in &round.players()[..4] {
            player.kill();
        }
        match round.check_game_over(Instant::now()) {
            Some(GameOver::Winner(winner)) => assert_eq!(winner.seat, 4),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(round.state(), RoundState::Finished);
        assert!(round.check_game_over(Instant::now()).is_none());
    }

    #[tokio::test]
    async fn running_round_times_out() {
        let connection = Connection::spawn(tokio::io::sink(), "alice");
        let human = Player::human("alice".into(), 0, connection, Box::new(tokio::io::empty()));
        let mut players = vec![Arc::new(human)];
        players.extend(bots(3).into_iter().skip(1));
        let round = round_with(players);
        round.set_state(RoundState::Running);
        assert!(round.check_game_over(Instant::now()).is_none());

        let later = Instant::now() + RoundSettings::default().time_limit + Duration::from_secs(1);
        assert!(matches!(round.check_game_over(later), Some(GameOver::TimeUp)));
        assert!(round.state().is_finished());
    }

    #[test]
    fn heart_goes_to_one_car_only() {
        let round = round_with(bots(2));
        round.place_bonus(Point::new(30, 10));
        let hitbox = Rectangle::new(Point::new(28, 9), 7, 3);
        assert!(round.claim_bonus(&hitbox));
        assert!(!round.claim_bonus(&hitbox));
        assert_eq!(round.bonus(), None);
    }

    #[test]
    fn bonus_spawns_inside_arena() {
        let round = round_with(bots(1));
        for _ in 0..10_000 {
            round.maybe_spawn_bonus();
            if round.bonus().is_some() {
                break;
            }
        }
        let bonus = round.bonus().expect("a heart appears eventually");
        assert!(crate::game::combat::arena().contains(&Rectangle::cell(bonus)));
    }

    #[test]
    fn bombs_are_never_credited_twice() {
        use crate::game::combat::CombatSystem;

        for _ in 0..20 {
            let round = Arc::new(round_with(bots(5)));
            let spot = Point::new(40, 20);
            for player in round.players() {
                player.with_car(|car| car.borders = Rectangle::new(Point::new(37, 19), 7, 3));
            }

            let dropper = {
                let round = Arc::clone(&round);
                thread::spawn(move || (0..50).filter(|_| round.bombs().insert(spot)).count())
            };
            let pickers: Vec<_> = round
                .players()
                .iter()
                .map(|player| {
                    let (round, player) = (Arc::clone(&round), Arc::clone(player));
                    thread::spawn(move || {
                        (0..200)
                            .map(|_| CombatSystem::trigger_bombs(&round, &player, 1))
                            .sum::<usize>()
                    })
                })
                .collect();

            let dropped = dropper.join().expect("dropper");
            let credited: usize = pickers.into_iter().map(|h| h.join().expect("picker")).sum();
            let left = round.bombs().len();
            let health_lost: i64 = round.players().iter().map(|p| 100 - p.health()).sum();

            assert_eq!(credited + left, dropped);
            assert_eq!(health_lost, credited as i64 * crate::game::constants::BONUS_POINT);
        }
    }
}
