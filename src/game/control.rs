//! Per-player control loops.
//!
//! Every seat runs five tasks for the lifetime of its round: input (or the
//! bot brain), position, speed, health and bombs. Each loop stops once its
//! car is wrecked or the round finishes. The `step_*` functions hold one
//! iteration of each loop so they can be driven directly.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::net::telnet::{Key, KeyDecoder, CHARACTER_MODE};
use crate::util::rate_limit::KeystrokeLimiter;
use crate::util::time::{millis_between, unix_millis};

use super::bot::BotBrain;
use super::combat::{CombatSystem, Impact};
use super::constants::{AI_PERIOD, BOMB_REFILL_ODDS, CONTROL_PERIOD, HIGH_FACTOR};
use super::geometry::Rectangle;
use super::physics::PhysicsSystem;
use super::player::{Car, Player};
use super::round::{Round, RoundState};

/// Sleep for `period`; false once the round has finished
async fn idle(state: &mut watch::Receiver<RoundState>, period: Duration) -> bool {
    tokio::select! {
        _ = sleep(period) => {}
        _ = state.wait_for(|s| s.is_finished()) => return false,
    }
    !state.borrow().is_finished()
}

fn done(round: &Round, player: &Player) -> bool {
    !player.is_alive() || round.state().is_finished()
}

/// Apply one keystroke
pub fn apply_key(player: &Player, key: Key) {
    match key {
        Key::Steer(direction) => player.with_car(|car| {
            // no U-turns, asking for one brakes instead
            if direction == car.direction.opposite() {
                car.speed = 1;
            } else {
                car.face(direction);
            }
        }),
        Key::Bomb => {
            player.request_bomb();
        }
        Key::Quit => player.kill(),
    }
}

/// Move one cell, then resolve the heart, bombs and collisions in that order
pub fn step_position(round: &Round, player: &Player, now: u64) -> Option<Impact> {
    player.with_car(Car::advance);
    CombatSystem::collect_bonus(round, player);
    CombatSystem::trigger_bombs(round, player, now);

    let impact = CombatSystem::detect_impact(&player.car(), &round.opponents_of(player.seat));
    if let Some(impact) = &impact {
        CombatSystem::apply_impact(player, impact, now);
    }
    impact
}

pub fn step_speed(player: &Player, now: u64) {
    let since_crash = millis_between(player.last_crash(), now);
    player.with_car(|car| car.speed = PhysicsSystem::next_speed(car.speed, since_crash));
}

/// Clamp health; returns true once the car is wrecked
pub fn step_health(player: &Player) -> bool {
    if player.connection_lost() {
        player.kill();
    }
    let health = player.update_health(|h| PhysicsSystem::clamp_health(h).0);
    let wrecked = PhysicsSystem::clamp_health(health).1;
    if wrecked {
        player.mark_defeated();
    }
    wrecked
}

/// Drop a requested bomb, or maybe earn a new one
pub fn step_bombs(round: &Round, player: &Player) {
    if player.bomb_requested() {
        let car = player.car();
        let spot = PhysicsSystem::bomb_drop_point(&car.borders, car.direction);
        // out-of-field requests stay pending until the car moves on
        if PhysicsSystem::bomb_fits(spot) {
            let mut bombs = round.bombs();
            if !bombs.contains(&spot) && player.spend_bomb() {
                bombs.insert(spot);
            }
            player.clear_bomb_request();
        }
    } else if round.state() == RoundState::Running && round.roll(BOMB_REFILL_ODDS) {
        player.add_bomb();
    }
}

/// One decision of the bot brain
pub fn step_bot(round: &Round, player: &Player) {
    if player.bombs() > 0 && round.roll(HIGH_FACTOR) {
        player.request_bomb();
    }

    let own = player.car();
    let Some(target) = BotBrain::choose_target(round, player.seat, &own) else {
        return;
    };
    let obstacles: Vec<Rectangle> = round
        .opponents_of(player.seat)
        .into_iter()
        .filter(|(seat, _)| Some(*seat) != target.seat)
        .map(|(_, car)| car.borders)
        .collect();
    let direction = BotBrain::steer(&own, target.point, &obstacles);
    player.with_car(|car| car.face(direction));
}

/// Keystrokes from a human's terminal
pub async fn read_input(round: Arc<Round>, player: Arc<Player>) {
    let Some(mut input) = player.take_input() else {
        return;
    };
    if let Some(connection) = player.connection() {
        let _ = connection.send_raw(bytes::Bytes::from_static(CHARACTER_MODE));
    }

    let limiter = KeystrokeLimiter::new();
    let mut decoder = KeyDecoder::default();
    let mut state = round.subscribe();

    while !done(&round, &player) {
        let key = tokio::select! {
            key = decoder.read_key(&mut input) => key,
            _ = state.wait_for(|s| s.is_finished()) => return,
        };
        match key {
            Ok(Key::Quit) => {
                info!(round_id = %round.id, player = %player.name, "Player quit");
                apply_key(&player, Key::Quit);
            }
            Ok(key) if limiter.check() => apply_key(&player, key),
            Ok(_) => {}
            Err(err) => {
                debug!(round_id = %round.id, player = %player.name, error = %err, "Input closed");
                player.kill();
            }
        }
    }
}

/// Bot brain, only acts while the round runs
pub async fn drive_bot(round: Arc<Round>, player: Arc<Player>) {
    let mut state = round.subscribe();
    while idle(&mut state, AI_PERIOD).await && player.is_alive() {
        if round.state() == RoundState::Running {
            step_bot(&round, &player);
        }
    }
}

pub async fn track_position(round: Arc<Round>, player: Arc<Player>) {
    let mut state = round.subscribe();
    while !done(&round, &player) {
        if round.state() == RoundState::Running {
            if let Some(impact) = step_position(&round, &player, unix_millis()) {
                debug!(
                    round_id = %round.id,
                    player = %player.name,
                    damage = impact.damage(),
                    "Crash"
                );
            }
        }
        let car = player.car();
        if !idle(&mut state, PhysicsSystem::move_period(car.direction, car.speed)).await {
            return;
        }
    }
}

pub async fn track_speed(round: Arc<Round>, player: Arc<Player>) {
    let mut state = round.subscribe();
    while !done(&round, &player) {
        step_speed(&player, unix_millis());
        if !idle(&mut state, CONTROL_PERIOD).await {
            return;
        }
    }
}

pub async fn track_health(round: Arc<Round>, player: Arc<Player>) {
    let mut state = round.subscribe();
    loop {
        if step_health(&player) {
            info!(round_id = %round.id, player = %player.name, "Car wrecked");
            return;
        }
        if !idle(&mut state, CONTROL_PERIOD).await {
            return;
        }
    }
}

pub async fn track_bombs(round: Arc<Round>, player: Arc<Player>) {
    let mut state = round.subscribe();
    while !done(&round, &player) {
        step_bombs(&round, &player);
        if !idle(&mut state, CONTROL_PERIOD).await {
            return;
        }
    }
}
