//! Arena dimensions and gameplay tuning

use std::time::Duration;

/// Full frame width in cells, including the trailing `\r` and `\n` columns
pub const MAP_WIDTH: i32 = 179;
/// Full frame height in rows
pub const MAP_HEIGHT: i32 = 38;
/// Width of the HUD column on the right-hand side
pub const NAME_TABLE_WIDTH: i32 = 30;
/// Column of the divider between arena and HUD
pub const DIVIDER_COLUMN: i32 = MAP_WIDTH - NAME_TABLE_WIDTH;

/// Footprint of a car facing left or right
pub const HORIZONTAL_CAR: (i32, i32) = (7, 3);
/// Footprint of a car facing up or down
pub const VERTICAL_CAR: (i32, i32) = (5, 3);

pub const MAX_SPEED: i64 = 5;
pub const MAX_HEALTH: i64 = 100;
pub const STARTING_BOMBS: i64 = 1;

// Damage units; most are scaled by speed
pub const BACK_DAMAGE: i64 = 2;
pub const FRONT_DAMAGE: i64 = 4;
pub const SIDE_DAMAGE: i64 = 6;

/// Health gained from a heart and lost to a bomb
pub const BONUS_POINT: i64 = 5;

/// 1 in LOW_FACTOR chance per frame for a heart to appear
pub const LOW_FACTOR: u32 = 50;
/// 1 in HIGH_FACTOR chance per AI step for a bot to drop a bomb
pub const HIGH_FACTOR: u32 = 5;
/// 1 in this chance per control tick to gain a bomb
pub const BOMB_REFILL_ODDS: u32 = HIGH_FACTOR * LOW_FACTOR;

pub const FRAMES_PER_SECOND: u32 = 10;
pub const FRAME_PERIOD: Duration = Duration::from_millis(1000 / FRAMES_PER_SECOND as u64);
/// Frames shown with the "get ready" banner before the round runs
pub const GET_READY_FRAMES: u32 = 5 * FRAMES_PER_SECOND;

/// Period of the speed, health and bomb loops
pub const CONTROL_PERIOD: Duration = Duration::from_millis(100);
/// Horizontal move period at speed 1
pub const MOVE_PERIOD_MS: u64 = 150;
/// Vertical moves are this many times slower, glyphs are taller than wide
pub const VERTICAL_SLOWDOWN: u64 = 3;
pub const AI_PERIOD: Duration = Duration::from_millis(500);
/// Margin a bot keeps from other cars when turning
pub const AI_SAFETY_MARGIN: i32 = 3;
/// Distance at which a bot goes for a heart instead of its target
pub const AI_BONUS_RANGE: i32 = 5;

/// Window after a crash during which speed stays at 1
pub const CRASH_COOLDOWN_MS: i64 = 2_000;
/// Per speed level hold before the next speed step
pub const SPEED_STEP_MS: i64 = 2_000;
/// Fresh cars keep speed 1 for this long after being seated
pub const SEATED_HOLD_MS: u64 = 10_000;

/// How long the winner banner stays on screen
pub const WINNER_BANNER_HOLD: Duration = Duration::from_secs(5);
/// Lobby scheduler period
pub const LOBBY_TICK: Duration = Duration::from_secs(1);

pub const MAX_NAME_LENGTH: usize = 25;
/// Number of fixed starting positions
pub const SEAT_COUNT: usize = 5;
/// Upper bound for the generated `Bot N` names
pub const BOT_NAME_POOL: u32 = 10;

/// ANSI SGR codes used for cells
pub mod color {
    pub const RESET: u8 = 0;
    pub const BOLD: u8 = 1;
    pub const RED: u8 = 31;
    pub const GREEN: u8 = 32;
}

/// Raw terminal control sequences
pub mod term {
    pub const HOME: &[u8] = b"\x1b[H";
    pub const CLEAR: &[u8] = b"\x1b[2J";
}

pub const HEART: char = '\u{2665}';
pub const BOMB: char = '\u{2733}';
