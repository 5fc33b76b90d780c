//! Players, their cars and seat layout

use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use tokio::io::AsyncReadExt;

use crate::net::connection::{Connection, InputStream};
use crate::util::time::unix_millis;

use super::constants::{
    color, DIVIDER_COLUMN, HORIZONTAL_CAR, MAP_HEIGHT, MAX_HEALTH, SEATED_HOLD_MS,
    STARTING_BOMBS, VERTICAL_CAR,
};
use super::combat::arena;
use super::geometry::{Direction, Point, Rectangle};

/// Reads per lobby tick spent draining a waiting player's input
const LOBBY_DRAIN_READS: usize = 16;

/// Footprint `(width, height)` for a car facing `direction`
pub fn footprint(direction: Direction) -> (i32, i32) {
    if direction.is_vertical() {
        VERTICAL_CAR
    } else {
        HORIZONTAL_CAR
    }
}

/// Starting rectangle and facing for a seat: four corners and the middle
pub fn seat_layout(seat: usize) -> (Point, Direction) {
    let (hw, hh) = HORIZONTAL_CAR;
    let (vw, vh) = VERTICAL_CAR;
    match seat {
        0 => (Point::new(1, 1), Direction::Right),
        1 => (Point::new(DIVIDER_COLUMN - vw, 1), Direction::Down),
        2 => (Point::new(DIVIDER_COLUMN - hw, MAP_HEIGHT - hh - 1), Direction::Left),
        3 => (Point::new(1, MAP_HEIGHT - vh - 1), Direction::Up),
        _ => (Point::new(DIVIDER_COLUMN / 2, MAP_HEIGHT / 2), Direction::Down),
    }
}

/// Display color for a seat
pub fn seat_color(seat: usize) -> u8 {
    color::RED + seat as u8
}

/// Hitbox, facing and speed of a car
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Car {
    pub borders: Rectangle,
    pub direction: Direction,
    pub speed: i64,
}

impl Car {
    pub fn new(origin: Point, direction: Direction) -> Self {
        let (width, height) = footprint(direction);
        Self {
            borders: Rectangle::new(origin, width, height),
            direction,
            speed: 1,
        }
    }

    pub fn at_seat(seat: usize) -> Self {
        let (origin, direction) = seat_layout(seat);
        Self::new(origin, direction)
    }

    /// Face `direction`, reshaping the hitbox around its top-left corner
    pub fn face(&mut self, direction: Direction) {
        if direction.is_vertical() != self.direction.is_vertical() {
            let (width, height) = footprint(direction);
            self.borders = self.borders.resize(width, height).clamp_within(&arena());
        }
        self.direction = direction;
    }

    /// Move one cell forward
    pub fn advance(&mut self) {
        self.borders = self.borders.step(self.direction, 1);
    }

    /// Push back one car length against the direction of travel, then turn around.
    /// The car never leaves the arena.
    pub fn bounce(&mut self) {
        let length = if self.direction.is_vertical() {
            self.borders.height()
        } else {
            self.borders.width()
        };
        self.borders = self
            .borders
            .step(self.direction.opposite(), length)
            .clamp_within(&arena());
        self.direction = self.direction.opposite();
    }
}

/// A seat in a round, human or bot.
///
/// Loops of the same round touch these fields concurrently, so every scalar
/// is an atomic and the car sits behind its own small lock.
pub struct Player {
    pub name: String,
    pub seat: usize,
    connection: Option<Connection>,
    input: Mutex<Option<InputStream>>,
    car: Mutex<Car>,
    health: AtomicI64,
    bombs: AtomicI64,
    drop_bomb: AtomicBool,
    /// Unix millis of the last crash
    last_crash: AtomicU64,
    color: AtomicU8,
}

impl Player {
    fn seated(name: String, seat: usize, connection: Option<Connection>, input: Option<InputStream>) -> Self {
        Self {
            name,
            seat,
            connection,
            input: Mutex::new(input),
            car: Mutex::new(Car::at_seat(seat)),
            health: AtomicI64::new(MAX_HEALTH),
            bombs: AtomicI64::new(STARTING_BOMBS),
            drop_bomb: AtomicBool::new(false),
            last_crash: AtomicU64::new(unix_millis() + SEATED_HOLD_MS),
            color: AtomicU8::new(seat_color(seat)),
        }
    }

    pub fn human(name: String, seat: usize, connection: Connection, input: InputStream) -> Self {
        Self::seated(name, seat, Some(connection), Some(input))
    }

    pub fn bot(name: String, seat: usize) -> Self {
        Self::seated(name, seat, None, None)
    }

    pub fn is_bot(&self) -> bool {
        self.connection.is_none()
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.connection.as_ref()
    }

    /// Hand the keystroke stream to the input loop, once
    pub fn take_input(&self) -> Option<InputStream> {
        self.input.lock().take()
    }

    pub fn car(&self) -> Car {
        *self.car.lock()
    }

    /// Mutate the car under its lock
    pub fn with_car<R>(&self, f: impl FnOnce(&mut Car) -> R) -> R {
        f(&mut self.car.lock())
    }

    pub fn health(&self) -> i64 {
        self.health.load(Ordering::Acquire)
    }

    pub fn set_health(&self, health: i64) {
        self.health.store(health, Ordering::Release);
    }

    /// Add `delta` to health, unclamped
    pub fn adjust_health(&self, delta: i64) {
        self.health.fetch_add(delta, Ordering::AcqRel);
    }

    /// Apply `f` to health atomically, returning the new value
    pub fn update_health(&self, f: impl Fn(i64) -> i64) -> i64 {
        let previous = self
            .health
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |h| Some(f(h)))
            .unwrap_or_else(|h| h);
        f(previous)
    }

    pub fn kill(&self) {
        self.set_health(0);
    }

    pub fn is_alive(&self) -> bool {
        self.health() > 0
    }

    pub fn bombs(&self) -> i64 {
        self.bombs.load(Ordering::Acquire)
    }

    pub fn add_bomb(&self) {
        self.bombs.fetch_add(1, Ordering::AcqRel);
    }

    /// Take one bomb from the inventory if there is any
    pub fn spend_bomb(&self) -> bool {
        self.bombs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n > 0).then(|| n - 1))
            .is_ok()
    }

    /// Ask the bomb loop to drop a bomb; ignored with an empty inventory
    pub fn request_bomb(&self) -> bool {
        if self.bombs() > 0 {
            self.drop_bomb.store(true, Ordering::Release);
            true
        } else {
            false
        }
    }

    pub fn bomb_requested(&self) -> bool {
        self.drop_bomb.load(Ordering::Acquire)
    }

    pub fn clear_bomb_request(&self) {
        self.drop_bomb.store(false, Ordering::Release);
    }

    pub fn last_crash(&self) -> u64 {
        self.last_crash.load(Ordering::Acquire)
    }

    pub fn stamp_crash(&self, now: u64) {
        self.last_crash.store(now, Ordering::Release);
    }

    pub fn color(&self) -> u8 {
        self.color.load(Ordering::Acquire)
    }

    pub fn mark_defeated(&self) {
        self.color.store(color::BOLD, Ordering::Release);
    }

    /// True once the writer side of a human connection has failed
    /// Throw away keystrokes typed before the round starts, without waiting.
    /// Returns true once the client has hung up.
    pub fn discard_pending_input(&self) -> bool {
        let mut input = self.input.lock();
        if let Some(stream) = input.as_mut() {
            let mut buf = [0u8; 64];
            for _ in 0..LOBBY_DRAIN_READS {
                match stream.read(&mut buf).now_or_never() {
                    Some(Ok(0)) | Some(Err(_)) => {
                        if let Some(connection) = &self.connection {
                            connection.mark_lost();
                        }
                        break;
                    }
                    Some(Ok(_)) => {}
                    None => break,
                }
            }
        }
        self.connection_lost()
    }

    pub fn connection_lost(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_lost())
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("name", &self.name)
            .field("seat", &self.seat)
            .field("bot", &self.is_bot())
            .field("health", &self.health())
            .field("car", &self.car())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::SEAT_COUNT;

    #[test]
    fn seats_start_inside_arena_without_overlap() {
        let arena = crate::game::combat::arena();
        let cars: Vec<Car> = (0..SEAT_COUNT).map(Car::at_seat).collect();
        for (i, a) in cars.iter().enumerate() {
            assert!(arena.contains(&a.borders), "seat {i} outside arena");
            for b in cars.iter().skip(i + 1) {
                assert!(!a.borders.intersects(&b.borders));
            }
        }
        assert_eq!(cars[2].borders, Rectangle::new(Point::new(142, 34), 7, 3));
        assert_eq!(cars[4].direction, Direction::Down);
    }

    #[test]
    fn turning_reshapes_footprint() {
        let mut car = Car::at_seat(0);
        car.face(Direction::Down);
        assert_eq!((car.borders.width(), car.borders.height()), VERTICAL_CAR);
        car.face(Direction::Up);
        assert_eq!((car.borders.width(), car.borders.height()), VERTICAL_CAR);
        car.face(Direction::Left);
        assert_eq!((car.borders.width(), car.borders.height()), HORIZONTAL_CAR);
    }

    #[test]
    fn turning_at_the_right_wall_stays_inside() {
        let arena = crate::game::combat::arena();
        let mut car = Car::at_seat(1);
        car.face(Direction::Left);
        assert!(arena.contains(&car.borders));
        assert_eq!(car.borders.right(), arena.right());
        assert_eq!((car.borders.width(), car.borders.height()), HORIZONTAL_CAR);
    }

    #[test]
    fn bounce_off_a_car_near_the_wall_stays_inside() {
        let arena = crate::game::combat::arena();
        let mut car = Car::new(Point::new(2, 10), Direction::Right);
        car.bounce();
        assert!(arena.contains(&car.borders));
        assert_eq!(car.borders.left(), arena.left());
        assert_eq!(car.direction, Direction::Left);
    }

    #[test]
    fn bounce_pushes_back_one_length_and_reverses() {
        let mut car = Car::new(Point::new(20, 10), Direction::Right);
        car.advance();
        assert_eq!(car.borders.left(), 21);
        car.bounce();
        assert_eq!(car.borders.left(), 14);
        assert_eq!(car.direction, Direction::Left);

        let mut car = Car::new(Point::new(20, 10), Direction::Up);
        car.bounce();
        assert_eq!(car.borders.top(), 13);
        assert_eq!(car.direction, Direction::Down);
    }

    #[test]
    fn bomb_inventory_never_goes_negative() {
        let player = Player::bot("Bot 1".into(), 0);
        assert!(player.spend_bomb());
        assert!(!player.spend_bomb());
        assert_eq!(player.bombs(), 0);
        assert!(!player.request_bomb());
        player.add_bomb();
        assert!(player.request_bomb());
        assert!(player.bomb_requested());
    }

    #[test]
    fn defeat_switches_to_bold() {
        let player = Player::bot("Bot 2".into(), 3);
        assert_eq!(player.color(), color::RED + 3);
        player.mark_defeated();
        assert_eq!(player.color(), color::BOLD);
    }
}
