//! Car movement timing, speed ramp and health clamping

use std::time::Duration;

use super::constants::{
    CRASH_COOLDOWN_MS, DIVIDER_COLUMN, MAP_HEIGHT, MAX_HEALTH, MAX_SPEED, MOVE_PERIOD_MS,
    SPEED_STEP_MS, VERTICAL_SLOWDOWN,
};
use super::geometry::{Direction, Point, Rectangle};

pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Time between two one-cell moves
    pub fn move_period(direction: Direction, speed: i64) -> Duration {
        let slowdown = if direction.is_vertical() {
            VERTICAL_SLOWDOWN
        } else {
            1
        };
        let speed = speed.clamp(1, MAX_SPEED) as u64;
        Duration::from_millis(slowdown * MOVE_PERIOD_MS / speed)
    }

    /// Next speed given the time since the last crash.
    ///
    /// A car gains one level once it has gone `SPEED_STEP_MS` per current
    /// level without crashing, and drops to 1 right after a crash.
    pub fn next_speed(speed: i64, since_crash_ms: i64) -> i64 {
        let next = if since_crash_ms > speed * SPEED_STEP_MS && speed < MAX_SPEED {
            speed + 1
        } else if since_crash_ms < CRASH_COOLDOWN_MS {
            1
        } else {
            speed
        };
        next.clamp(1, MAX_SPEED)
    }

    /// Clamp health into range, returning the value and whether the car is wrecked
    pub fn clamp_health(health: i64) -> (i64, bool) {
        let clamped = health.clamp(0, MAX_HEALTH);
        (clamped, clamped == 0)
    }

    /// Cell right behind the car, centered on its rear face
    pub fn bomb_drop_point(borders: &Rectangle, direction: Direction) -> Point {
        let mid_x = borders.left() + borders.width() / 2;
        let mid_y = borders.top() + borders.height() / 2;
        match direction {
            Direction::Left => Point::new(borders.right() + 1, mid_y),
            Direction::Right => Point::new(borders.left() - 1, mid_y),
            Direction::Up => Point::new(mid_x, borders.bottom() + 1),
            Direction::Down => Point::new(mid_x, borders.top() - 1),
        }
    }

    /// Bombs are only placed well clear of the border
    pub fn bomb_fits(point: Point) -> bool {
        point.x > 1 && point.x < DIVIDER_COLUMN - 1 && point.y > 1 && point.y < MAP_HEIGHT - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertical_moves_are_slower() {
        for speed in 1..=MAX_SPEED {
            assert!(
                PhysicsSystem::move_period(Direction::Up, speed)
                    > PhysicsSystem::move_period(Direction::Left, speed)
            );
        }
        assert_eq!(
            PhysicsSystem::move_period(Direction::Right, 1),
            Duration::from_millis(150)
        );
        assert_eq!(
            PhysicsSystem::move_period(Direction::Down, 3),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn speed_ramps_after_quiet_period() {
        assert_eq!(PhysicsSystem::next_speed(1, 2_001), 2);
        assert_eq!(PhysicsSystem::next_speed(2, 3_000), 2);
        assert_eq!(PhysicsSystem::next_speed(2, 4_001), 3);
        assert_eq!(PhysicsSystem::next_speed(MAX_SPEED, 60_000), MAX_SPEED);
    }

    #[test]
    fn recent_crash_resets_speed() {
        assert_eq!(PhysicsSystem::next_speed(4, 500), 1);
        assert_eq!(PhysicsSystem::next_speed(4, -8_000), 1);
    }

    #[test]
    fn speed_stays_in_bounds_over_any_sequence() {
        let mut speed = 1;
        let mut elapsed = -10_000;
        for step in 0..2_000 {
            elapsed = if step % 37 == 0 { 0 } else { elapsed + 700 };
            speed = PhysicsSystem::next_speed(speed, elapsed);
            assert!((1..=MAX_SPEED).contains(&speed));
        }
        for (speed, since) in [(-3, 100_000), (42, 100_000), (0, 0)] {
            let next = PhysicsSystem::next_speed(speed, since);
            assert!((1..=MAX_SPEED).contains(&next));
        }
    }

    #[test]
    fn health_clamp_is_idempotent() {
        for health in [-40, -1, 0, 1, 57, 100, 105, 1_000] {
            let (once, dead) = PhysicsSystem::clamp_health(health);
            let (twice, dead_again) = PhysicsSystem::clamp_health(once);
            assert_eq!(once, twice);
            assert_eq!(dead, dead_again);
            assert_eq!(dead, health <= 0);
        }
    }

    #[test]
    fn bombs_drop_behind_the_car() {
        let horizontal = Rectangle::new(Point::new(10, 10), 7, 3);
        assert_eq!(
            PhysicsSystem::bomb_drop_point(&horizontal, Direction::Right),
            Point::new(9, 11)
        );
        assert_eq!(
            PhysicsSystem::bomb_drop_point(&horizontal, Direction::Left),
            Point::new(17, 11)
        );
        let vertical = Rectangle::new(Point::new(10, 10), 5, 3);
        assert_eq!(
            PhysicsSystem::bomb_drop_point(&vertical, Direction::Down),
            Point::new(12, 9)
        );
        assert_eq!(
            PhysicsSystem::bomb_drop_point(&vertical, Direction::Up),
            Point::new(12, 13)
        );
    }

    #[test]
    fn bombs_stay_clear_of_the_border() {
        assert!(PhysicsSystem::bomb_fits(Point::new(2, 2)));
        assert!(!PhysicsSystem::bomb_fits(Point::new(1, 10)));
        assert!(!PhysicsSystem::bomb_fits(Point::new(DIVIDER_COLUMN - 1, 10)));
        assert!(!PhysicsSystem::bomb_fits(Point::new(20, MAP_HEIGHT - 1)));
    }
}
