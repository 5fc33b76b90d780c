//! Combat system - walls, ramming, hearts and bombs

use super::constants::{
    BACK_DAMAGE, BONUS_POINT, DIVIDER_COLUMN, FRONT_DAMAGE, MAP_HEIGHT, MAX_SPEED, SIDE_DAMAGE,
};
use super::geometry::{Direction, Rectangle};
use super::player::{Car, Player};
use super::round::Round;

/// Cells a car may occupy: inside the border, left of the HUD divider
pub fn arena() -> Rectangle {
    Rectangle::from_bounds(1, 1, DIVIDER_COLUMN - 1, MAP_HEIGHT - 2)
}

/// Which face of a car took the hit, relative to where it drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strike {
    /// Struck on the face it drives towards
    Front,
    /// Struck on its tail
    Back,
    Side,
}

/// How the two cars were moving relative to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approach {
    FaceToFace,
    Crossing,
    /// Same direction, one rear-ending the other
    Trailing,
}

/// Outcome of a collision check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Wall {
        damage: i64,
    },
    Car {
        /// Seat of the opponent
        opponent: usize,
        strike: Option<Strike>,
        approach: Approach,
        damage: i64,
    },
}

impl Impact {
    pub fn damage(&self) -> i64 {
        match self {
            Impact::Wall { damage } | Impact::Car { damage, .. } => *damage,
        }
    }
}

/// Collision and pickup rules
pub struct CombatSystem;

impl CombatSystem {
    pub fn wall_damage(speed: i64) -> i64 {
        FRONT_DAMAGE * speed
    }

    /// Classify a hit on `side` of a car heading `own`
    pub fn classify_strike(side: Direction, own: Direction) -> Strike {
        if side == own {
            Strike::Front
        } else if side == own.opposite() {
            Strike::Back
        } else {
            Strike::Side
        }
    }

    pub fn strike_damage(strike: Strike, own_speed: i64) -> i64 {
        match strike {
            Strike::Front => FRONT_DAMAGE * own_speed,
            Strike::Back => BACK_DAMAGE * (MAX_SPEED - own_speed),
            Strike::Side => SIDE_DAMAGE,
        }
    }

    pub fn classify_approach(own: Direction, other: Direction) -> Approach {
        if own == other.opposite() {
            Approach::FaceToFace
        } else if own.is_perpendicular(other) {
            Approach::Crossing
        } else {
            Approach::Trailing
        }
    }

    /// Second damage term, applied on top of the struck-face term.
    ///
    /// A faster car rear-ending a slower one gets hurt, the slower one is
    /// credited the difference.
    pub fn approach_damage(approach: Approach, own_speed: i64, other_speed: i64) -> i64 {
        match approach {
            Approach::FaceToFace => FRONT_DAMAGE * own_speed,
            Approach::Crossing => SIDE_DAMAGE * own_speed,
            Approach::Trailing => BACK_DAMAGE * (own_speed - other_speed),
        }
    }

    /// Check `own` against the walls, then against `opponents` in seat order.
    /// Only the first opponent hit counts.
    pub fn detect_impact(own: &Car, opponents: &[(usize, Car)]) -> Option<Impact> {
        if !arena().contains(&own.borders) {
            return Some(Impact::Wall {
                damage: Self::wall_damage(own.speed),
            });
        }

        opponents
            .iter()
            .find(|(_, other)| own.borders.intersects(&other.borders))
            .map(|(seat, other)| {
                let strike = own
                    .borders
                    .next_to(&other.borders, 0)
                    .map(|side| Self::classify_strike(side, own.direction));
                let approach = Self::classify_approach(own.direction, other.direction);
                let damage = strike.map_or(0, |s| Self::strike_damage(s, own.speed))
                    + Self::approach_damage(approach, own.speed, other.speed);
                Impact::Car {
                    opponent: *seat,
                    strike,
                    approach,
                    damage,
                }
            })
    }

    /// Take the damage, bounce and stamp the crash time
    pub fn apply_impact(player: &Player, impact: &Impact, now: u64) {
        player.adjust_health(-impact.damage());
        player.with_car(Car::bounce);
        player.stamp_crash(now);
    }

    /// Collect the heart if the car covers it
    pub fn collect_bonus(round: &Round, player: &Player) -> bool {
        let hitbox = player.car().borders;
        if !round.claim_bonus(&hitbox) {
            return false;
        }
        player.adjust_health(BONUS_POINT);
        player.with_car(|car| car.speed = MAX_SPEED);
        true
    }

    /// Set off every bomb under the car. Removal and damage share the lock.
    pub fn trigger_bombs(round: &Round, player: &Player, now: u64) -> usize {
        let hitbox = player.car().borders;
        let mut bombs = round.bombs();
        let before = bombs.len();
        bombs.retain(|&bomb| !Rectangle::cell(bomb).intersects(&hitbox));
        let triggered = before - bombs.len();
        for _ in 0..triggered {
            player.adjust_health(-BONUS_POINT);
            player.stamp_crash(now);
            player.with_car(|car| car.speed = 1);
        }
        triggered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Point;

    #[test]
    fn wall_damage_grows_with_speed() {
        let damages: Vec<i64> = (1..=MAX_SPEED).map(CombatSystem::wall_damage).collect();
        assert!(damages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(damages[0], FRONT_DAMAGE);
    }

    #[test]
    fn leaving_arena_is_a_wall_hit() {
        let mut car = Car::at_seat(0);
        car.face(Direction::Left);
        car.speed = 3;
        car.advance();
        assert_eq!(
            CombatSystem::detect_impact(&car, &[]),
            Some(Impact::Wall { damage: 12 })
        );
    }

    #[test]
    fn strike_table() {
        use Direction::*;
        assert_eq!(CombatSystem::classify_strike(Right, Right), Strike::Front);
        assert_eq!(CombatSystem::classify_strike(Left, Right), Strike::Back);
        assert_eq!(CombatSystem::classify_strike(Up, Right), Strike::Side);
        assert_eq!(CombatSystem::classify_strike(Left, Down), Strike::Side);

        assert_eq!(CombatSystem::strike_damage(Strike::Front, 3), 12);
        assert_eq!(CombatSystem::strike_damage(Strike::Back, 2), 6);
        assert_eq!(CombatSystem::strike_damage(Strike::Side, 5), SIDE_DAMAGE);
    }

    #[test]
    fn approach_table() {
        use Direction::*;
        assert_eq!(CombatSystem::classify_approach(Up, Down), Approach::FaceToFace);
        assert_eq!(CombatSystem::classify_approach(Up, Left), Approach::Crossing);
        assert_eq!(CombatSystem::classify_approach(Up, Up), Approach::Trailing);

        assert_eq!(CombatSystem::approach_damage(Approach::Crossing, 2, 5), 2 * SIDE_DAMAGE);
        assert_eq!(CombatSystem::approach_damage(Approach::Trailing, 2, 5), -6);
    }

    #[test]
    fn head_on_crash_hurts_both_from_the_front() {
        let now = 1_700_000_000_000;
        let a = Player::bot("Bot 1".into(), 0);
        let b = Player::bot("Bot 2".into(), 2);
        a.with_car(|car| *car = Car::new(Point::new(60, 10), Direction::Right));
        b.with_car(|car| *car = Car::new(Point::new(68, 10), Direction::Left));

        a.with_car(Car::advance);
        b.with_car(Car::advance);
        let (car_a, car_b) = (a.car(), b.car());

        let hit_a = CombatSystem::detect_impact(&car_a, &[(2, car_b)]).expect("a is hit");
        let hit_b = CombatSystem::detect_impact(&car_b, &[(0, car_a)]).expect("b is hit");
        for hit in [hit_a, hit_b] {
            match hit {
                Impact::Car {
                    strike, approach, damage, ..
                } => {
                    assert_eq!(strike, Some(Strike::Front));
                    assert_eq!(CombatSystem::strike_damage(Strike::Front, 1), FRONT_DAMAGE);
                    assert_eq!(approach, Approach::FaceToFace);
                    assert_eq!(damage, 2 * FRONT_DAMAGE);
                }
                other => panic!("unexpected impact {other:?}"),
            }
        }

        CombatSystem::apply_impact(&a, &hit_a, now);
        CombatSystem::apply_impact(&b, &hit_b, now);

        assert_eq!(a.health(), 100 - 2 * FRONT_DAMAGE);
        assert_eq!(b.health(), 100 - 2 * FRONT_DAMAGE);
        assert_eq!(a.car().direction, Direction::Left);
        assert_eq!(b.car().direction, Direction::Right);
        assert_eq!(a.last_crash(), now);
        assert_eq!(b.last_crash(), now);
        assert!(!a.car().borders.intersects(&b.car().borders));
    }

    #[test]
    fn only_first_opponent_counts() {
        let own = Car::new(Point::new(20, 20), Direction::Up);
        let first = Car::new(Point::new(18, 18), Direction::Right);
        let second = Car::new(Point::new(22, 21), Direction::Left);
        match CombatSystem::detect_impact(&own, &[(1, first), (4, second)]) {
            Some(Impact::Car { opponent, approach, .. }) => {
                assert_eq!(opponent, 1);
                assert_eq!(approach, Approach::Crossing);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
