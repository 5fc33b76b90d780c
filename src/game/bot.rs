//! Bot driving - target selection and greedy steering

use super::constants::{AI_BONUS_RANGE, AI_SAFETY_MARGIN};
use super::geometry::{Direction, Point, Rectangle};
use super::player::Car;
use super::round::Round;

/// Where a bot is heading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub point: Point,
    /// Seat of the chased car, `None` for a heart
    pub seat: Option<usize>,
}

pub struct BotBrain;

impl BotBrain {
    /// A heart within reach, otherwise the nearest living human.
    /// Distances run between car centers.
    pub fn choose_target(round: &Round, seat: usize, own: &Car) -> Option<Target> {
        if let Some(bonus) = round.bonus() {
            if own.borders.next_to(&Rectangle::cell(bonus), AI_BONUS_RANGE).is_some() {
                return Some(Target {
                    point: bonus,
                    seat: None,
                });
            }
        }

        let origin = own.borders.center();
        round
            .humans()
            .filter(|p| p.seat != seat && p.is_alive())
            .map(|p| (p.seat, p.car().borders.center()))
            .min_by_key(|(_, at)| (at.x - origin.x).abs() + (at.y - origin.y).abs())
            .map(|(seat, point)| Target {
                point,
                seat: Some(seat),
            })
    }

    /// Pick a direction towards `target`, larger offset first.
    ///
    /// Never reverses and never turns towards a car closer than the safety
    /// margin on that side. Falls back to the current direction.
    pub fn steer(own: &Car, target: Point, obstacles: &[Rectangle]) -> Direction {
        let origin = own.borders.center();
        let (dx, dy) = (target.x - origin.x, target.y - origin.y);
        if dx == 0 && dy == 0 {
            return own.direction;
        }

        let horizontal = if dx < 0 { Direction::Left } else { Direction::Right };
        let vertical = if dy < 0 { Direction::Up } else { Direction::Down };
        let (primary, secondary) = if dx.abs() >= dy.abs() {
            (horizontal, (dy != 0).then_some(vertical))
        } else {
            (vertical, (dx != 0).then_some(horizontal))
        };

        let mut candidates = vec![primary];
        candidates.extend(secondary);
        if primary == own.direction.opposite() {
            candidates.extend(Self::perpendiculars(own.direction));
        }

        candidates
            .into_iter()
            .find(|&d| d != own.direction.opposite() && Self::is_safe(&own.borders, d, obstacles))
            .unwrap_or(own.direction)
    }

    fn perpendiculars(direction: Direction) -> [Direction; 2] {
        if direction.is_vertical() {
            [Direction::Left, Direction::Right]
        } else {
            [Direction::Up, Direction::Down]
        }
    }

    fn is_safe(borders: &Rectangle, side: Direction, obstacles: &[Rectangle]) -> bool {
        obstacles
            .iter()
            .all(|other| borders.next_to(other, AI_SAFETY_MARGIN) != Some(side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Player;
    use crate::game::RoundSettings;
    use crate::net::connection::Connection;
    use std::sync::Arc;
    use uuid::Uuid;

    fn human(name: &str, seat: usize, at: Point) -> Arc<Player> {
        let connection = Connection::spawn(tokio::io::sink(), name);
        let player = Player::human(name.into(), seat, connection, Box::new(tokio::io::empty()));
        player.with_car(|car| *car = Car::new(at, Direction::Right));
        Arc::new(player)
    }

    #[tokio::test]
    async fn nearest_human_is_measured_between_centers() {
        let bot = Arc::new(Player::bot("Bot 1".into(), 0));
        bot.with_car(|car| *car = Car::new(Point::new(50, 10), Direction::Down));
        let round = Round::new(
            Uuid::new_v4(),
            vec![
                Arc::clone(&bot),
                human("west", 1, Point::new(38, 10)),
                human("east", 2, Point::new(61, 10)),
            ],
            RoundSettings::default(),
            3,
        );

        let target = BotBrain::choose_target(&round, 0, &bot.car()).expect("a human to chase");
        assert_eq!(target.seat, Some(1));
        assert_eq!(target.point, Point::new(41, 11));
    }

    #[test]
    fn aims_from_the_middle_of_the_car() {
        let car = Car::new(Point::new(10, 10), Direction::Down);
        assert_eq!(BotBrain::steer(&car, Point::new(12, 11), &[]), Direction::Down);
        assert_eq!(BotBrain::steer(&car, Point::new(12, 25), &[]), Direction::Down);
    }

    #[test]
    fn heads_along_the_larger_offset() {
        let car = Car::new(Point::new(10, 10), Direction::Down);
        assert_eq!(BotBrain::steer(&car, Point::new(60, 14), &[]), Direction::Right);
        assert_eq!(BotBrain::steer(&car, Point::new(12, 30), &[]), Direction::Down);
    }

    #[test]
    fn never_reverses() {
        let car = Car::new(Point::new(50, 10), Direction::Right);
        let turned = BotBrain::steer(&car, Point::new(10, 10), &[]);
        assert!(turned == Direction::Up || turned == Direction::Down);

        let turned = BotBrain::steer(&car, Point::new(10, 20), &[]);
        assert_eq!(turned, Direction::Down);
    }

    #[test]
    fn avoids_turning_into_a_close_car() {
        let car = Car::new(Point::new(20, 10), Direction::Right);
        let blocker = Rectangle::new(Point::new(20, 15), 7, 3);
        assert_eq!(
            BotBrain::steer(&car, Point::new(22, 30), &[blocker]),
            Direction::Right
        );
        assert_eq!(
            BotBrain::steer(&car, Point::new(22, 30), &[]),
            Direction::Down
        );
    }
}
