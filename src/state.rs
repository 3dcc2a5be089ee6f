use crate::game::{Action, Direction, Game};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FEATURES: usize = 11;

// Bit layout, low to high:
//   0..4   food is right / down / left / up of the head
//   4..7   danger straight / right turn / left turn
//   7..11  heading one-hot, Up / Right / Down / Left
const FOOD_SHIFT: u32 = 0;
const DANGER_SHIFT: u32 = 4;
const HEADING_SHIFT: u32 = 7;

/// Discrete observation used as the Q-table key. Two boards that look the same
/// from the head always pack to the same bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State(u16);

impl State {
    pub fn from_features(features: [bool; FEATURES]) -> Self {
        let bits = features
            .iter()
            .enumerate()
            .fold(0u16, |k, (i, &on)| if on { k | 1 << i } else { k });
        State(bits)
    }

    pub fn features(self) -> [bool; FEATURES] {
        std::array::from_fn(|i| self.0 & (1 << i) != 0)
    }

    /// Food right, down, left, up.
    pub fn food(self) -> [bool; 4] {
        std::array::from_fn(|i| self.0 & (1 << (FOOD_SHIFT + i as u32)) != 0)
    }

    /// Danger indexed by `Action::index`.
    pub fn danger(self) -> [bool; 3] {
        std::array::from_fn(|i| self.0 & (1 << (DANGER_SHIFT + i as u32)) != 0)
    }

    pub fn heading(self) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|d| self.0 & (1 << (HEADING_SHIFT + d.index() as u32)) != 0)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for on in self.features() {
            f.write_str(if on { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Encode the board as seen from the snake's head.
pub fn encode(game: &Game) -> State {
    let head = game.head();
    let food = game.food;
    let dir = game.dir;

    let mut k: u16 = 0;
    let food_flags = [food.x > head.x, food.y > head.y, food.x < head.x, food.y < head.y];
    for (i, on) in food_flags.into_iter().enumerate() {
        if on {
            k |= 1 << (FOOD_SHIFT + i as u32);
        }
    }
    for a in Action::ALL {
        let next = head.offset(dir.turn(a).delta());
        if game.is_collision(next) {
            k |= 1 << (DANGER_SHIFT + a.index() as u32);
        }
    }
    k |= 1 << (HEADING_SHIFT + dir.index() as u32);
    State(k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::pos::Pos;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::collections::VecDeque;

    fn board(snake: &[(i32, i32)], dir: Direction, food: (i32, i32)) -> Game {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut g = Game::new(GridConfig::new(8, 8), &mut rng).unwrap();
        g.snake = snake.iter().map(|&(x, y)| Pos::new(x, y)).collect::<VecDeque<_>>();
        g.dir = dir;
        g.food = Pos::new(food.0, food.1);
        g
    }

    #[test]
    fn encodes_food_danger_and_heading() {
        // Head on the right wall, heading right, food up-left.
        let g = board(&[(7, 4), (6, 4), (5, 4)], Direction::Right, (2, 1));
        let s = encode(&g);
        assert_eq!(s.food(), [false, false, true, true]);
        assert_eq!(s.danger(), [true, false, false]);
        assert_eq!(s.heading(), Some(Direction::Right));
        assert_eq!(s.features().iter().filter(|&&b| b).count(), 4);
    }

    #[test]
    fn body_counts_as_danger() {
        // Heading up with the body curling round to the right of the head.
        let g = board(&[(3, 3), (3, 4), (4, 4), (4, 3)], Direction::Up, (3, 0));
        let s = encode(&g);
        assert_eq!(s.danger(), [false, true, false]);
        assert_eq!(s.food(), [false, false, false, true]);
        assert_eq!(s.heading(), Some(Direction::Up));
    }

    #[test]
    fn identical_geometry_gives_identical_key() {
        let a = board(&[(4, 4), (3, 4), (2, 4)], Direction::Right, (6, 6));
        let b = board(&[(4, 4), (3, 4), (2, 4)], Direction::Right, (7, 7));
        assert_eq!(encode(&a), encode(&b));
        assert_eq!(encode(&a), encode(&a.clone()));
    }

    #[test]
    fn features_round_trip_through_bits() {
        let g = board(&[(0, 0), (1, 0), (2, 0)], Direction::Left, (5, 5));
        let s = encode(&g);
        assert_eq!(State::from_features(s.features()), s);
        assert_eq!(s.to_string().len(), FEATURES);
    }
}
