use crate::config::GridConfig;
use crate::error::EnvError;
use crate::pos::Pos;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Absolute heading, listed clockwise so a right turn is `+1` around the list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Direction {
        Direction::ALL[(self.index() + 2) % 4]
    }

    /// Heading after taking `action` while facing `self`.
    pub fn turn(self, action: Action) -> Direction {
        TURN[self.index()][action.index()]
    }

    /// The relative action that steers from heading `self` towards `wanted`.
    /// Asking to reverse yields `Straight`, since a 180° turn is never allowed.
    pub fn relative_action(self, wanted: Direction) -> Action {
        Action::ALL
            .into_iter()
            .find(|&a| self.turn(a) == wanted)
            .unwrap_or(Action::Straight)
    }
}

/// Move relative to the current heading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Straight,
    TurnRight,
    TurnLeft,
}

impl Action {
    /// Fixed enumeration order. Greedy ties resolve to the earliest entry.
    pub const ALL: [Action; 3] = [Action::Straight, Action::TurnRight, Action::TurnLeft];

    pub fn index(self) -> usize {
        match self {
            Action::Straight => 0,
            Action::TurnRight => 1,
            Action::TurnLeft => 2,
        }
    }

    pub fn from_index(i: usize) -> Option<Action> {
        Action::ALL.get(i).copied()
    }

    pub fn one_hot(self) -> [u8; 3] {
        let mut v = [0; 3];
        v[self.index()] = 1;
        v
    }
}

use Direction::{Down as D, Left as L, Right as R, Up as U};

// heading x [straight, right turn, left turn]
const TURN: [[Direction; 3]; 4] = [
    [U, R, L], // Up
    [R, D, U], // Right
    [D, L, R], // Down
    [L, U, D], // Left
];

/// What a single advance did to the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
    Moved,
    Fed,
    Collided,
}

/// Snake and food on a bounded grid. Knows nothing about rewards.
#[derive(Clone, Debug)]
pub struct Game {
    pub grid: GridConfig,
    pub snake: VecDeque<Pos>,
    pub dir: Direction,
    pub food: Pos,
    pub score: u32,
}

impl Game {
    /// Centred snake heading right with its body trailing to the left, plus one food.
    pub fn new<Rn: Rng + ?Sized>(grid: GridConfig, rng: &mut Rn) -> Result<Self, EnvError> {
        let start_x = grid.width / 2;
        let start_y = grid.height / 2;
        let snake: VecDeque<Pos> = (0..grid.initial_length as i32)
            .map(|i| Pos::new(start_x - i, start_y))
            .collect();
        let fits = |p: &Pos| p.x >= 0 && p.y >= 0 && p.x < grid.width && p.y < grid.height;
        if snake.is_empty() || !snake.iter().all(fits) {
            return Err(EnvError::SnakeDoesNotFit {
                width: grid.width,
                height: grid.height,
                length: grid.initial_length,
            });
        }

        let mut g = Self {
            grid,
            snake,
            dir: Direction::Right,
            food: Pos::new(0, 0),
            score: 0,
        };
        g.place_food(rng)?;
        Ok(g)
    }

    pub fn head(&self) -> Pos {
        // A game is never built with an empty body and never shrinks.
        self.snake[0]
    }

    pub fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < self.grid.width && p.y < self.grid.height
    }

    pub fn snake_contains(&self, p: Pos) -> bool {
        self.snake.iter().any(|&s| s == p)
    }

    /// Would the head die by entering `p` on the next move? The tail still counts,
    /// it is only released after the head has moved.
    pub fn is_collision(&self, p: Pos) -> bool {
        !self.in_bounds(p) || self.snake_contains(p)
    }

    /// Uniform over free cells: rejection sampling first, then an exhaustive scan
    /// once the board is crowded enough that sampling keeps missing.
    pub fn place_food<Rn: Rng + ?Sized>(&mut self, rng: &mut Rn) -> Result<(), EnvError> {
        let cells = self.grid.cells();
        for _ in 0..cells * 4 {
            let p = Pos::new(
                rng.gen_range(0..self.grid.width),
                rng.gen_range(0..self.grid.height),
            );
            if !self.snake_contains(p) {
                self.food = p;
                return Ok(());
            }
        }

        tracing::warn!(length = self.snake.len(), cells, "food sampling exhausted, scanning free cells");
        let free: Vec<Pos> = (0..self.grid.height)
            .flat_map(|y| (0..self.grid.width).map(move |x| Pos::new(x, y)))
            .filter(|&p| !self.snake_contains(p))
            .collect();
        if free.is_empty() {
            return Err(EnvError::GridFull);
        }
        self.food = free[rng.gen_range(0..free.len())];
        Ok(())
    }

    /// Turns by `action`, then moves the head one cell. On collision the body and food
    /// are left untouched. Eating keeps the tail, so the snake grows by one.
    ///
    /// Eating the last free cell fails with `GridFull` before anything changes.
    pub fn advance<Rn: Rng + ?Sized>(&mut self, action: Action, rng: &mut Rn) -> Result<Move, EnvError> {
        let dir = self.dir.turn(action);
        let new_head = self.head().offset(dir.delta());

        if self.is_collision(new_head) {
            self.dir = dir;
            return Ok(Move::Collided);
        }
        let fed = new_head == self.food;
        if fed && self.snake.len() + 1 >= self.grid.cells() {
            return Err(EnvError::GridFull);
        }

        self.dir = dir;
        self.snake.push_front(new_head);
        if fed {
            self.score += 1;
            self.place_food(rng)?;
            Ok(Move::Fed)
        } else {
            self.snake.pop_back();
            Ok(Move::Moved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn game(width: i32, height: i32) -> (Game, SmallRng) {
        let mut rng = SmallRng::seed_from_u64(7);
        let g = Game::new(GridConfig::new(width, height), &mut rng).unwrap();
        (g, rng)
    }

    #[test]
    fn turn_table_matches_compass() {
        assert_eq!(Direction::Up.turn(Action::TurnRight), Direction::Right);
        assert_eq!(Direction::Up.turn(Action::TurnLeft), Direction::Left);
        assert_eq!(Direction::Left.turn(Action::TurnRight), Direction::Up);
        assert_eq!(Direction::Down.turn(Action::TurnLeft), Direction::Right);
        for d in Direction::ALL {
            assert_eq!(d.turn(Action::Straight), d);
            assert_ne!(d.turn(Action::TurnRight), d.opposite());
            assert_ne!(d.turn(Action::TurnLeft), d.opposite());
        }
    }

    #[test]
    fn actions_encode_one_hot_in_enumeration_order() {
        assert_eq!(Action::Straight.one_hot(), [1, 0, 0]);
        assert_eq!(Action::TurnRight.one_hot(), [0, 1, 0]);
        assert_eq!(Action::TurnLeft.one_hot(), [0, 0, 1]);
        assert_eq!(Action::from_index(3), None);
    }

    #[test]
    fn reverse_request_goes_straight() {
        for d in Direction::ALL {
            assert_eq!(d.relative_action(d.opposite()), Action::Straight);
            assert_eq!(d.relative_action(d), Action::Straight);
            for a in Action::ALL {
                assert_eq!(d.turn(d.relative_action(d.turn(a))), d.turn(a));
            }
        }
    }

    #[test]
    fn spawn_layout() {
        let (g, _) = game(8, 8);
        assert_eq!(g.snake, VecDeque::from(vec![Pos::new(4, 4), Pos::new(3, 4), Pos::new(2, 4)]));
        assert_eq!(g.dir, Direction::Right);
        assert!(!g.snake_contains(g.food));
        assert!(g.in_bounds(g.food));
    }

    #[test]
    fn moving_conserves_length_and_eating_grows() {
        let (mut g, mut rng) = game(10, 10);
        g.food = Pos::new(0, 0);
        assert_eq!(g.advance(Action::Straight, &mut rng), Ok(Move::Moved));
        assert_eq!(g.snake.len(), 3);
        assert_eq!(g.head(), Pos::new(6, 5));

        g.food = Pos::new(6, 6);
        assert_eq!(g.advance(Action::TurnRight, &mut rng), Ok(Move::Fed));
        assert_eq!(g.snake.len(), 4);
        assert_eq!(g.score, 1);
        assert!(!g.snake_contains(g.food));
    }

    #[test]
    fn entering_the_tail_cell_collides() {
        let (mut g, mut rng) = game(10, 10);
        g.snake = VecDeque::from(vec![Pos::new(5, 5), Pos::new(5, 6), Pos::new(4, 6), Pos::new(4, 5)]);
        g.dir = Direction::Up;
        g.food = Pos::new(0, 0);
        // Left from (5,5) is (4,5): the tail.
        assert_eq!(g.advance(Action::TurnLeft, &mut rng), Ok(Move::Collided));
        assert_eq!(g.head(), Pos::new(5, 5));
    }

    #[test]
    fn last_free_cell_is_found_and_full_grid_errors() {
        let mut rng = SmallRng::seed_from_u64(3);
        let grid = GridConfig { width: 3, height: 1, initial_length: 2 };
        let mut g = Game::new(grid, &mut rng).unwrap();
        assert_eq!(g.snake, VecDeque::from(vec![Pos::new(1, 0), Pos::new(0, 0)]));
        assert_eq!(g.food, Pos::new(2, 0));

        g.snake.push_front(Pos::new(2, 0));
        assert_eq!(g.place_food(&mut rng), Err(EnvError::GridFull));
    }

    #[test]
    fn eating_the_last_free_cell_changes_nothing() {
        let mut rng = SmallRng::seed_from_u64(3);
        let grid = GridConfig { width: 4, height: 1, initial_length: 3 };
        let mut g = Game::new(grid, &mut rng).unwrap();
        assert_eq!(g.food, Pos::new(3, 0));
        let before = g.snake.clone();

        assert_eq!(g.advance(Action::Straight, &mut rng), Err(EnvError::GridFull));
        assert_eq!(g.snake, before);
        assert_eq!(g.score, 0);
        assert_eq!(g.dir, Direction::Right);
        assert!(!g.snake_contains(g.food));
    }

    #[test]
    fn spawn_off_the_board_is_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let err = Game::new(GridConfig::new(2, 8), &mut rng).unwrap_err();
        assert_eq!(err, EnvError::SnakeDoesNotFit { width: 2, height: 8, length: 3 });

        let empty = GridConfig { width: 5, height: 5, initial_length: 0 };
        assert!(Game::new(empty, &mut rng).is_err());
    }
}
