//! One snake episode as a Markov decision process.
//!
//! `Environment` turns the bare board simulation in [`crate::game`] into a
//! reset/step interface with rewards, starvation and terminal tracking. The
//! learning loop, human play and rendered evaluation all drive this same type and
//! differ only in who picks the action and where [`Frame`]s are sent.

use crate::config::{GridConfig, RewardConfig};
use crate::error::EnvError;
use crate::game::{Action, Direction, Game, Move};
use crate::pos::Pos;
use crate::state::{State, encode};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::VecDeque;

/// How a step ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Running,
    Fed,
    Collided,
    Starved,
    /// The snake covers the whole grid and no food can be placed.
    Filled,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, Outcome::Collided | Outcome::Starved | Outcome::Filled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub state: State,
    pub reward: f32,
    pub done: bool,
    pub outcome: Outcome,
}

/// Plain-data view of the board for whatever draws it.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub snake: &'a VecDeque<Pos>,
    pub food: Pos,
    pub score: u32,
    pub heading: Direction,
    pub alive: bool,
}

/// Receives a frame after every step. Rendering adapters implement this.
pub trait FrameSink {
    fn show(&mut self, frame: &Frame<'_>);
}

pub struct Environment {
    game: Game,
    rewards: RewardConfig,
    rng: SmallRng,
    steps_since_food: u32,
    steps: u64,
    outcome: Outcome,
}

impl Environment {
    pub fn new(grid: GridConfig, rewards: RewardConfig, mut rng: SmallRng) -> Result<Self, EnvError> {
        let game = Game::new(grid, &mut rng)?;
        Ok(Self {
            game,
            rewards,
            rng,
            steps_since_food: 0,
            steps: 0,
            outcome: Outcome::Running,
        })
    }

    pub fn seeded(grid: GridConfig, rewards: RewardConfig, seed: u64) -> Result<Self, EnvError> {
        Self::new(grid, rewards, SmallRng::seed_from_u64(seed))
    }

    /// Fresh snake and food; score and starvation counter back to zero.
    pub fn reset(&mut self) -> Result<State, EnvError> {
        self.game = Game::new(self.game.grid, &mut self.rng)?;
        self.steps_since_food = 0;
        self.steps = 0;
        self.outcome = Outcome::Running;
        Ok(self.state())
    }

    pub fn state(&self) -> State {
        encode(&self.game)
    }

    pub fn step(&mut self, action: Action) -> Result<Step, EnvError> {
        if self.outcome.is_terminal() {
            return Err(EnvError::EpisodeFinished);
        }
        self.steps += 1;

        let moved = match self.game.advance(action, &mut self.rng) {
            Ok(moved) => moved,
            Err(err) => {
                self.outcome = Outcome::Filled;
                return Err(err);
            }
        };
        let (outcome, reward) = match moved {
            Move::Collided => (Outcome::Collided, self.rewards.collision),
            Move::Fed => {
                self.steps_since_food = 0;
                (Outcome::Fed, self.rewards.food)
            }
            Move::Moved => {
                self.steps_since_food += 1;
                match self.rewards.starvation_limit {
                    Some(limit) if self.steps_since_food > limit => {
                        (Outcome::Starved, self.rewards.starvation)
                    }
                    _ => (Outcome::Running, self.rewards.step),
                }
            }
        };

        self.outcome = outcome;
        Ok(Step {
            state: self.state(),
            reward,
            done: outcome.is_terminal(),
            outcome,
        })
    }

    /// Step towards an absolute direction, as a keyboard would. Reversing is ignored.
    pub fn steer(&mut self, wanted: Direction) -> Result<Step, EnvError> {
        self.step(self.game.dir.relative_action(wanted))
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            snake: &self.game.snake,
            food: self.game.food,
            score: self.game.score,
            heading: self.game.dir,
            alive: !self.outcome.is_terminal(),
        }
    }

    pub fn score(&self) -> u32 {
        self.game.score
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_terminal()
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Steps taken in the current episode.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn steps_since_food(&self) -> u32 {
        self.steps_since_food
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Direct board access, for scripted scenarios.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }
}
