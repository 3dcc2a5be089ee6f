//! Snake on a grid, plus a tabular Q-learning agent that learns to play it.
//!
//! - `game`: board simulation (snake, food, turning)
//! - `env`: reset/step/reward contract over the board
//! - `state`: 11-feature observation used as the table key
//! - `agent`: Q-table and epsilon-greedy learner
//! - `trainer`: training loop and frozen-table evaluation
//! - `persist`, `report`, `config`: saving, progress output, settings
//! - `draw`, `window`: pixels/winit front ends for play and watching

pub mod agent;
pub mod config;
pub mod draw;
pub mod env;
pub mod error;
pub mod game;
pub mod persist;
pub mod pos;
pub mod report;
pub mod state;
pub mod trainer;
pub mod window;

pub use agent::{QAgent, QTable};
pub use config::SnakeConfig;
pub use env::{Environment, Outcome, Step};
pub use game::{Action, Direction};
pub use state::State;
pub use trainer::{Evaluation, TrainReport, Trainer};
