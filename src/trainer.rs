use crate::agent::{QAgent, QTable};
use crate::config::{Hyperparams, SnakeConfig, TrainingConfig};
use crate::env::{Environment, Frame, Outcome};
use crate::error::{EnvError, TrainError};
use crate::game::Action;
use crate::persist::save_table;
use crate::report::rolling_mean;
use crate::state::State;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment and policy get separate streams so a seeded run is reproducible
/// regardless of how many food respawns happen.
fn rngs(seed: Option<u64>) -> (SmallRng, SmallRng) {
    match seed {
        Some(s) => (SmallRng::seed_from_u64(s), SmallRng::seed_from_u64(s ^ 0x9E37_79B9_7F4A_7C15)),
        None => (SmallRng::from_entropy(), SmallRng::from_entropy()),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpisodeEnd {
    pub episode: usize,
    pub score: u32,
    pub steps: u64,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrainReport {
    pub episodes: usize,
    pub max_score: u32,
    pub mean_score: f32,
    pub states_visited: usize,
    pub final_epsilon: f32,
    pub total_steps: u64,
}

impl fmt::Display for TrainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EPISODES      : {}", self.episodes)?;
        writeln!(f, "MAX SCORE     : {}", self.max_score)?;
        writeln!(f, "MEAN SCORE    : {:.2}", self.mean_score)?;
        writeln!(f, "STATES VISITED: {}", self.states_visited)?;
        writeln!(f, "FINAL EPSILON : {:.4}", self.final_epsilon)?;
        write!(f, "TOTAL STEPS   : {}", self.total_steps)
    }
}

/// Runs episodes against one `Environment`, learning into one `QAgent`.
pub struct Trainer {
    agent: QAgent,
    env: Environment,
    hyper: Hyperparams,
    schedule: TrainingConfig,
    epsilon: f32,
    rng: SmallRng,
    scores: Vec<u32>,
    total_steps: u64,
}

impl Trainer {
    pub fn new(config: &SnakeConfig) -> Result<Self, TrainError> {
        Self::with_agent(config, QAgent::new())
    }

    /// Continue learning from an existing table.
    pub fn with_agent(config: &SnakeConfig, agent: QAgent) -> Result<Self, TrainError> {
        config.validate()?;
        let (env_rng, rng) = rngs(config.training.seed);
        Ok(Self {
            agent,
            env: Environment::new(config.grid, config.rewards, env_rng)?,
            hyper: config.hyper,
            schedule: config.training,
            epsilon: config.hyper.epsilon_start,
            rng,
            scores: Vec::new(),
            total_steps: 0,
        })
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Score of every finished episode, in order.
    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    pub fn table(&self) -> &QTable {
        &self.agent.table
    }

    /// One episode of select, step, update until done, then decay epsilon.
    pub fn run_episode(&mut self) -> Result<EpisodeEnd, EnvError> {
        let Hyperparams { alpha, gamma, .. } = self.hyper;
        let mut state = self.env.reset()?;
        let outcome = loop {
            let action = self.agent.select_action(state, self.epsilon, &mut self.rng);
            let step = self.env.step(action)?;
            self.agent.update(state, action, step.reward, step.state, alpha, gamma);
            state = step.state;
            if step.done {
                break step.outcome;
            }
        };

        self.epsilon = (self.epsilon * self.hyper.epsilon_decay).max(self.hyper.epsilon_min);
        let end = EpisodeEnd {
            episode: self.scores.len(),
            score: self.env.score(),
            steps: self.env.steps(),
            outcome,
        };
        self.scores.push(end.score);
        self.total_steps += end.steps;
        debug!(episode = end.episode, score = end.score, steps = end.steps, outcome = ?end.outcome, "episode finished");
        Ok(end)
    }

    /// The configured number of episodes. With `save_to`, checkpoints along the way
    /// (if configured) and always saves the final table there.
    pub fn train(&mut self, save_to: Option<&Path>) -> Result<TrainReport, TrainError> {
        let TrainingConfig { episodes, report_every, rolling_window, checkpoint_every, .. } = self.schedule;
        info!(episodes, alpha = self.hyper.alpha, gamma = self.hyper.gamma, epsilon = self.epsilon, "training started");

        for _ in 0..episodes {
            let end = match self.run_episode() {
                Ok(end) => end,
                Err(err) => {
                    if let Some(path) = save_to {
                        save_table(&self.agent.table, path)?;
                        warn!(%err, path = %path.display(), "training aborted, q-table saved");
                    }
                    return Err(err.into());
                }
            };
            let done = end.episode + 1;

            if report_every > 0 && done % report_every == 0 {
                info!(
                    episode = done,
                    avg_score = rolling_mean(&self.scores, rolling_window),
                    epsilon = self.epsilon,
                    states = self.agent.table.len(),
                    "progress"
                );
            }
            if let (Some(every), Some(path)) = (checkpoint_every, save_to) {
                if every > 0 && done % every == 0 && done < episodes {
                    save_table(&self.agent.table, path)?;
                    info!(episode = done, path = %path.display(), "checkpoint saved");
                }
            }
        }

        let report = self.report();
        if let Some(path) = save_to {
            save_table(&self.agent.table, path)?;
            info!(path = %path.display(), states = report.states_visited, "q-table saved");
        }
        info!(max_score = report.max_score, states = report.states_visited, "training finished");
        Ok(report)
    }

    pub fn report(&self) -> TrainReport {
        let n = self.scores.len();
        TrainReport {
            episodes: n,
            max_score: self.scores.iter().copied().max().unwrap_or(0),
            mean_score: rolling_mean(&self.scores, n),
            states_visited: self.agent.table.len(),
            final_epsilon: self.epsilon,
            total_steps: self.total_steps,
        }
    }
}

/// Plays a fixed number of episodes with a frozen table, one step per `tick`, so the
/// same run can be driven headless or from a render loop.
pub struct Evaluation {
    agent: QAgent,
    env: Environment,
    epsilon: f32,
    rng: SmallRng,
    episodes: usize,
    scores: Vec<u32>,
    state: State,
}

impl Evaluation {
    pub fn new(table: QTable, config: &SnakeConfig, episodes: usize, epsilon: f32) -> Result<Self, TrainError> {
        config.validate()?;
        let (env_rng, rng) = rngs(config.training.seed);
        let mut env = Environment::new(config.grid, config.rewards, env_rng)?;
        let state = env.reset()?;
        Ok(Self {
            agent: QAgent::with_table(table),
            env,
            epsilon,
            rng,
            episodes,
            scores: Vec::new(),
            state,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.scores.len() >= self.episodes
    }

    /// Advance one step. Returns the finished episode when this step ended one;
    /// the next episode starts on the following tick.
    pub fn tick(&mut self) -> Result<Option<EpisodeEnd>, EnvError> {
        if self.is_finished() {
            return Ok(None);
        }
        if self.env.is_done() {
            self.state = self.env.reset()?;
        }

        let action: Action = self.agent.select_action(self.state, self.epsilon, &mut self.rng);
        let step = self.env.step(action)?;
        self.state = step.state;
        if !step.done {
            return Ok(None);
        }

        let end = EpisodeEnd {
            episode: self.scores.len(),
            score: self.env.score(),
            steps: self.env.steps(),
            outcome: step.outcome,
        };
        self.scores.push(end.score);
        debug!(episode = end.episode + 1, score = end.score, outcome = ?end.outcome, "evaluation episode finished");
        Ok(Some(end))
    }

    pub fn frame(&self) -> Frame<'_> {
        self.env.frame()
    }

    pub fn scores(&self) -> &[u32] {
        &self.scores
    }

    pub fn table(&self) -> &QTable {
        &self.agent.table
    }
}

/// Headless evaluation; the table is only read.
pub fn evaluate(table: QTable, config: &SnakeConfig, episodes: usize, epsilon: f32) -> Result<Vec<u32>, TrainError> {
    let mut eval = Evaluation::new(table, config, episodes, epsilon)?;
    while !eval.is_finished() {
        eval.tick()?;
    }
    Ok(eval.scores)
}
