use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Board geometry and the snake's spawn length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    pub initial_length: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { width: 20, height: 20, initial_length: 3 }
    }
}

impl GridConfig {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height, ..Default::default() }
    }

    pub fn cells(&self) -> usize {
        (self.width.max(0) as usize) * (self.height.max(0) as usize)
    }
}

/// Reward shaping. Collision must stay below the per-step reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub food: f32,
    pub step: f32,
    pub collision: f32,
    pub starvation: f32,
    /// Non-food steps tolerated before the episode is cut. `None` never starves.
    pub starvation_limit: Option<u32>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            food: 10.0,
            step: -0.1,
            collision: -100.0,
            starvation: -10.0,
            starvation_limit: Some(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparams {
    pub alpha: f32,
    pub gamma: f32,
    pub epsilon_start: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Self {
            alpha: 0.005,
            gamma: 0.9,
            epsilon_start: 0.1,
            epsilon_min: 0.01,
            epsilon_decay: 0.995,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub episodes: usize,
    pub report_every: usize,
    pub rolling_window: usize,
    /// Persist the table every N episodes while training.
    pub checkpoint_every: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            report_every: 100,
            rolling_window: 100,
            checkpoint_every: None,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnakeConfig {
    pub grid: GridConfig,
    pub rewards: RewardConfig,
    pub hyper: Hyperparams,
    pub training: TrainingConfig,
}

impl SnakeConfig {
    /// Reads a JSON config; missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: SnakeConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.grid;
        if g.initial_length < 1 {
            return invalid("initial snake length must be at least 1");
        }
        // The spawn lays the body out to the left of a centred head.
        if g.width / 2 + 1 < g.initial_length as i32 || g.width < 2 || g.height < 1 {
            return invalid(format!(
                "grid {}x{} cannot hold a snake of length {}",
                g.width, g.height, g.initial_length
            ));
        }

        let h = &self.hyper;
        if !(h.alpha > 0.0 && h.alpha <= 1.0) {
            return invalid(format!("alpha must be in (0, 1], got {}", h.alpha));
        }
        if !(0.0..=1.0).contains(&h.gamma) {
            return invalid(format!("gamma must be in [0, 1], got {}", h.gamma));
        }
        for (name, eps) in [("epsilon_start", h.epsilon_start), ("epsilon_min", h.epsilon_min)] {
            if !(0.0..=1.0).contains(&eps) {
                return invalid(format!("{name} must be in [0, 1], got {eps}"));
            }
        }
        if !(h.epsilon_decay > 0.0 && h.epsilon_decay <= 1.0) {
            return invalid(format!("epsilon_decay must be in (0, 1], got {}", h.epsilon_decay));
        }

        let r = &self.rewards;
        if r.collision >= r.step {
            return invalid(format!(
                "collision reward {} must be below the step reward {}",
                r.collision, r.step
            ));
        }
        if self.training.rolling_window == 0 {
            return invalid("rolling_window must be positive");
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid(msg.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SnakeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.rewards.starvation_limit, Some(200));
        assert_eq!(config.hyper.alpha, 0.005);
        assert_eq!(config.hyper.gamma, 0.9);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SnakeConfig =
            serde_json::from_str(r#"{ "grid": { "width": 8, "height": 8 } }"#).unwrap();
        assert_eq!(config.grid.width, 8);
        assert_eq!(config.grid.initial_length, 3);
        assert_eq!(config.rewards, RewardConfig::default());
    }

    #[test]
    fn rejects_collision_above_step_penalty() {
        let mut config = SnakeConfig::default();
        config.rewards.collision = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_grid_too_narrow_for_snake() {
        let mut config = SnakeConfig::default();
        config.grid = GridConfig { width: 3, height: 3, initial_length: 3 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SnakeConfig::load(Path::new("/nonexistent/snake.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
