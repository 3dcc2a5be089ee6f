use crate::game::Action;
use crate::state::State;
use ahash::AHashMap;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

pub type ActionValues = [f32; 3];

/// Sparse state -> action-value table. Unseen entries read as zero; reading never inserts.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    q: AHashMap<State, ActionValues>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values for `s`, or all zeros if `s` was never written.
    pub fn get(&self, s: State) -> ActionValues {
        self.q.get(&s).copied().unwrap_or([0.0; 3])
    }

    pub fn value(&self, s: State, a: Action) -> f32 {
        self.get(s)[a.index()]
    }

    pub fn set(&mut self, s: State, a: Action, v: f32) {
        self.q.entry(s).or_insert([0.0; 3])[a.index()] = v;
    }

    pub fn contains(&self, s: State) -> bool {
        self.q.contains_key(&s)
    }

    /// Best value in `s`; 0.0 for a state never written.
    pub fn max_value(&self, s: State) -> f32 {
        match self.q.get(&s) {
            Some(qs) => qs[0].max(qs[1]).max(qs[2]),
            None => 0.0,
        }
    }

    /// Highest-valued action, earliest in `Action::ALL` on ties.
    pub fn best_action(&self, s: State) -> Action {
        let qs = self.get(s);
        let mut best = 0;
        for i in 1..qs.len() {
            if qs[i] > qs[best] {
                best = i;
            }
        }
        Action::from_index(best).unwrap_or(Action::Straight)
    }

    /// Number of distinct states written so far.
    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &ActionValues)> {
        self.q.iter()
    }
}

/// Epsilon-greedy policy and one-step Q-learning update over a `QTable`.
#[derive(Clone, Debug, Default)]
pub struct QAgent {
    pub table: QTable,
}

impl QAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(table: QTable) -> Self {
        Self { table }
    }

    /// Random action with probability `epsilon`, greedy otherwise.
    pub fn select_action<Rn: Rng + ?Sized>(&self, s: State, epsilon: f32, rng: &mut Rn) -> Action {
        if rng.r#gen::<f32>() < epsilon {
            Action::ALL.choose(rng).copied().unwrap_or(Action::Straight)
        } else {
            self.table.best_action(s)
        }
    }

    /// `Q[s][a] += alpha * (r + gamma * max Q[ns] - Q[s][a])`.
    pub fn update(&mut self, s: State, a: Action, r: f32, ns: State, alpha: f32, gamma: f32) {
        let next_max = self.table.max_value(ns);
        let old = self.table.value(s, a);
        let td_target = r + gamma * next_max;
        self.table.set(s, a, old + alpha * (td_target - old));
    }
}
