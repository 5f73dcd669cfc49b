//! Tabular Q-learning policy
//!
//! Greedy selection over a shared [`ValueTable`] with two exploration
//! mechanisms: while training, the first unvisited line in ascending order
//! is taken immediately; independently, with probability `exploration` the
//! choice is replaced by a uniformly drawn legal line.

use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{info, trace};

use crate::{
    Error, Result,
    ports::{Action, Policy, UNVISITED, ValueTable},
    q_learning::params::{LearningParams, SuccessorValue},
};

fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// The decision awaiting feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decision {
    state: u64,
    action: usize,
}

/// Q-learning policy
///
/// Update rule, applied to the last decision `(s, a)` on feedback:
///
/// `Q(s,a) <- Q(s,a) + lr * (r + discount * V(s') - Q(s,a))`
///
/// where `V(s')` is zero at the end of a round and otherwise given by
/// [`SuccessorValue`].
pub struct QLearningPolicy {
    name: String,
    table: Arc<dyn ValueTable>,
    params: LearningParams,
    last: Option<Decision>,
    score: f64,
    rng: StdRng,
}

impl QLearningPolicy {
    pub fn new(table: Arc<dyn ValueTable>, params: LearningParams) -> Self {
        Self {
            name: "QLearningAgent".to_string(),
            table,
            params,
            last: None,
            score: 0.0,
            rng: build_rng(None),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = build_rng(Some(seed));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn params(&self) -> &LearningParams {
        &self.params
    }

    pub fn table(&self) -> &Arc<dyn ValueTable> {
        &self.table
    }

    /// Sum of every reward received so far.
    pub fn score(&self) -> f64 {
        self.score
    }

    fn greedy(&self, state: u64, available: &[usize]) -> usize {
        let mut best = available[0];
        let mut max = f32::NEG_INFINITY;

        for &line in available {
            let value = self.table.value(state, line);
            if self.params.training && value == UNVISITED {
                trace!(state, line, "exploring unvisited line");
                return line;
            }
            if value > max {
                max = value;
                best = line;
            }
        }
        best
    }

    fn successor_value(&self, new_state: u64, available: Option<&[usize]>) -> f32 {
        let available = match available {
            Some(available) if !available.is_empty() => available,
            _ => return 0.0,
        };
        match self.params.successor {
            SuccessorValue::TableMax => self.table.max_value(new_state),
            SuccessorValue::LegalMax => available
                .iter()
                .filter(|&&line| line < self.table.num_actions())
                .map(|&line| self.table.value(new_state, line))
                .fold(f32::NEG_INFINITY, f32::max),
        }
    }

    fn in_table(&self, decision: Decision) -> bool {
        decision.state < self.table.num_states() && decision.action < self.table.num_actions()
    }
}

impl Policy for QLearningPolicy {
    fn select_action(&mut self, state: u64, available: &[usize]) -> Result<Action> {
        if available.is_empty() {
            return Err(Error::NoAvailableActions { state });
        }

        let mut action = self.greedy(state, available);

        if self.rng.random::<f32>() < self.params.exploration {
            let drawn = available[self.rng.random_range(0..available.len())];
            if drawn != action {
                trace!(state, greedy = action, drawn, "random exploration override");
                action = drawn;
            }
        }

        self.last = Some(Decision { state, action });
        Ok(Action::Line(action))
    }

    fn observe_feedback(
        &mut self,
        reward: f32,
        new_state: u64,
        available: Option<&[usize]>,
    ) -> Result<()> {
        self.score += f64::from(reward);

        let Some(decision) = self.last else {
            return Ok(());
        };
        if available.is_none() {
            self.last = None;
        }

        if !self.params.training || !self.in_table(decision) {
            return Ok(());
        }

        let target = reward + self.params.discount_factor * self.successor_value(new_state, available);
        let learning_rate = self.params.learning_rate;
        let written = self.table.update(decision.state, decision.action, &mut |old| {
            old + learning_rate * (target - old)
        });
        trace!(
            state = decision.state,
            action = decision.action,
            reward,
            target,
            value = written,
            "updated value"
        );
        Ok(())
    }

    fn shutdown(&mut self) {
        info!(policy = %self.name, table = self.table.name(), score = self.score, "QLearning score");
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_rng_seed(&mut self, seed: u64) {
        self.rng = build_rng(Some(seed));
    }
}
