//! Uniformly random baseline

use rand::{SeedableRng, rngs::StdRng, seq::IndexedRandom};

use crate::{
    Error, Result,
    ports::{Action, Policy},
};

/// Claims a uniformly random legal line
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn select_action(&mut self, state: u64, available: &[usize]) -> Result<Action> {
        available
            .choose(&mut self.rng)
            .map(|&line| Action::Line(line))
            .ok_or(Error::NoAvailableActions { state })
    }

    fn name(&self) -> &str {
        "RandomAgent"
    }

    fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}
