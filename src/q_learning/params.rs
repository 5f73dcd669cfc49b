//! Hyper-parameters of the Q-learning policy

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_DISCOUNT_FACTOR: f32 = 0.5;
pub const DEFAULT_LEARNING_RATE: f32 = 0.8;

/// How the value of the successor state is estimated in the update rule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessorValue {
    /// Maximum over every action of the successor state, claimed or not.
    #[default]
    TableMax,
    /// Maximum over the lines still available in the successor state.
    LegalMax,
}

/// Learning parameters for [`super::QLearningPolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningParams {
    pub discount_factor: f32,
    pub learning_rate: f32,
    /// Probability of replacing the greedy choice with a random legal line.
    pub exploration: f32,
    pub training: bool,
    #[serde(default)]
    pub successor: SuccessorValue,
}

impl Default for LearningParams {
    fn default() -> Self {
        Self {
            discount_factor: DEFAULT_DISCOUNT_FACTOR,
            learning_rate: DEFAULT_LEARNING_RATE,
            exploration: 0.0,
            training: true,
            successor: SuccessorValue::TableMax,
        }
    }
}

impl LearningParams {
    pub fn with_discount_factor(mut self, discount_factor: f32) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_exploration(mut self, exploration: f32) -> Self {
        self.exploration = exploration;
        self
    }

    pub fn with_training(mut self, training: bool) -> Self {
        self.training = training;
        self
    }

    pub fn with_successor(mut self, successor: SuccessorValue) -> Self {
        self.successor = successor;
        self
    }

    /// Check every parameter lies in its admissible interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] naming the first parameter
    /// out of range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.discount_factor) {
            return Err(Error::InvalidConfiguration {
                message: format!(
                    "discount factor {} must be in [0, 1)",
                    self.discount_factor
                ),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(Error::InvalidConfiguration {
                message: format!("learning rate {} must be in (0, 1]", self.learning_rate),
            });
        }
        if !(0.0..1.0).contains(&self.exploration) {
            return Err(Error::InvalidConfiguration {
                message: format!("exploration quotient {} must be in [0, 1)", self.exploration),
            });
        }
        Ok(())
    }
}
