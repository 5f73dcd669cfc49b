//! Rewards handed to policies by the match engine

use serde::{Deserialize, Serialize};

/// Reward values for each kind of feedback
///
/// The default pays nothing for boxes completed mid-round; only the end of
/// a round and illegal lines carry signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Paid per box completed on a turn.
    pub box_reward: f32,
    pub win: f32,
    pub loss: f32,
    /// Paid for every line outside the legal set.
    pub illegal: f32,
}

impl Default for RewardSchedule {
    fn default() -> Self {
        Self {
            box_reward: 0.0,
            win: 10.0,
            loss: -10.0,
            illegal: -100.0,
        }
    }
}

impl RewardSchedule {
    pub fn with_box_reward(mut self, box_reward: f32) -> Self {
        self.box_reward = box_reward;
        self
    }

    pub fn turn_reward(&self, boxes: u32) -> f32 {
        self.box_reward * boxes as f32
    }

    pub fn end_reward(&self, won: bool) -> f32 {
        if won { self.win } else { self.loss }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_turn_reward_is_zero() {
        let rewards = RewardSchedule::default();
        assert_eq!(rewards.turn_reward(0), 0.0);
        assert_eq!(rewards.turn_reward(2), 0.0);
        assert_eq!(rewards.end_reward(true), 10.0);
        assert_eq!(rewards.end_reward(false), -10.0);
    }

    #[test]
    fn test_box_reward_scales() {
        let rewards = RewardSchedule::default().with_box_reward(1.5);
        assert_eq!(rewards.turn_reward(2), 3.0);
    }
}
