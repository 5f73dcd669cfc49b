//! Match engine
//!
//! Turn order, rewards and round crediting for policies playing on a shared
//! [`crate::grid::BoardState`].

pub mod cancel;
pub mod match_engine;
pub mod rewards;
pub mod scoreboard;

pub use cancel::CancelToken;
pub use match_engine::{Match, MatchConfig, MatchResult, RoundOutcome};
pub use rewards::RewardSchedule;
pub use scoreboard::{Scoreboard, Standing};
