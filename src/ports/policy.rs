//! Policy port - abstraction for anything that can pick lines
//!
//! This port defines the interface that every decision maker implements,
//! allowing a match to pit against each other:
//! - Tabular learners (Q-learning)
//! - Fixed baselines (lowest line, random)
//! - Human players driven from a console

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// Decision returned by a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Claim the given line.
    Line(usize),
    /// Stop the match. The engine cancels the current round and shuts
    /// every policy down.
    Abort,
}

impl Action {
    /// The claimed line, if this is not an abort.
    pub fn line(self) -> Option<usize> {
        match self {
            Action::Line(line) => Some(line),
            Action::Abort => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Line(line) => write!(f, "line {line}"),
            Action::Abort => write!(f, "abort"),
        }
    }
}

/// Policy trait - unified interface for all players
///
/// A policy sees the game only through state identifiers and legal line
/// sets. Each call to [`Policy::select_action`] may be followed by one or
/// more calls to [`Policy::observe_feedback`] that judge that decision.
///
/// # Examples
///
/// ```
/// use dotsnboxes::ports::{Action, Policy};
///
/// struct FirstLine;
///
/// impl Policy for FirstLine {
///     fn select_action(&mut self, _state: u64, available: &[usize]) -> dotsnboxes::Result<Action> {
///         Ok(available.first().map_or(Action::Abort, |&line| Action::Line(line)))
///     }
///
///     fn name(&self) -> &str {
///         "FirstLine"
///     }
/// }
/// ```
pub trait Policy: Send {
    /// Choose a line to claim in `state`.
    ///
    /// `available` lists the unclaimed lines in ascending order. Returning
    /// a line outside of it is answered with a penalty and a new request.
    fn select_action(&mut self, state: u64, available: &[usize]) -> Result<Action>;

    /// Judge the most recent decision.
    ///
    /// `available` is `None` when the round has ended and no further
    /// actions exist from `new_state`.
    ///
    /// The default implementation ignores feedback, suitable for
    /// policies without memory.
    fn observe_feedback(
        &mut self,
        _reward: f32,
        _new_state: u64,
        _available: Option<&[usize]>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once when the match ends, normally or through an abort.
    ///
    /// Does not persist any value table; tables are persisted by the
    /// application context that opened them.
    fn shutdown(&mut self) {}

    /// Name used in standings and logs.
    fn name(&self) -> &str;

    /// Seed the policy's random number generator, if it has one.
    fn set_rng_seed(&mut self, _seed: u64) {}
}
