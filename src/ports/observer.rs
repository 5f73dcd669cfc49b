//! Observer port - publish/subscribe for match events
//!
//! The match engine holds a list of observers and publishes an event after
//! every placed line, score change and round boundary. Delivery is
//! fire-and-forget: a failing observer is logged and skipped, it never
//! interrupts the match.

use serde::{Deserialize, Serialize};

use crate::{Result, engine::Standing, grid::BoardSnapshot};

/// Something that happened during a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchStarted {
        rounds: usize,
        policies: Vec<String>,
        width: usize,
        height: usize,
    },
    RoundStarted {
        round: usize,
        starter: usize,
    },
    LinePlaced {
        round: usize,
        policy: usize,
        line: usize,
        boxes: u32,
        board: BoardSnapshot,
    },
    ScoresChanged {
        round: usize,
        boxes: Vec<u32>,
    },
    RoundFinished {
        round: usize,
        winners: Vec<usize>,
        credited: usize,
        tied: bool,
    },
    Standings {
        rounds_played: usize,
        standings: Vec<Standing>,
    },
    MatchFinished {
        rounds_played: usize,
        aborted: bool,
    },
}

/// Subscriber to match events
///
/// # Examples
///
/// ```
/// use dotsnboxes::ports::{MatchEvent, MatchObserver};
///
/// #[derive(Default)]
/// struct LineCounter {
///     lines: usize,
/// }
///
/// impl MatchObserver for LineCounter {
///     fn publish(&mut self, event: &MatchEvent) -> dotsnboxes::Result<()> {
///         if let MatchEvent::LinePlaced { .. } = event {
///             self.lines += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait MatchObserver: Send {
    fn publish(&mut self, event: &MatchEvent) -> Result<()>;
}
