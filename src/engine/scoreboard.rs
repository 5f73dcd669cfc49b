//! Round wins and per-round box counts

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default)]
struct Entry {
    name: String,
    rounds_won: usize,
    boxes_this_round: u32,
}

/// Tally of one match, one entry per policy in seat order
#[derive(Debug, Clone, Default)]
pub struct Scoreboard {
    entries: Vec<Entry>,
}

impl Scoreboard {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names
                .into_iter()
                .map(|name| Entry {
                    name: name.into(),
                    ..Entry::default()
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Zero every policy's box count for a new round.
    pub fn reset_boxes(&mut self) {
        for entry in &mut self.entries {
            entry.boxes_this_round = 0;
        }
    }

    pub fn add_boxes(&mut self, seat: usize, boxes: u32) {
        self.entries[seat].boxes_this_round += boxes;
    }

    pub fn record_win(&mut self, seat: usize) {
        self.entries[seat].rounds_won += 1;
    }

    pub fn boxes(&self) -> Vec<u32> {
        self.entries.iter().map(|e| e.boxes_this_round).collect()
    }

    pub fn rounds_won(&self, seat: usize) -> usize {
        self.entries[seat].rounds_won
    }

    /// Seats holding the highest box count this round.
    pub fn round_winners(&self) -> Vec<usize> {
        let best = self
            .entries
            .iter()
            .map(|e| e.boxes_this_round)
            .max()
            .unwrap_or(0);
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.boxes_this_round == best)
            .map(|(seat, _)| seat)
            .collect()
    }

    pub fn standings(&self, rounds_played: usize) -> Vec<Standing> {
        self.entries
            .iter()
            .enumerate()
            .map(|(seat, e)| Standing::new(seat + 1, &e.name, e.rounds_won, rounds_played))
            .collect()
    }
}

/// Cumulative result of one policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    /// One-based seat number.
    pub seat: usize,
    pub name: String,
    pub wins: usize,
    pub losses: usize,
    pub share: f64,
}

impl Standing {
    pub fn new(seat: usize, name: &str, wins: usize, rounds_played: usize) -> Self {
        let share = if rounds_played > 0 {
            wins as f64 / rounds_played as f64
        } else {
            0.0
        };
        Self {
            seat,
            name: name.to_string(),
            wins,
            losses: rounds_played.saturating_sub(wins),
            share,
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {}: {} wins, {} losses. Share: {:.6}",
            self.seat, self.name, self.wins, self.losses, self.share
        )
    }
}
