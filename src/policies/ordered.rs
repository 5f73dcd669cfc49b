//! Deterministic baselines that always claim an extreme line

use crate::{
    Error, Result,
    ports::{Action, Policy},
};

/// Which end of the legal line set to claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOrder {
    Lowest,
    Highest,
}

/// Always claims the lowest (or highest) numbered legal line
#[derive(Debug, Clone)]
pub struct OrderedPolicy {
    name: String,
    order: LineOrder,
}

impl OrderedPolicy {
    pub fn lowest() -> Self {
        Self {
            name: "SimpleAgent".to_string(),
            order: LineOrder::Lowest,
        }
    }

    pub fn highest() -> Self {
        Self {
            name: "ReverseAgent".to_string(),
            order: LineOrder::Highest,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn order(&self) -> LineOrder {
        self.order
    }
}

impl Policy for OrderedPolicy {
    fn select_action(&mut self, state: u64, available: &[usize]) -> Result<Action> {
        let line = match self.order {
            LineOrder::Lowest => available.iter().min(),
            LineOrder::Highest => available.iter().max(),
        };
        line.map(|&line| Action::Line(line))
            .ok_or(Error::NoAvailableActions { state })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
