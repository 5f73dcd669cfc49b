//! Dots and boxes simulator with tabular reinforcement learning
//!
//! This crate provides:
//! - A bit-vector board with box-completion detection
//! - Value tables held in memory or in a memory-mapped file
//! - A Q-learning policy with optimistic and random exploration
//! - A match engine for repeated rounds between pluggable policies
//! - An application context that shares tables between concurrent matches

pub mod adapters;
pub mod app;
pub mod cli;
pub mod engine;
pub mod error;
pub mod grid;
pub mod observers;
pub mod policies;
pub mod ports;
pub mod q_learning;

pub use engine::{Match, MatchConfig, MatchResult, RewardSchedule, Scoreboard, Standing};
pub use error::{Error, Result};
pub use grid::{BoardSnapshot, BoardState};
pub use q_learning::{LearningParams, QLearningPolicy, SuccessorValue};
