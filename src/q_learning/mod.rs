//! Q-learning temporal difference policy
//!
//! Values live in a [`crate::ports::ValueTable`] indexed by the board's
//! state identifier and line number, so a single table can be shared by
//! several policies and matches at once.
//!
//! ## Usage Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use dotsnboxes::adapters::DenseValueTable;
//! use dotsnboxes::ports::Policy;
//! use dotsnboxes::q_learning::{LearningParams, QLearningPolicy};
//!
//! let table = Arc::new(DenseValueTable::in_memory("q", 16, 4)?);
//! let params = LearningParams::default()
//!     .with_discount_factor(0.5)
//!     .with_learning_rate(0.8);
//! let mut policy = QLearningPolicy::new(table, params).with_seed(7);
//!
//! let action = policy.select_action(0, &[0, 1, 2, 3])?;
//! policy.observe_feedback(0.0, 1, Some(&[1, 2, 3]))?;
//! # let _ = action;
//! # Ok::<(), dotsnboxes::Error>(())
//! ```

pub mod agent;
pub mod params;

pub use agent::QLearningPolicy;
pub use params::{DEFAULT_DISCOUNT_FACTOR, DEFAULT_LEARNING_RATE, LearningParams, SuccessorValue};
