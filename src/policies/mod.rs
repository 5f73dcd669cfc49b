//! Non-learning policies
//!
//! Fixed baselines to train against and a console-driven policy for a
//! human player.

pub mod console;
pub mod ordered;
pub mod random;

pub use console::ConsolePolicy;
pub use ordered::{LineOrder, OrderedPolicy};
pub use random::RandomPolicy;
