//! Ports (trait boundaries) for external dependencies.
//!
//! This module defines the interfaces between the game core and the things
//! plugged into it. Following hexagonal architecture, these traits are owned
//! by the core and implemented by adapters and policies.

pub mod observer;
pub mod policy;
pub mod value_table;

pub use observer::{MatchEvent, MatchObserver};
pub use policy::{Action, Policy};
pub use value_table::{UNVISITED, ValueTable, ValueTableStore};
